use crate::errors::{AppError, AppResult};
use crate::models::{BulkAction, BulkFailure, BulkOutcome};
use crate::sources::MutationSink;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Fans a bulk action out to one mutation per selected id and waits for
/// every call to settle. Local selection and view state are never touched
/// here; callers clear and re-fetch once the outcome is in.
#[derive(Clone)]
pub struct BulkActionDispatcher {
    sink: Arc<dyn MutationSink>,
    permits: Arc<Semaphore>,
}

impl BulkActionDispatcher {
    pub fn new(sink: Arc<dyn MutationSink>, max_concurrent: usize) -> Self {
        Self {
            sink,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub async fn dispatch(&self, action: BulkAction, selected_ids: &HashSet<String>) -> AppResult<BulkOutcome> {
        if selected_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(AppError::Validation(format!(
                "Cannot {} an agreement with an empty id",
                action.as_str()
            )));
        }

        let mut ids = selected_ids.iter().cloned().collect::<Vec<_>>();
        ids.sort();

        let mut handles = Vec::with_capacity(ids.len());
        for id in ids {
            let sink = self.sink.clone();
            let permits = self.permits.clone();
            let task_id = id.clone();
            let handle = tokio::spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|error| AppError::Internal(error.to_string()))?;
                sink.apply(action, task_id).await
            });
            handles.push((id, handle));
        }

        let mut outcome = BulkOutcome::default();
        for (id, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_error) => Err(AppError::from(join_error)),
            };
            match result {
                Ok(()) => outcome.succeeded.push(id),
                Err(error) => {
                    tracing::warn!(agreement_id = %id, action = action.as_str(), error = %error, "bulk mutation failed");
                    outcome.failed.push(BulkFailure {
                        id,
                        reason: error.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            action = action.as_str(),
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "bulk action settled"
        );
        Ok(outcome)
    }
}
