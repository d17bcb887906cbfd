use crate::errors::AppResult;
use crate::models::{AgreementRecord, AgreementStatus, BulkAction, RecordScope};
use std::future::Future;
use std::pin::Pin;

pub type SourceFuture<T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send>>;

/// Supplies agreements for a scope. Failures must surface as `Err`, never as
/// an empty list.
pub trait RecordSource: Send + Sync {
    fn fetch(&self, scope: RecordScope) -> SourceFuture<Vec<AgreementRecord>>;
}

/// Accepts per-record mutations. Each call is independent and may fail on
/// its own.
pub trait MutationSink: Send + Sync {
    fn set_status(&self, id: String, status: AgreementStatus) -> SourceFuture<()>;

    fn delete(&self, id: String) -> SourceFuture<()>;

    fn apply(&self, action: BulkAction, id: String) -> SourceFuture<()> {
        match action {
            BulkAction::Archive => self.set_status(id, AgreementStatus::Archived),
            BulkAction::Delete => self.delete(id),
        }
    }
}
