pub mod config;
pub mod db;
pub mod dispatch;
pub mod errors;
pub mod filter;
pub mod models;
pub mod portal;
pub mod projection;
pub mod selection;
pub mod sort;
pub mod sources;

pub use crate::db::Database;
pub use crate::dispatch::BulkActionDispatcher;
pub use crate::errors::{AppError, AppResult};
pub use crate::filter::{matches, matches_at_offset};
pub use crate::models::{
    AgreementRecord, AgreementStatus, AppSettings, BulkAction, BulkFailure, BulkOutcome, FilterConfig, NewAgreement,
    PageResponse, RecordScope, Role, SortConfig, SortDirection, SortField, StatusFilter, ViewerContext,
};
pub use crate::portal::AgreementPortal;
pub use crate::projection::{paginate, project, ViewProjector};
pub use crate::selection::SelectionTracker;
pub use crate::sort::{compare, comparator};
pub use crate::sources::{MutationSink, RecordSource, SourceFuture};

use std::path::Path;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub portal: Arc<AgreementPortal>,
}

/// Opens the store under `app_data_dir`, applies settings overrides, starts
/// file logging and loads the viewer's agreements.
pub async fn bootstrap(app_data_dir: &Path, viewer: ViewerContext) -> AppResult<AppState> {
    let db = Arc::new(Database::new(&app_data_dir.join("portal.sqlite"))?);
    let settings = config::load_settings(&db, app_data_dir)?;

    if let Err(error) = init_tracing(app_data_dir, &settings.log_level) {
        eprintln!("tracing init skipped: {}", error);
    }

    let portal = Arc::new(AgreementPortal::new(viewer, db.clone(), db.clone(), settings)?);
    portal.refresh().await?;
    tracing::info!(db_path = %db.path().to_string_lossy(), "agreement portal ready");

    Ok(AppState { db, portal })
}

pub fn init_tracing(app_data_dir: &Path, default_level: &str) -> Result<(), String> {
    let log_dir = app_data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "portal.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}

pub fn to_client_error(error: impl std::fmt::Display) -> String {
    error.to_string()
}
