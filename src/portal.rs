use crate::db::Database;
use crate::dispatch::BulkActionDispatcher;
use crate::errors::{AppError, AppResult};
use crate::filter::offset_from_minutes;
use crate::models::{
    AgreementRecord, AgreementStatus, AppSettings, BulkAction, BulkOutcome, FilterConfig, PageResponse, SortConfig,
    SortField, StatusFilter, ViewerContext,
};
use crate::projection::{paginate, view_ids, ViewProjector};
use crate::selection::SelectionTracker;
use crate::sources::{MutationSink, RecordSource};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

struct ViewState {
    filter: FilterConfig,
    sort: SortConfig,
    records: Vec<AgreementRecord>,
    revision: u64,
    applied_fetch: u64,
    projector: ViewProjector,
    selection: SelectionTracker,
}

impl ViewState {
    fn visible(&mut self) -> &[AgreementRecord] {
        self.projector
            .project(self.revision, &self.records, &self.filter, self.sort)
    }

    /// Recomputes the view and drops the selection if membership moved.
    fn reproject(&mut self) -> Vec<String> {
        let ids = view_ids(self.visible());
        self.selection.scope_to(ids.iter().cloned());
        ids
    }
}

/// One mounted agreement table: loaded records, the filter and sort applied
/// to them, and the row selection bulk actions operate on.
pub struct AgreementPortal {
    viewer: ViewerContext,
    settings: AppSettings,
    source: Arc<dyn RecordSource>,
    sink: Arc<dyn MutationSink>,
    dispatcher: BulkActionDispatcher,
    fetches: AtomicU64,
    state: Mutex<ViewState>,
}

impl AgreementPortal {
    pub fn new(
        viewer: ViewerContext,
        source: Arc<dyn RecordSource>,
        sink: Arc<dyn MutationSink>,
        settings: AppSettings,
    ) -> AppResult<Self> {
        let offset = offset_from_minutes(settings.timezone_offset_minutes)?;
        let mut state = ViewState {
            filter: FilterConfig::default(),
            sort: settings.default_sort,
            records: Vec::new(),
            revision: 0,
            applied_fetch: 0,
            projector: ViewProjector::new(offset),
            selection: SelectionTracker::new(),
        };
        state.reproject();

        Ok(Self {
            viewer,
            dispatcher: BulkActionDispatcher::new(sink.clone(), settings.max_concurrent_mutations),
            settings,
            source,
            sink,
            fetches: AtomicU64::new(0),
            state: Mutex::new(state),
        })
    }

    /// Portal backed by the local SQLite store for both reads and writes.
    pub fn with_database(viewer: ViewerContext, db: Arc<Database>) -> AppResult<Self> {
        let settings = db.get_settings()?;
        Self::new(viewer, db.clone(), db, settings)
    }

    pub fn viewer(&self) -> &ViewerContext {
        &self.viewer
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    fn state(&self) -> AppResult<MutexGuard<'_, ViewState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("portal view state poisoned".to_string()))
    }

    fn update<F>(&self, change: F) -> AppResult<()>
    where
        F: FnOnce(&mut ViewState),
    {
        let mut state = self.state()?;
        change(&mut *state);
        let visible = state.reproject().len();
        tracing::debug!(
            status = state.filter.status.as_str(),
            sort_field = state.sort.field.as_str(),
            sort_direction = state.sort.direction.as_str(),
            visible,
            "agreement view updated"
        );
        Ok(())
    }

    /// Re-fetches the viewer's agreements. On failure the previously loaded
    /// records stay in place and the error is returned. When refreshes
    /// overlap, the most recently started one wins.
    pub async fn refresh(&self) -> AppResult<usize> {
        let ticket = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        let scope = self.viewer.scope();
        let records = match self.source.fetch(scope).await {
            Ok(records) => records,
            Err(error) => {
                tracing::warn!(user_id = %self.viewer.user_id, error = %error, "agreement fetch failed");
                return Err(error);
            }
        };

        let mut state = self.state()?;
        if ticket < state.applied_fetch {
            tracing::debug!(ticket, applied = state.applied_fetch, "discarding stale agreement fetch");
            return Ok(state.visible().len());
        }
        state.applied_fetch = ticket;
        state.records = records;
        state.revision = state.revision.wrapping_add(1);
        let visible = state.reproject().len();
        tracing::info!(
            user_id = %self.viewer.user_id,
            role = self.viewer.role.as_str(),
            loaded = state.records.len(),
            visible,
            "agreements refreshed"
        );
        Ok(visible)
    }

    pub fn filter(&self) -> AppResult<FilterConfig> {
        Ok(self.state()?.filter.clone())
    }

    pub fn sort(&self) -> AppResult<SortConfig> {
        Ok(self.state()?.sort)
    }

    pub fn set_filter(&self, filter: FilterConfig) -> AppResult<()> {
        self.update(|state| state.filter = filter)
    }

    pub fn set_search_term(&self, term: &str) -> AppResult<()> {
        self.update(|state| state.filter.search_term = term.to_string())
    }

    pub fn set_status_filter(&self, status: StatusFilter) -> AppResult<()> {
        self.update(|state| state.filter.status = status)
    }

    pub fn set_date_range(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> AppResult<()> {
        self.update(|state| {
            state.filter.date_from = from;
            state.filter.date_to = to;
        })
    }

    pub fn reset_filter(&self) -> AppResult<()> {
        self.update(|state| state.filter.reset())
    }

    pub fn set_sort(&self, sort: SortConfig) -> AppResult<()> {
        self.update(|state| state.sort = sort)
    }

    /// Column header activation; returns the sort now in effect.
    pub fn toggle_sort(&self, field: SortField) -> AppResult<SortConfig> {
        let mut next = SortConfig::default();
        self.update(|state| {
            state.sort = state.sort.toggled(field);
            next = state.sort;
        })?;
        Ok(next)
    }

    pub fn view(&self) -> AppResult<Vec<AgreementRecord>> {
        Ok(self.state()?.visible().to_vec())
    }

    pub fn view_page(&self, page: usize) -> AppResult<PageResponse<AgreementRecord>> {
        Ok(paginate(self.view()?, page, self.settings.page_size))
    }

    pub fn select_one(&self, id: &str, checked: bool) -> AppResult<()> {
        self.state()?.selection.select_one(id, checked);
        Ok(())
    }

    pub fn select_all(&self, checked: bool) -> AppResult<()> {
        let mut state = self.state()?;
        let ids = state.reproject();
        state.selection.select_all(&ids, checked);
        Ok(())
    }

    /// Header checkbox activation.
    pub fn toggle_select_all(&self) -> AppResult<()> {
        let mut state = self.state()?;
        let ids = state.reproject();
        state.selection.toggle_all(&ids);
        Ok(())
    }

    pub fn clear_selection(&self) -> AppResult<()> {
        self.state()?.selection.clear();
        Ok(())
    }

    pub fn is_selected(&self, id: &str) -> AppResult<bool> {
        Ok(self.state()?.selection.is_selected(id))
    }

    pub fn selected_count(&self) -> AppResult<usize> {
        Ok(self.state()?.selection.selected_count())
    }

    pub fn all_checked(&self) -> AppResult<bool> {
        Ok(self.state()?.selection.all_checked())
    }

    pub fn selected_ids(&self) -> AppResult<Vec<String>> {
        let mut ids = self.state()?.selection.selected_ids().into_iter().collect::<Vec<_>>();
        ids.sort();
        Ok(ids)
    }

    /// Applies `action` to every selected agreement, then clears the
    /// selection and reloads. A failed reload is logged; the outcome of the
    /// mutations is still returned.
    pub async fn run_bulk_action(&self, action: BulkAction) -> AppResult<BulkOutcome> {
        let selected = self.state()?.selection.selected_ids();
        if selected.is_empty() {
            return Ok(BulkOutcome::default());
        }

        let outcome = self.dispatcher.dispatch(action, &selected).await?;
        self.clear_selection()?;
        tracing::info!(
            user_id = %self.viewer.user_id,
            summary = %outcome.summary(action),
            "bulk action finished"
        );

        if let Err(error) = self.refresh().await {
            tracing::warn!(error = %error, "reload after bulk action failed");
        }
        Ok(outcome)
    }

    pub async fn set_agreement_status(&self, id: &str, status: AgreementStatus) -> AppResult<()> {
        self.sink.set_status(id.to_string(), status).await?;
        self.refresh().await?;
        Ok(())
    }
}
