use crate::filter::{utc_offset, CompiledFilter};
use crate::models::{AgreementRecord, FilterConfig, PageResponse, SortConfig};
use crate::sort::sort_records;
use chrono::FixedOffset;

const MAX_PAGE_SIZE: usize = 500;

/// Filtered and sorted copy of `records`. Inputs are left untouched.
pub fn project(records: &[AgreementRecord], filter: &FilterConfig, sort: SortConfig) -> Vec<AgreementRecord> {
    project_at_offset(records, filter, sort, utc_offset())
}

pub fn project_at_offset(
    records: &[AgreementRecord],
    filter: &FilterConfig,
    sort: SortConfig,
    offset: FixedOffset,
) -> Vec<AgreementRecord> {
    let predicate = CompiledFilter::new(filter, offset);
    let mut view = records
        .iter()
        .filter(|record| predicate.matches(record))
        .cloned()
        .collect::<Vec<_>>();
    sort_records(&mut view, sort);
    view
}

pub fn view_ids(view: &[AgreementRecord]) -> Vec<String> {
    view.iter().map(|record| record.id.clone()).collect()
}

#[derive(Debug, Clone)]
struct CachedView {
    revision: u64,
    filter: FilterConfig,
    sort: SortConfig,
    view: Vec<AgreementRecord>,
}

/// Memoizes the last projection. `revision` identifies a loaded record set;
/// callers bump it whenever they replace the records.
#[derive(Debug, Clone)]
pub struct ViewProjector {
    offset: FixedOffset,
    cached: Option<CachedView>,
}

impl Default for ViewProjector {
    fn default() -> Self {
        Self::new(utc_offset())
    }
}

impl ViewProjector {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset, cached: None }
    }

    pub fn project(
        &mut self,
        revision: u64,
        records: &[AgreementRecord],
        filter: &FilterConfig,
        sort: SortConfig,
    ) -> &[AgreementRecord] {
        let fresh = self
            .cached
            .as_ref()
            .map(|cached| cached.revision == revision && cached.sort == sort && cached.filter == *filter)
            .unwrap_or(false);

        if !fresh {
            let view = project_at_offset(records, filter, sort, self.offset);
            tracing::debug!(revision, visible = view.len(), total = records.len(), "recomputed agreement view");
            self.cached = Some(CachedView {
                revision,
                filter: filter.clone(),
                sort,
                view,
            });
        }

        self.cached
            .as_ref()
            .map(|cached| cached.view.as_slice())
            .unwrap_or(&[])
    }
}

/// Slices `items` into a 1-based page. Page 0 is treated as page 1.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> PageResponse<T> {
    let total = items.len();
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let page = page.max(1);
    let page_count = total.div_ceil(page_size);
    let offset = (page - 1).saturating_mul(page_size);

    PageResponse {
        items: items.into_iter().skip(offset).take(page_size).collect(),
        page,
        page_size,
        total,
        page_count,
    }
}
