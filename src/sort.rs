//! Comparators over agreement records.
//!
//! File names compare by Unicode code point (plain `str` ordering), which is
//! case-sensitive and independent of locale: `"Zeta" < "alpha"`.

use crate::models::{AgreementRecord, SortConfig, SortDirection, SortField};
use std::cmp::Ordering;

pub fn comparator(sort: SortConfig) -> impl Fn(&AgreementRecord, &AgreementRecord) -> Ordering {
    move |a, b| compare(a, b, sort)
}

pub fn compare(a: &AgreementRecord, b: &AgreementRecord, sort: SortConfig) -> Ordering {
    let ordering = compare_ascending(a, b, sort.field);
    match sort.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

fn compare_ascending(a: &AgreementRecord, b: &AgreementRecord, field: SortField) -> Ordering {
    match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::FileName => a.file_name.cmp(&b.file_name),
        SortField::FileSizeBytes => a.file_size_bytes.cmp(&b.file_size_bytes),
        // Equal statuses fall back to newest first.
        SortField::Status => a
            .status
            .cmp(&b.status)
            .then_with(|| b.created_at.cmp(&a.created_at)),
    }
}

/// Stable in-place sort; records with equal keys keep their relative order.
pub fn sort_records(records: &mut [AgreementRecord], sort: SortConfig) {
    records.sort_by(comparator(sort));
}
