//! Per-record predicates: file name search, status and creation date range.

use crate::errors::{AppError, AppResult};
use crate::models::{AgreementRecord, FilterConfig, StatusFilter};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};

/// A `FilterConfig` with the search needle lowered and the date bounds
/// resolved to instants, so a projection pays that cost once.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    needle: String,
    status: StatusFilter,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

impl CompiledFilter {
    pub fn new(filter: &FilterConfig, offset: FixedOffset) -> Self {
        Self {
            needle: filter.search_term.to_lowercase(),
            status: filter.status,
            from: filter.date_from.map(|date| start_of_day(date, offset)),
            to: filter.date_to.map(|date| end_of_day(date, offset)),
        }
    }

    pub fn matches(&self, record: &AgreementRecord) -> bool {
        self.matches_search(record) && self.status.admits(record.status) && self.matches_date_range(record)
    }

    fn matches_search(&self, record: &AgreementRecord) -> bool {
        self.needle.is_empty() || record.file_name.to_lowercase().contains(&self.needle)
    }

    // Bounds are checked independently; a reversed range simply admits nothing.
    fn matches_date_range(&self, record: &AgreementRecord) -> bool {
        if let Some(from) = self.from {
            if record.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if record.created_at > to {
                return false;
            }
        }
        true
    }
}

pub fn matches(record: &AgreementRecord, filter: &FilterConfig) -> bool {
    matches_at_offset(record, filter, utc_offset())
}

pub fn matches_at_offset(record: &AgreementRecord, filter: &FilterConfig, offset: FixedOffset) -> bool {
    CompiledFilter::new(filter, offset).matches(record)
}

/// First instant of `date` in the given zone offset. Dates whose midnight
/// falls outside the representable range clamp to the nearest end of it.
pub fn start_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local_minus_utc = offset.local_minus_utc();
    date.and_time(NaiveTime::MIN)
        .and_utc()
        .checked_sub_signed(Duration::seconds(i64::from(local_minus_utc)))
        .unwrap_or(if local_minus_utc > 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

/// Last millisecond of `date` (`23:59:59.999`) in the given zone offset,
/// clamped to the latest representable instant.
pub fn end_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    start_of_day(date, offset)
        .checked_add_signed(Duration::days(1))
        .and_then(|next_day| next_day.checked_sub_signed(Duration::milliseconds(1)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub fn utc_offset() -> FixedOffset {
    Utc.fix()
}

pub fn offset_from_minutes(minutes: i32) -> AppResult<FixedOffset> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| AppError::Validation(format!("Timezone offset {} minutes is out of range", minutes)))
}

#[cfg(test)]
mod tests {
    use super::{end_of_day, matches, matches_at_offset, offset_from_minutes, start_of_day, utc_offset};
    use crate::models::{AgreementRecord, AgreementStatus, FilterConfig, StatusFilter};
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

    fn record(file_name: &str, status: AgreementStatus, created_at: DateTime<Utc>) -> AgreementRecord {
        AgreementRecord {
            id: file_name.to_string(),
            owner_id: "owner".to_string(),
            file_name: file_name.to_string(),
            file_size_bytes: 10,
            status,
            created_at,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let rec = record("Alpha-Contract.PDF", AgreementStatus::Active, Utc::now());
        let mut filter = FilterConfig::default();
        assert!(matches(&rec, &filter));

        filter.search_term = "contract.pdf".to_string();
        assert!(matches(&rec, &filter));

        filter.search_term = "beta".to_string();
        assert!(!matches(&rec, &filter));
    }

    #[test]
    fn status_filter_all_admits_every_status() {
        let active = record("a.pdf", AgreementStatus::Active, Utc::now());
        let archived = record("b.pdf", AgreementStatus::Archived, Utc::now());
        let mut filter = FilterConfig::default();
        assert!(matches(&active, &filter) && matches(&archived, &filter));

        filter.status = StatusFilter::Archived;
        assert!(!matches(&active, &filter));
        assert!(matches(&archived, &filter));
    }

    #[test]
    fn date_bounds_are_inclusive_to_the_millisecond() {
        let from = date(2024, 3, 10);
        let to = date(2024, 3, 12);
        let filter = FilterConfig {
            date_from: Some(from),
            date_to: Some(to),
            ..FilterConfig::default()
        };
        let start = start_of_day(from, utc_offset());
        let end = end_of_day(to, utc_offset());

        assert!(matches(&record("x", AgreementStatus::Active, start), &filter));
        assert!(!matches(&record("x", AgreementStatus::Active, start - Duration::milliseconds(1)), &filter));
        assert!(matches(&record("x", AgreementStatus::Active, end), &filter));
        assert!(!matches(&record("x", AgreementStatus::Active, end + Duration::milliseconds(1)), &filter));
    }

    #[test]
    fn reversed_range_matches_nothing_without_panicking() {
        let filter = FilterConfig {
            date_from: Some(date(2024, 5, 2)),
            date_to: Some(date(2024, 5, 1)),
            ..FilterConfig::default()
        };
        let inside = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("timestamp");
        assert!(!matches(&record("x", AgreementStatus::Active, inside), &filter));
    }

    #[test]
    fn day_boundaries_follow_the_configured_offset() {
        let offset = offset_from_minutes(-300).expect("offset");
        let filter = FilterConfig {
            date_from: Some(date(2024, 1, 2)),
            ..FilterConfig::default()
        };
        // 03:00 UTC on Jan 2 is still Jan 1 at UTC-5.
        let early = Utc.with_ymd_and_hms(2024, 1, 2, 3, 0, 0).single().expect("timestamp");
        assert!(matches(&record("x", AgreementStatus::Active, early), &filter));
        assert!(!matches_at_offset(&record("x", AgreementStatus::Active, early), &filter, offset));
    }

    #[test]
    fn extreme_dates_act_as_open_bounds() {
        let now = record("x", AgreementStatus::Active, Utc::now());
        for offset in [utc_offset(), offset_from_minutes(-300).expect("offset"), offset_from_minutes(300).expect("offset")] {
            let open = FilterConfig {
                date_from: Some(NaiveDate::MIN),
                date_to: Some(NaiveDate::MAX),
                ..FilterConfig::default()
            };
            assert!(matches_at_offset(&now, &open, offset));

            let future_only = FilterConfig {
                date_from: Some(NaiveDate::MAX),
                ..FilterConfig::default()
            };
            assert!(!matches_at_offset(&now, &future_only, offset));

            let past_only = FilterConfig {
                date_to: Some(NaiveDate::MIN),
                ..FilterConfig::default()
            };
            assert!(!matches_at_offset(&now, &past_only, offset));
        }
        assert_eq!(end_of_day(NaiveDate::MAX, utc_offset()), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn far_future_date_from_json_filters_without_panicking() {
        let filter: FilterConfig =
            serde_json::from_value(serde_json::json!({ "dateTo": "+262142-12-31" })).expect("filter");
        assert!(filter.date_to.is_some());
        assert!(matches(&record("x", AgreementStatus::Active, Utc::now()), &filter));
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        assert!(offset_from_minutes(24 * 60).is_err());
        assert!(offset_from_minutes(i32::MAX).is_err());
    }
}
