use crate::errors::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle state of an agreement. Variant order is the canonical sort
/// order: `Active < Archived`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgreementStatus {
    Active,
    Archived,
}

impl AgreementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }
}

impl FromStr for AgreementStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            other => Err(AppError::Validation(format!("Unknown agreement status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusFilter {
    Active,
    Archived,
    #[default]
    All,
}

impl StatusFilter {
    pub fn admits(self, status: AgreementStatus) -> bool {
        match self {
            Self::All => true,
            Self::Active => status == AgreementStatus::Active,
            Self::Archived => status == AgreementStatus::Archived,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
            Self::All => "all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Agent,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Admin => "admin",
        }
    }
}

/// Which agreements a record source should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordScope {
    All,
    Owner(String),
}

/// The signed-in user the portal acts for. Passed explicitly instead of
/// being read from ambient session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerContext {
    pub user_id: String,
    pub role: Role,
}

impl ViewerContext {
    pub fn agent(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Agent,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::Admin,
        }
    }

    pub fn scope(&self) -> RecordScope {
        match self.role {
            Role::Admin => RecordScope::All,
            Role::Agent => RecordScope::Owner(self.user_id.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementRecord {
    pub id: String,
    pub owner_id: String,
    pub file_name: String,
    pub file_size_bytes: u64,
    pub status: AgreementStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAgreement {
    pub owner_id: String,
    pub file_name: String,
    pub file_size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    pub search_term: String,
    pub status: StatusFilter,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl FilterConfig {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    CreatedAt,
    FileName,
    FileSizeBytes,
    Status,
}

impl SortField {
    /// Direction applied when a column header is first activated.
    pub fn default_direction(self) -> SortDirection {
        match self {
            Self::CreatedAt | Self::FileSizeBytes => SortDirection::Desc,
            Self::FileName | Self::Status => SortDirection::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::FileName => "fileName",
            Self::FileSizeBytes => "fileSizeBytes",
            Self::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortConfig {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

impl SortConfig {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Header click semantics: the active column flips direction, any other
    /// column becomes active with its default direction.
    pub fn toggled(self, field: SortField) -> Self {
        if self.field == field {
            Self {
                field,
                direction: self.direction.reversed(),
            }
        } else {
            Self {
                field,
                direction: field.default_direction(),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BulkAction {
    Archive,
    Delete,
}

impl BulkAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Delete => "delete",
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            Self::Archive => "archived",
            Self::Delete => "deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<BulkFailure>,
}

impl BulkOutcome {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// User-facing line such as "3 of 5 archived, 2 failed".
    pub fn summary(&self, action: BulkAction) -> String {
        let base = format!("{} of {} {}", self.succeeded.len(), self.total(), action.past_tense());
        if self.failed.is_empty() {
            base
        } else {
            format!("{}, {} failed", base, self.failed.len())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub page_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub default_sort: SortConfig,
    pub timezone_offset_minutes: i32,
    pub max_concurrent_mutations: usize,
    pub page_size: usize,
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_sort: SortConfig::default(),
            timezone_offset_minutes: 0,
            max_concurrent_mutations: 8,
            page_size: 25,
            log_level: "info".to_string(),
        }
    }
}

impl AppSettings {
    /// Rejects values the portal could not start with.
    pub fn validate(&self) -> AppResult<()> {
        crate::filter::offset_from_minutes(self.timezone_offset_minutes)?;
        if self.page_size == 0 {
            return Err(AppError::Validation("pageSize must be at least 1".to_string()));
        }
        if self.max_concurrent_mutations == 0 {
            return Err(AppError::Validation("maxConcurrentMutations must be at least 1".to_string()));
        }
        if self.log_level.trim().is_empty() {
            return Err(AppError::Validation("logLevel cannot be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AgreementStatus, AppSettings, BulkAction, BulkFailure, BulkOutcome, FilterConfig, RecordScope, SortConfig,
        SortDirection, SortField, StatusFilter, ViewerContext,
    };

    #[test]
    fn unknown_status_is_rejected_at_ingestion() {
        assert_eq!("archived".parse::<AgreementStatus>().expect("status"), AgreementStatus::Archived);
        assert!("deleted".parse::<AgreementStatus>().is_err());
        assert!(serde_json::from_str::<AgreementStatus>("\"pending\"").is_err());
    }

    #[test]
    fn defaults_match_a_freshly_mounted_view() {
        let filter = FilterConfig::default();
        assert!(filter.search_term.is_empty());
        assert_eq!(filter.status, StatusFilter::All);
        assert!(filter.date_from.is_none() && filter.date_to.is_none());

        let sort = SortConfig::default();
        assert_eq!(sort.field, SortField::CreatedAt);
        assert_eq!(sort.direction, SortDirection::Desc);
    }

    #[test]
    fn toggling_sort_flips_same_field_and_resets_new_field() {
        let sort = SortConfig::default();
        let flipped = sort.toggled(SortField::CreatedAt);
        assert_eq!(flipped.direction, SortDirection::Asc);

        let by_name = flipped.toggled(SortField::FileName);
        assert_eq!(by_name, SortConfig::new(SortField::FileName, SortDirection::Asc));
    }

    #[test]
    fn filter_config_deserializes_partial_payloads() {
        let filter: FilterConfig =
            serde_json::from_value(serde_json::json!({ "status": "archived", "dateFrom": "2024-01-01" }))
                .expect("filter");
        assert_eq!(filter.status, StatusFilter::Archived);
        assert!(filter.search_term.is_empty());
        assert!(!filter.is_default());
    }

    #[test]
    fn summary_reports_partial_failure() {
        let outcome = BulkOutcome {
            succeeded: vec!["a".into(), "b".into(), "c".into()],
            failed: vec![
                BulkFailure { id: "d".into(), reason: "locked".into() },
                BulkFailure { id: "e".into(), reason: "gone".into() },
            ],
        };
        assert_eq!(outcome.summary(BulkAction::Archive), "3 of 5 archived, 2 failed");

        let clean = BulkOutcome { succeeded: vec!["a".into()], failed: vec![] };
        assert_eq!(clean.summary(BulkAction::Delete), "1 of 1 deleted");
    }

    #[test]
    fn viewer_scope_follows_role() {
        assert_eq!(ViewerContext::admin("root").scope(), RecordScope::All);
        assert_eq!(
            ViewerContext::agent("u-1").scope(),
            RecordScope::Owner("u-1".to_string())
        );
    }

    #[test]
    fn settings_fill_missing_fields_with_defaults() {
        let settings: AppSettings =
            serde_json::from_value(serde_json::json!({ "pageSize": 50 })).expect("settings");
        assert_eq!(settings.page_size, 50);
        assert_eq!(settings.max_concurrent_mutations, 8);
        assert_eq!(settings.default_sort, SortConfig::default());
    }
}
