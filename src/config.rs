use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::models::AppSettings;
use std::fs;
use std::path::{Path, PathBuf};

pub const OVERRIDES_FILE: &str = "portal.yaml";

pub fn overrides_path(app_data_dir: &Path) -> PathBuf {
    app_data_dir.join(OVERRIDES_FILE)
}

/// Parses the optional YAML overrides file into a JSON patch.
pub fn read_overrides(app_data_dir: &Path) -> AppResult<Option<serde_json::Value>> {
    let path = overrides_path(app_data_dir);
    if !path.is_file() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&path)?;
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let value: serde_json::Value = serde_yaml::from_str(&raw)?;
    if !value.is_object() {
        return Err(AppError::Validation(format!(
            "{} must contain a mapping of settings",
            path.to_string_lossy()
        )));
    }
    Ok(Some(value))
}

/// Stored settings with `portal.yaml` merged over them. The merged result
/// is persisted so later reads agree with what bootstrap used.
pub fn load_settings(db: &Database, app_data_dir: &Path) -> AppResult<AppSettings> {
    match read_overrides(app_data_dir)? {
        Some(patch) => {
            tracing::info!(path = %overrides_path(app_data_dir).to_string_lossy(), "applying settings overrides");
            db.update_settings(patch)
        }
        None => db.get_settings(),
    }
}

#[cfg(test)]
mod tests {
    use super::{load_settings, overrides_path, read_overrides};
    use crate::db::Database;
    use crate::errors::AppError;
    use crate::models::SortField;
    use std::fs;

    #[test]
    fn missing_file_keeps_stored_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("portal.db")).expect("db");
        assert!(read_overrides(dir.path()).expect("read").is_none());
        assert_eq!(load_settings(&db, dir.path()).expect("settings").page_size, 25);
    }

    #[test]
    fn yaml_overrides_merge_and_persist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("portal.db")).expect("db");
        fs::write(
            overrides_path(dir.path()),
            "pageSize: 50\ntimezoneOffsetMinutes: -300\ndefaultSort:\n  field: fileSizeBytes\n",
        )
        .expect("write overrides");

        let settings = load_settings(&db, dir.path()).expect("settings");
        assert_eq!(settings.page_size, 50);
        assert_eq!(settings.timezone_offset_minutes, -300);
        assert_eq!(settings.default_sort.field, SortField::FileSizeBytes);
        assert_eq!(db.get_settings().expect("stored"), settings);
    }

    #[test]
    fn non_mapping_overrides_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(overrides_path(dir.path()), "- just\n- a list\n").expect("write overrides");
        assert!(matches!(read_overrides(dir.path()), Err(AppError::Validation(_))));
    }

    #[test]
    fn unusable_overrides_are_not_persisted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("portal.db")).expect("db");
        fs::write(overrides_path(dir.path()), "timezoneOffsetMinutes: 100000\n").expect("write overrides");

        assert!(matches!(load_settings(&db, dir.path()), Err(AppError::Validation(_))));
        assert_eq!(db.get_settings().expect("stored").timezone_offset_minutes, 0);
    }
}
