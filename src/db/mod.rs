use crate::errors::{AppError, AppResult};
use crate::models::{AgreementRecord, AgreementStatus, AppSettings, NewAgreement, RecordScope};
use crate::sources::{MutationSink, RecordSource, SourceFuture};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!("schema.sql");

const AGREEMENT_COLUMNS: &str = "id, owner_id, file_name, file_size_bytes, status, created_at";

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        let db = Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        };

        db.ensure_default_settings()?;

        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }

    pub fn insert_agreement(&self, payload: &NewAgreement) -> AppResult<AgreementRecord> {
        if payload.owner_id.trim().is_empty() {
            return Err(AppError::Validation("Agreement owner cannot be empty".to_string()));
        }
        if payload.file_name.trim().is_empty() {
            return Err(AppError::Validation("Agreement file name cannot be empty".to_string()));
        }

        let record = AgreementRecord {
            id: Uuid::new_v4().to_string(),
            owner_id: payload.owner_id.clone(),
            file_name: payload.file_name.clone(),
            file_size_bytes: payload.file_size_bytes,
            status: AgreementStatus::Active,
            created_at: Utc::now(),
        };
        self.import_agreement(&record)?;
        tracing::info!(agreement_id = %record.id, owner_id = %record.owner_id, "agreement uploaded");
        Ok(record)
    }

    /// Stores a record exactly as given, keeping its id and timestamp.
    pub fn import_agreement(&self, record: &AgreementRecord) -> AppResult<()> {
        let size = i64::try_from(record.file_size_bytes)
            .map_err(|_| AppError::Validation(format!("File size {} is too large", record.file_size_bytes)))?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO agreements (id, owner_id, file_name, file_size_bytes, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.owner_id,
                record.file_name,
                size,
                record.status.as_str(),
                format_time(record.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_agreement(&self, id: &str) -> AppResult<Option<AgreementRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM agreements WHERE id = ?1", AGREEMENT_COLUMNS),
                [id],
                parse_agreement_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn list_agreements(&self, scope: &RecordScope) -> AppResult<Vec<AgreementRecord>> {
        let conn = self.lock()?;
        let mut query = format!("SELECT {} FROM agreements", AGREEMENT_COLUMNS);
        let mut params_vec: Vec<String> = Vec::new();

        if let RecordScope::Owner(owner_id) = scope {
            query.push_str(" WHERE owner_id = ?");
            params_vec.push(owner_id.clone());
        }
        query.push_str(" ORDER BY created_at DESC");

        let mut statement = conn.prepare(&query)?;
        let rows = statement.query_map(rusqlite::params_from_iter(params_vec.iter()), parse_agreement_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn set_agreement_status(&self, id: &str, status: AgreementStatus) -> AppResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE agreements SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("Agreement {} does not exist", id)));
        }
        Ok(())
    }

    pub fn delete_agreement(&self, id: &str) -> AppResult<()> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM agreements WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("Agreement {} does not exist", id)));
        }
        tracing::info!(agreement_id = %id, "agreement deleted");
        Ok(())
    }

    pub fn get_settings(&self) -> AppResult<AppSettings> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                "SELECT value_json FROM settings WHERE key = 'app'",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(serde_json::from_str::<AppSettings>(&raw).unwrap_or_default()),
            None => Ok(AppSettings::default()),
        }
    }

    /// Deep-merges `update` over the stored settings and persists the result.
    pub fn update_settings(&self, update: serde_json::Value) -> AppResult<AppSettings> {
        let current = self.get_settings()?;
        let mut merged = serde_json::to_value(current)?;
        merge_json(&mut merged, update);
        let settings: AppSettings =
            serde_json::from_value(merged).map_err(|error| AppError::Validation(error.to_string()))?;
        settings.validate()?;
        self.write_settings(&settings)?;
        Ok(settings)
    }

    fn write_settings(&self, settings: &AppSettings) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO settings (key, value_json, updated_at)
             VALUES ('app', ?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
            params![serde_json::to_string(settings)?, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn ensure_default_settings(&self) -> AppResult<()> {
        let exists = {
            let conn = self.lock()?;
            conn.query_row("SELECT 1 FROM settings WHERE key = 'app'", [], |_| Ok(()))
                .optional()?
                .is_some()
        };
        if !exists {
            self.write_settings(&AppSettings::default())?;
        }
        Ok(())
    }
}

impl RecordSource for Database {
    fn fetch(&self, scope: RecordScope) -> SourceFuture<Vec<AgreementRecord>> {
        let result = self.list_agreements(&scope);
        Box::pin(async move { result })
    }
}

impl MutationSink for Database {
    fn set_status(&self, id: String, status: AgreementStatus) -> SourceFuture<()> {
        let result = self.set_agreement_status(&id, status);
        Box::pin(async move { result })
    }

    fn delete(&self, id: String) -> SourceFuture<()> {
        let result = self.delete_agreement(&id);
        Box::pin(async move { result })
    }
}

fn parse_agreement_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AgreementRecord> {
    let size: i64 = row.get(3)?;
    Ok(AgreementRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        file_name: row.get(2)?,
        file_size_bytes: u64::try_from(size).map_err(|_| invalid_column(3, format!("negative file size {}", size)))?,
        status: parse_status(&row.get::<_, String>(4)?)?,
        created_at: parse_time(&row.get::<_, String>(5)?)?,
    })
}

fn parse_status(raw: &str) -> rusqlite::Result<AgreementStatus> {
    raw.parse::<AgreementStatus>()
        .map_err(|error| invalid_column(4, error.to_string()))
}

fn format_time(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| invalid_column(5, error.to_string()))
}

fn invalid_column(index: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}

pub(crate) fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}
