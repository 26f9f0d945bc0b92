//! SQLite-backed scan registry

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{RegistryError, ScanRegistry};
use crate::{ScanJob, ScanStatus, ScanUpdate};

/// SQL schema for the scan database
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS scan_schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO scan_schema_version VALUES (1);

CREATE TABLE IF NOT EXISTS scans (
    scan_id TEXT PRIMARY KEY,
    repo_url TEXT NOT NULL,
    status TEXT NOT NULL,                   -- pending, in_progress, completed, failed
    created_at INTEGER NOT NULL,            -- epoch milliseconds
    started_at INTEGER,
    completed_at INTEGER,
    result_json TEXT,                       -- ScanReport, completed scans only
    error TEXT,                             -- failed scans only
    tool_runs_json TEXT NOT NULL DEFAULT '[]'
);
CREATE INDEX IF NOT EXISTS idx_scans_status ON scans(status);
CREATE INDEX IF NOT EXISTS idx_scans_created ON scans(created_at);
"#;

const SELECT_COLUMNS: &str = "scan_id, repo_url, status, created_at, started_at, completed_at, \
                              result_json, error, tool_runs_json";

/// Registry persisted in a SQLite database (WAL mode)
#[derive(Clone)]
pub struct SqliteRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRegistry {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open scan database: {}", path.display()))?;

        // WAL lets the CLI read while a server writes
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::with_connection(conn)
    }

    /// Private database that disappears with the registry
    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize scan database schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, RegistryError> {
        self.conn.lock().map_err(|_| RegistryError::Poisoned)
    }

    fn fetch(conn: &Connection, scan_id: &str) -> Result<Option<ScanJob>, RegistryError> {
        let row = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM scans WHERE scan_id = ?1"),
                params![scan_id],
                StoredScan::from_row,
            )
            .optional()?;
        row.map(StoredScan::into_job).transpose()
    }
}

impl ScanRegistry for SqliteRegistry {
    fn create(&self, job: &ScanJob) -> Result<(), RegistryError> {
        let conn = self.conn()?;
        let result_json = job.result.as_ref().map(serde_json::to_string).transpose()?;
        let inserted = conn.execute(
            r#"
            INSERT OR IGNORE INTO scans (scan_id, repo_url, status, created_at, started_at, completed_at, result_json, error, tool_runs_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                job.scan_id,
                job.repo_url,
                job.status.as_str(),
                job.created_at.timestamp_millis(),
                job.started_at.map(|t| t.timestamp_millis()),
                job.completed_at.map(|t| t.timestamp_millis()),
                result_json,
                job.error,
                serde_json::to_string(&job.tool_runs)?,
            ],
        )?;

        if inserted == 0 {
            return Err(RegistryError::AlreadyExists(job.scan_id.clone()));
        }
        Ok(())
    }

    fn get(&self, scan_id: &str) -> Result<ScanJob, RegistryError> {
        let conn = self.conn()?;
        Self::fetch(&conn, scan_id)?.ok_or_else(|| RegistryError::NotFound(scan_id.to_string()))
    }

    fn update(
        &self,
        scan_id: &str,
        expected: ScanStatus,
        update: ScanUpdate,
    ) -> Result<ScanJob, RegistryError> {
        let conn = self.conn()?;
        let mut job =
            Self::fetch(&conn, scan_id)?.ok_or_else(|| RegistryError::NotFound(scan_id.to_string()))?;

        if job.status != expected {
            return Err(RegistryError::Conflict {
                scan_id: scan_id.to_string(),
                expected,
                actual: job.status,
            });
        }
        job.apply(update)?;

        let result_json = job.result.as_ref().map(serde_json::to_string).transpose()?;
        let changed = conn.execute(
            r#"
            UPDATE scans
            SET status = ?1, started_at = ?2, completed_at = ?3, result_json = ?4, error = ?5, tool_runs_json = ?6
            WHERE scan_id = ?7 AND status = ?8
            "#,
            params![
                job.status.as_str(),
                job.started_at.map(|t| t.timestamp_millis()),
                job.completed_at.map(|t| t.timestamp_millis()),
                result_json,
                job.error,
                serde_json::to_string(&job.tool_runs)?,
                scan_id,
                expected.as_str(),
            ],
        )?;

        // Another process sharing the database got there first
        if changed == 0 {
            let actual = Self::fetch(&conn, scan_id)?
                .map(|j| j.status)
                .ok_or_else(|| RegistryError::NotFound(scan_id.to_string()))?;
            return Err(RegistryError::Conflict {
                scan_id: scan_id.to_string(),
                expected,
                actual,
            });
        }

        Ok(job)
    }

    fn list(
        &self,
        status: Option<ScanStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<ScanJob>, RegistryError> {
        let conn = self.conn()?;
        let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM scans \
             WHERE (?1 IS NULL OR status = ?1) \
             ORDER BY created_at DESC, scan_id ASC LIMIT ?2"
        ))?;

        let rows = stmt
            .query_map(params![status.map(|s| s.as_str()), limit], StoredScan::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(StoredScan::into_job).collect()
    }
}

/// Raw column values of one `scans` row
struct StoredScan {
    scan_id: String,
    repo_url: String,
    status: String,
    created_at: i64,
    started_at: Option<i64>,
    completed_at: Option<i64>,
    result_json: Option<String>,
    error: Option<String>,
    tool_runs_json: String,
}

impl StoredScan {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            scan_id: row.get(0)?,
            repo_url: row.get(1)?,
            status: row.get(2)?,
            created_at: row.get(3)?,
            started_at: row.get(4)?,
            completed_at: row.get(5)?,
            result_json: row.get(6)?,
            error: row.get(7)?,
            tool_runs_json: row.get(8)?,
        })
    }

    fn into_job(self) -> Result<ScanJob, RegistryError> {
        let corrupt = |reason: String| RegistryError::Corrupt {
            scan_id: self.scan_id.clone(),
            reason,
        };

        let status = ScanStatus::parse(&self.status)
            .ok_or_else(|| corrupt(format!("unknown status '{}'", self.status)))?;
        let created_at = from_millis(self.created_at)
            .ok_or_else(|| corrupt(format!("bad timestamp {}", self.created_at)))?;

        Ok(ScanJob {
            status,
            created_at,
            started_at: self.started_at.and_then(from_millis),
            completed_at: self.completed_at.and_then(from_millis),
            result: self
                .result_json
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            error: self.error,
            tool_runs: serde_json::from_str(&self.tool_runs_json)?,
            repo_url: self.repo_url,
            scan_id: self.scan_id,
        })
    }
}

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::contract;
    use tempfile::TempDir;

    #[test]
    fn create_and_get() {
        contract::create_and_get(&SqliteRegistry::open_in_memory().unwrap());
    }

    #[test]
    fn full_lifecycle() {
        contract::full_lifecycle(&SqliteRegistry::open_in_memory().unwrap());
    }

    #[test]
    fn compare_and_set() {
        contract::compare_and_set(&SqliteRegistry::open_in_memory().unwrap());
    }

    #[test]
    fn list_filters() {
        contract::list_filters(&SqliteRegistry::open_in_memory().unwrap());
    }

    #[test]
    fn huge_limit_lists_everything() {
        let registry = SqliteRegistry::open_in_memory().unwrap();
        for n in 0..3 {
            registry
                .create(&ScanJob::new(format!("https://example.com/{n}.git")))
                .unwrap();
        }
        assert_eq!(registry.list(None, Some(usize::MAX)).unwrap().len(), 3);
        assert_eq!(registry.list(None, Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("scans.db");
        let job = ScanJob::new("https://example.com/persist.git");

        {
            let registry = SqliteRegistry::open(&path).unwrap();
            registry.create(&job).unwrap();
            registry
                .update(&job.scan_id, ScanStatus::Pending, ScanUpdate::started())
                .unwrap();
        }

        let registry = SqliteRegistry::open(&path).unwrap();
        let stored = registry.get(&job.scan_id).unwrap();
        assert_eq!(stored.status, ScanStatus::InProgress);
        assert_eq!(
            stored.created_at.timestamp_millis(),
            job.created_at.timestamp_millis()
        );
    }

    #[test]
    fn second_handle_sees_conflict() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scans.db");
        let a = SqliteRegistry::open(&path).unwrap();
        let b = SqliteRegistry::open(&path).unwrap();

        let job = ScanJob::new("https://example.com/race.git");
        a.create(&job).unwrap();
        a.update(&job.scan_id, ScanStatus::Pending, ScanUpdate::started())
            .unwrap();

        let err = b
            .update(&job.scan_id, ScanStatus::Pending, ScanUpdate::started())
            .unwrap_err();
        assert!(matches!(err, RegistryError::Conflict { .. }));
    }
}
