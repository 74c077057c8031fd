//! SQLite adapter: Implementation of HistoryStore.
//!
//! Provides local persistence for the longitudinal risk history.
//!
//! # Schema
//!
//! A single `risk_history` table, created idempotently on open. The
//! `AUTOINCREMENT` id is the monotonic insertion index used for display order.
//!
//! # Mutex Behavior
//!
//! The connection is protected by a `Mutex`. A poisoned mutex is reported as
//! `StorageError::Unavailable` rather than panicking.
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::{params, Connection};

use crate::domain::{parse_date, subject_ref, HistoryRecord, RiskScore, DATE_FORMAT};
use crate::ports::HistoryStore;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt history record {id}: {reason}")]
    Corrupt { id: i64, reason: String },
}

/// SQLite history store.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite database (for testing).
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("connection lock poisoned".into()))
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS risk_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                child_id TEXT,
                date TEXT,
                risk REAL
            );

            CREATE INDEX IF NOT EXISTS idx_risk_history_child
                ON risk_history(child_id, id);
            ",
        )?;

        Ok(())
    }

    fn to_record(
        id: i64,
        subject_id: String,
        date: String,
        risk: f64,
    ) -> Result<HistoryRecord, StorageError> {
        let date = parse_date(&date).map_err(|e| StorageError::Corrupt {
            id,
            reason: format!("bad date {date:?}: {e}"),
        })?;
        let score = RiskScore::new(risk).ok_or_else(|| StorageError::Corrupt {
            id,
            reason: format!("risk {risk} outside [0, 1]"),
        })?;
        Ok(HistoryRecord {
            id,
            subject_id,
            date,
            score,
        })
    }
}

impl HistoryStore for SqliteHistoryStore {
    type Error = StorageError;

    fn append(
        &self,
        subject_id: &str,
        date: NaiveDate,
        score: RiskScore,
    ) -> Result<i64, Self::Error> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO risk_history (child_id, date, risk) VALUES (?1, ?2, ?3)",
            params![
                subject_id,
                date.format(DATE_FORMAT).to_string(),
                score.value()
            ],
        )?;
        let id = conn.last_insert_rowid();

        tracing::debug!(
            record_id = id,
            subject_ref = %subject_ref(subject_id),
            "Appended risk history record"
        );
        Ok(id)
    }

    fn query_by_subject(&self, subject_id: &str) -> Result<Vec<HistoryRecord>, Self::Error> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r"
            SELECT id, child_id, date, risk
            FROM risk_history
            WHERE child_id = ?1
            ORDER BY id ASC
            ",
        )?;

        let rows = stmt
            .query_map(params![subject_id], |row| {
                let id: i64 = row.get(0)?;
                let subject: String = row.get(1)?;
                let date: String = row.get(2)?;
                let risk: f64 = row.get(3)?;
                Ok((id, subject, date, risk))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, subject, date, risk)| Self::to_record(id, subject, date, risk))
            .collect()
    }

    fn count_for_subject(&self, subject_id: &str) -> Result<usize, Self::Error> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM risk_history WHERE child_id = ?1",
            params![subject_id],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    fn subjects(&self) -> Result<Vec<String>, Self::Error> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r"
            SELECT child_id
            FROM risk_history
            WHERE child_id IS NOT NULL
            GROUP BY child_id
            ORDER BY MIN(id) ASC
            ",
        )?;

        let subjects = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(subjects)
    }
}
