//! History port: append-only store of per-subject risk scores.

use chrono::NaiveDate;

use crate::domain::{HistoryRecord, RiskScore};

/// Trait for longitudinal score persistence.
///
/// Records are never updated or deleted.
pub trait HistoryStore: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Append one record and return its identifier.
    ///
    /// Repeated calls with the same arguments create separate records.
    ///
    /// # Errors
    /// Returns error if the storage medium is unavailable.
    fn append(&self, subject_id: &str, date: NaiveDate, score: RiskScore)
        -> Result<i64, Self::Error>;

    /// All records for a subject, in insertion order.
    ///
    /// An unknown subject yields an empty vector.
    ///
    /// # Errors
    /// Returns error if the storage medium is unavailable.
    fn query_by_subject(&self, subject_id: &str) -> Result<Vec<HistoryRecord>, Self::Error>;

    /// Number of records for a subject.
    ///
    /// # Errors
    /// Returns error if the storage medium is unavailable.
    fn count_for_subject(&self, subject_id: &str) -> Result<usize, Self::Error>;

    /// Distinct subject identifiers, in order of first appearance.
    ///
    /// # Errors
    /// Returns error if the storage medium is unavailable.
    fn subjects(&self) -> Result<Vec<String>, Self::Error>;
}
