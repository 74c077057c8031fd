//! Longitudinal history types.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::assessment::RiskScore;

/// Storage and display format for record dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One persisted (subject, date, score) observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Monotonic insertion index assigned by the store
    pub id: i64,
    pub subject_id: String,
    pub date: NaiveDate,
    pub score: RiskScore,
}

/// Order in which a subject's history is presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryOrder {
    /// As stored (insertion order)
    #[default]
    Insertion,
    /// By date; records sharing a date keep insertion order
    Chronological,
}

impl HistoryOrder {
    /// Reorder records in place.
    pub fn apply(self, records: &mut [HistoryRecord]) {
        match self {
            Self::Insertion => records.sort_by_key(|r| r.id),
            Self::Chronological => records.sort_by_key(|r| (r.date, r.id)),
        }
    }
}

impl FromStr for HistoryOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insertion" | "stored" => Ok(Self::Insertion),
            "date" | "chronological" => Ok(Self::Chronological),
            other => Err(format!(
                "unknown history order {other:?} (expected \"insertion\" or \"date\")"
            )),
        }
    }
}

/// One chart point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub label: String,
    pub score: f64,
}

/// Ordered, non-empty series handed to a trend renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    points: Vec<TrendPoint>,
}

impl TrendSeries {
    /// Build a series from ordered records. Returns `None` when there are none.
    #[must_use]
    pub fn from_records(records: &[HistoryRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        let points = records
            .iter()
            .map(|r| TrendPoint {
                label: r.date.format(DATE_FORMAT).to_string(),
                score: r.score.value(),
            })
            .collect();
        Some(Self { points })
    }

    #[must_use]
    pub fn points(&self) -> &[TrendPoint] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn latest(&self) -> &TrendPoint {
        // Non-empty by construction.
        &self.points[self.points.len() - 1]
    }
}

/// Short, stable reference to a subject for log lines.
///
/// Subject identifiers never appear in logs verbatim.
#[must_use]
pub fn subject_ref(subject_id: &str) -> String {
    let digest = Sha256::digest(subject_id.as_bytes());
    digest.iter().take(6).map(|b| format!("{b:02x}")).collect()
}

/// Parse a `YYYY-MM-DD` date.
///
/// # Errors
/// Returns the chrono parse error for malformed input.
pub fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, date: &str, p: f64) -> HistoryRecord {
        HistoryRecord {
            id,
            subject_id: "C001".into(),
            date: parse_date(date).expect("valid date"),
            score: RiskScore::new(p).expect("valid score"),
        }
    }

    #[test]
    fn test_empty_records_have_no_series() {
        assert!(TrendSeries::from_records(&[]).is_none());
    }

    #[test]
    fn test_series_preserves_record_order() {
        let records = vec![record(1, "2024-03-01", 0.2), record(2, "2024-01-15", 0.7)];
        let series = TrendSeries::from_records(&records).expect("non-empty");
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].label, "2024-03-01");
        assert_eq!(series.latest().label, "2024-01-15");
    }

    #[test]
    fn test_chronological_order_is_stable() {
        let mut records = vec![
            record(1, "2024-03-01", 0.2),
            record(2, "2024-01-15", 0.7),
            record(3, "2024-01-15", 0.4),
        ];
        HistoryOrder::Chronological.apply(&mut records);
        let ids: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        HistoryOrder::Insertion.apply(&mut records);
        let ids: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_history_order_parse() {
        assert_eq!("date".parse::<HistoryOrder>(), Ok(HistoryOrder::Chronological));
        assert_eq!("Insertion".parse::<HistoryOrder>(), Ok(HistoryOrder::Insertion));
        assert!("random".parse::<HistoryOrder>().is_err());
    }

    #[test]
    fn test_subject_ref_is_short_and_stable() {
        let a = subject_ref("C001");
        assert_eq!(a.len(), 12);
        assert_eq!(a, subject_ref("C001"));
        assert_ne!(a, subject_ref("C002"));
    }
}
