//! Risk scores, tiers, and the outcome of one screening.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lower bound (inclusive) of the moderate tier.
pub const MODERATE_THRESHOLD: f64 = 0.3;

/// Lower bound (inclusive) of the high tier.
pub const HIGH_THRESHOLD: f64 = 0.6;

/// Model probability of the positive class, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskScore(f64);

impl RiskScore {
    /// Wrap a probability. Returns `None` if it is not a finite value in `[0, 1]`.
    #[must_use]
    pub fn new(probability: f64) -> Option<Self> {
        (probability.is_finite() && (0.0..=1.0).contains(&probability)).then_some(Self(probability))
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Rounded to two decimals for display.
    #[must_use]
    pub fn rounded(self) -> f64 {
        (self.0 * 100.0).round() / 100.0
    }

    #[must_use]
    pub fn tier(self) -> RiskTier {
        classify(self)
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Coarse risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    /// Score below 0.3
    Low,
    /// Score in [0.3, 0.6)
    Moderate,
    /// Score of 0.6 or above
    High,
}

impl RiskTier {
    /// Label shown alongside the score.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::Moderate => "Moderate Risk",
            Self::High => "High Risk",
        }
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Low risk - continue routine developmental monitoring",
            Self::Moderate => "Moderate risk - rescreening or specialist follow-up suggested",
            Self::High => "High risk - referral for diagnostic evaluation advised",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a score to its tier. Each tier's lower bound is inclusive.
#[must_use]
pub fn classify(score: RiskScore) -> RiskTier {
    let p = score.value();
    if p < MODERATE_THRESHOLD {
        RiskTier::Low
    } else if p < HIGH_THRESHOLD {
        RiskTier::Moderate
    } else {
        RiskTier::High
    }
}

/// Result of scoring one subject on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub subject_id: String,
    pub date: NaiveDate,
    pub score: RiskScore,
    pub tier: RiskTier,
    /// Row id of the persisted history record
    pub record_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier_of(p: f64) -> RiskTier {
        classify(RiskScore::new(p).expect("valid probability"))
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(tier_of(0.0), RiskTier::Low);
        assert_eq!(tier_of(0.29), RiskTier::Low);
        assert_eq!(tier_of(0.3), RiskTier::Moderate);
        assert_eq!(tier_of(0.59), RiskTier::Moderate);
        assert_eq!(tier_of(0.6), RiskTier::High);
        assert_eq!(tier_of(1.0), RiskTier::High);
    }

    #[test]
    fn test_score_rejects_out_of_range() {
        assert!(RiskScore::new(-0.01).is_none());
        assert!(RiskScore::new(1.01).is_none());
        assert!(RiskScore::new(f64::NAN).is_none());
        assert!(RiskScore::new(0.5).is_some());
    }

    #[test]
    fn test_display() {
        let score = RiskScore::new(0.456).expect("valid");
        assert_eq!(score.to_string(), "0.46");
        assert!((score.rounded() - 0.46).abs() < f64::EPSILON);
        assert_eq!(score.tier().to_string(), "Moderate Risk");
    }
}
