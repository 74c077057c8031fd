//! Domain layer: Core screening types and logic.
//!
//! Pure types with no I/O. The encoding tables and feature order are frozen to
//! the trained model.

mod answers;
mod assessment;
pub mod encoding;
mod history;

pub use answers::{
    build, AnswerError, FeatureVector, RawAnswers, RawValue, ScreeningAnswers, FEATURE_COUNT,
    FEATURE_NAMES, QUESTION_FIELDS,
};
pub use assessment::{classify, Assessment, RiskScore, RiskTier, HIGH_THRESHOLD, MODERATE_THRESHOLD};
pub use history::{
    parse_date, subject_ref, HistoryOrder, HistoryRecord, TrendPoint, TrendSeries, DATE_FORMAT,
};
