//! # Earlysign
//!
//! Early-childhood autism risk screening with longitudinal tracking.
//!
//! This crate provides:
//! - Encoding of questionnaire answers into the model's feature vector
//! - Risk scoring through a pre-trained, optionally signed, classifier
//! - Low/Moderate/High tier classification
//! - Append-only per-subject history and trend charts
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types (answers, feature vector, risk score, history)
//! - `ports`: Trait definitions for external operations
//! - `adapters`: Concrete implementations (model artifacts, SQLite, SVG, log sanitizing)
//! - `application`: Use cases orchestrating domain and ports
//! - `config`: Runtime settings

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{RiskPredictor, ScoringService};
pub use domain::{Assessment, FeatureVector, RawAnswers, RiskScore, RiskTier};

/// Result type for Earlysign operations
pub type Result<T> = std::result::Result<T, EarlysignError>;

/// Main error type for Earlysign
#[derive(Debug, thiserror::Error)]
pub enum EarlysignError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Field {field} has unusable value {value:?}")]
    TypeFormat { field: String, value: String },

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed: {0}")]
    Inference(#[from] ports::ModelError),

    #[error("History storage unavailable: {0}")]
    StorageUnavailable(#[from] adapters::StorageError),

    #[error("No history recorded for subject {0}")]
    NoHistory(String),

    #[error("Rendering failed: {0}")]
    Render(#[from] ports::RenderError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EarlysignError {
    /// The caller can fix this by correcting the submitted answers.
    #[must_use]
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Self::MissingField(_) | Self::TypeFormat { .. })
    }

    /// The same request may succeed later without changes.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

impl From<domain::AnswerError> for EarlysignError {
    fn from(err: domain::AnswerError) -> Self {
        match err {
            domain::AnswerError::MissingField(field) => Self::MissingField(field),
            domain::AnswerError::TypeFormat { field, value } => Self::TypeFormat { field, value },
        }
    }
}

impl From<application::PredictorError> for EarlysignError {
    fn from(err: application::PredictorError) -> Self {
        match err {
            application::PredictorError::ModelUnavailable(reason) => Self::ModelUnavailable(reason),
            application::PredictorError::Inference(e) => Self::Inference(e),
        }
    }
}
