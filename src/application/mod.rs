//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! scoring and history review.

mod predictor;
mod scoring;

pub use predictor::{PredictorError, RiskPredictor};
pub use scoring::ScoringService;
