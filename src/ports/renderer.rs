//! Renderer port: visualization sink for a subject's risk trend.

use crate::domain::TrendSeries;

/// Error type for trend rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to write chart: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot render chart: {0}")]
    Invalid(String),

    #[error("Chart drawing failed: {0}")]
    Draw(String),
}

/// Turns an ordered, non-empty series into a visual artifact.
pub trait TrendRenderer {
    /// What rendering produces (a file path, an in-memory document, ...).
    type Output;

    /// # Errors
    /// Returns error if the artifact cannot be produced.
    fn render(&self, subject_id: &str, series: &TrendSeries) -> Result<Self::Output, RenderError>;
}
