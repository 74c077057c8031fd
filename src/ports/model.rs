//! Model port: the trained classifier as an opaque capability.
//!
//! Any artifact that can turn the 19-value feature vector into a two-class
//! probability pair can back the risk predictor.

/// Error type for classifier artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid model artifact: {0}")]
    Format(String),

    #[error("Model integrity check failed: {0}")]
    Integrity(String),

    #[error("Input has {got} features, model expects {expected}")]
    Dimension { expected: usize, got: usize },

    #[error("Model produced an invalid probability: {0}")]
    InvalidOutput(String),
}

/// A loaded, immutable classifier exposing probability outputs.
pub trait RiskModel: Send + Sync {
    /// Short name of the algorithm family (for logs).
    fn kind(&self) -> &'static str;

    /// Number of input features the model was trained on.
    fn n_features(&self) -> usize;

    /// Class probabilities `[negative, positive]` for one input row.
    ///
    /// # Errors
    /// Returns `ModelError::Dimension` if `features` has the wrong length.
    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2], ModelError>;
}
