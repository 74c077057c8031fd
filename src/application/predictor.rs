//! Risk predictor: the only way the rest of the crate reaches the model.
//!
//! The artifact is loaded once, explicitly, at process start and then shared
//! read-only. Nothing here initialises lazily.

use std::path::Path;
use std::sync::Arc;

use crate::adapters::model::ModelLoader;
use crate::domain::{FeatureVector, RiskScore};
use crate::ports::{ModelError, RiskModel};

/// Error type for prediction.
#[derive(Debug, thiserror::Error)]
pub enum PredictorError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed: {0}")]
    Inference(#[from] ModelError),
}

#[derive(Clone)]
enum ModelState {
    Loaded(Arc<dyn RiskModel>),
    Unavailable(String),
}

/// Wraps a shared classifier and turns feature vectors into risk scores.
#[derive(Clone)]
pub struct RiskPredictor {
    state: ModelState,
}

impl RiskPredictor {
    /// Load the artifact at `path`.
    ///
    /// # Errors
    /// Returns `PredictorError::ModelUnavailable` if the artifact cannot be
    /// read, verified, or validated.
    pub fn load(path: &Path, loader: &ModelLoader) -> Result<Self, PredictorError> {
        let model = loader
            .load(path)
            .map_err(|e| PredictorError::ModelUnavailable(format!("{}: {e}", path.display())))?;
        Ok(Self::from_model(model))
    }

    /// Use an already constructed model.
    #[must_use]
    pub fn from_model(model: Arc<dyn RiskModel>) -> Self {
        Self {
            state: ModelState::Loaded(model),
        }
    }

    /// A predictor that refuses every request.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: ModelState::Unavailable(reason.into()),
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, ModelState::Loaded(_))
    }

    /// Algorithm family of the loaded model, if any.
    #[must_use]
    pub fn model_kind(&self) -> Option<&'static str> {
        match &self.state {
            ModelState::Loaded(model) => Some(model.kind()),
            ModelState::Unavailable(_) => None,
        }
    }

    /// Positive-class probability for one vector.
    ///
    /// # Errors
    /// `ModelUnavailable` without a loaded model; `Inference` if the model
    /// rejects the vector or returns something that is not a probability pair.
    pub fn predict(&self, vector: &FeatureVector) -> Result<RiskScore, PredictorError> {
        let model = match &self.state {
            ModelState::Loaded(model) => model,
            ModelState::Unavailable(reason) => {
                return Err(PredictorError::ModelUnavailable(reason.clone()))
            }
        };

        let proba = model.predict_proba(vector.as_slice())?;
        let positive = proba[1];

        if !proba.iter().all(|p| p.is_finite()) || (proba[0] + proba[1] - 1.0).abs() > 1e-6 {
            return Err(ModelError::InvalidOutput(format!(
                "class probabilities {proba:?} do not form a distribution"
            ))
            .into());
        }
        RiskScore::new(positive).ok_or_else(|| {
            ModelError::InvalidOutput(format!("positive-class probability {positive} outside [0, 1]"))
                .into()
        })
    }
}

impl std::fmt::Debug for RiskPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            ModelState::Loaded(model) => f
                .debug_struct("RiskPredictor")
                .field("kind", &model.kind())
                .field("n_features", &model.n_features())
                .finish(),
            ModelState::Unavailable(reason) => f
                .debug_struct("RiskPredictor")
                .field("unavailable", reason)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FEATURE_COUNT;

    /// Returns a fixed pair regardless of input.
    struct FixedModel {
        proba: [f64; 2],
        n: usize,
    }

    impl RiskModel for FixedModel {
        fn kind(&self) -> &'static str {
            "fixed"
        }

        fn n_features(&self) -> usize {
            self.n
        }

        fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2], ModelError> {
            if features.len() != self.n {
                return Err(ModelError::Dimension {
                    expected: self.n,
                    got: features.len(),
                });
            }
            Ok(self.proba)
        }
    }

    fn predictor(proba: [f64; 2], n: usize) -> RiskPredictor {
        RiskPredictor::from_model(Arc::new(FixedModel { proba, n }))
    }

    fn vector() -> FeatureVector {
        FeatureVector::from([0.0; FEATURE_COUNT])
    }

    #[test]
    fn test_uses_positive_class_probability() {
        let score = predictor([0.25, 0.75], FEATURE_COUNT)
            .predict(&vector())
            .expect("Should predict");
        assert!((score.value() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unavailable_model() {
        let p = RiskPredictor::unavailable("artifact missing");
        assert!(!p.is_ready());
        assert!(matches!(
            p.predict(&vector()),
            Err(PredictorError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_dimension_mismatch_is_inference_error() {
        let err = predictor([0.5, 0.5], 9)
            .predict(&vector())
            .expect_err("must fail");
        assert!(matches!(
            err,
            PredictorError::Inference(ModelError::Dimension { expected: 9, got: 19 })
        ));
    }

    #[test]
    fn test_invalid_output_is_inference_error() {
        for proba in [[0.5, 1.5], [-0.5, 1.5], [f64::NAN, 0.5], [0.2, 0.2]] {
            let err = predictor(proba, FEATURE_COUNT)
                .predict(&vector())
                .expect_err("must fail");
            assert!(matches!(
                err,
                PredictorError::Inference(ModelError::InvalidOutput(_))
            ));
        }
    }

    #[test]
    fn test_missing_artifact_is_unavailable() {
        let err = RiskPredictor::load(Path::new("does/not/exist.json"), &ModelLoader::new())
            .expect_err("must fail");
        assert!(matches!(err, PredictorError::ModelUnavailable(_)));
    }
}
