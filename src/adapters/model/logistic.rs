//! Logistic regression artifact.

use serde::{Deserialize, Serialize};

use crate::ports::{ModelError, RiskModel};

/// Per-feature standardisation applied before the linear term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// `P(positive) = sigmoid(w . z + b)` with `z` optionally standardised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default)]
    pub scaler: Option<Scaler>,
}

impl LogisticModel {
    pub(crate) fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        if self.coefficients.len() != n_features {
            return Err(ModelError::Format(format!(
                "logistic model has {} coefficients for {n_features} features",
                self.coefficients.len()
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|w| !w.is_finite()) {
            return Err(ModelError::Format("non-finite logistic parameter".into()));
        }
        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != n_features || scaler.scale.len() != n_features {
                return Err(ModelError::Format(
                    "scaler lengths do not match feature count".into(),
                ));
            }
            if scaler.scale.iter().any(|s| !s.is_finite() || *s == 0.0)
                || scaler.mean.iter().any(|m| !m.is_finite())
            {
                return Err(ModelError::Format(
                    "scaler contains a zero or non-finite value".into(),
                ));
            }
        }
        Ok(())
    }

    fn decision_function(&self, features: &[f64]) -> f64 {
        let linear: f64 = match &self.scaler {
            Some(scaler) => features
                .iter()
                .zip(&self.coefficients)
                .zip(scaler.mean.iter().zip(&scaler.scale))
                .map(|((x, w), (mu, sd))| w * (x - mu) / sd)
                .sum(),
            None => features
                .iter()
                .zip(&self.coefficients)
                .map(|(x, w)| w * x)
                .sum(),
        };
        linear + self.intercept
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl RiskModel for LogisticModel {
    fn kind(&self) -> &'static str {
        "logistic"
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2], ModelError> {
        if features.len() != self.coefficients.len() {
            return Err(ModelError::Dimension {
                expected: self.coefficients.len(),
                got: features.len(),
            });
        }
        let p = sigmoid(self.decision_function(features));
        Ok([1.0 - p, p])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_weights_give_even_odds() {
        let model = LogisticModel {
            coefficients: vec![0.0; 3],
            intercept: 0.0,
            scaler: None,
        };
        let proba = model.predict_proba(&[1.0, 2.0, 3.0]).expect("Should predict");
        assert!((proba[1] - 0.5).abs() < 1e-12);
        assert!((proba[0] + proba[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scaler_is_applied() {
        let model = LogisticModel {
            coefficients: vec![1.0],
            intercept: 0.0,
            scaler: Some(Scaler {
                mean: vec![10.0],
                scale: vec![2.0],
            }),
        };
        // (12 - 10) / 2 = 1
        let proba = model.predict_proba(&[12.0]).expect("Should predict");
        assert!((proba[1] - sigmoid(1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_dimension_mismatch() {
        let model = LogisticModel {
            coefficients: vec![1.0, 1.0],
            intercept: 0.0,
            scaler: None,
        };
        assert!(matches!(
            model.predict_proba(&[1.0]),
            Err(ModelError::Dimension { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_scale() {
        let model = LogisticModel {
            coefficients: vec![1.0],
            intercept: 0.0,
            scaler: Some(Scaler {
                mean: vec![0.0],
                scale: vec![0.0],
            }),
        };
        assert!(model.validate(1).is_err());
        assert!(model.validate(2).is_err());
    }
}
