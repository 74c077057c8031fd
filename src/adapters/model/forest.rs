//! Decision-forest artifact (random-forest style probability averaging).
//!
//! Each tree is a flat node array rooted at index 0. Children always have a
//! larger index than their parent, so traversal cannot loop.

use serde::{Deserialize, Serialize};

use crate::ports::{ModelError, RiskModel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Go to `left` when `x[feature] <= threshold`, else `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class weights `[negative, positive]`; normalised at prediction time.
    Leaf { value: [f64; 2] },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::Format("tree has no nodes".into()));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(ModelError::Format(format!(
                            "node {idx} splits on feature {feature} (only {n_features})"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(ModelError::Format(format!(
                            "node {idx} has a non-finite threshold"
                        )));
                    }
                    for child in [left, right] {
                        if *child <= idx || *child >= self.nodes.len() {
                            return Err(ModelError::Format(format!(
                                "node {idx} has invalid child index {child}"
                            )));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    let total = value[0] + value[1];
                    if value.iter().any(|v| !v.is_finite() || *v < 0.0) || total <= 0.0 {
                        return Err(ModelError::Format(format!(
                            "leaf {idx} has invalid class weights"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf_proba(&self, features: &[f64]) -> [f64; 2] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { value } => {
                    let total = value[0] + value[1];
                    return [value[0] / total, value[1] / total];
                }
            }
        }
    }
}

/// Mean of per-tree leaf distributions.
///
/// The artifact carries only `trees`; the feature count is taken from the
/// artifact's `feature_names` when it is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    #[serde(skip)]
    pub n_features: usize,
    pub trees: Vec<Tree>,
}

impl ForestModel {
    pub(crate) fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        if self.n_features != n_features {
            return Err(ModelError::Format(format!(
                "forest declares {} features, artifact lists {n_features}",
                self.n_features
            )));
        }
        if self.trees.is_empty() {
            return Err(ModelError::Format("forest has no trees".into()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(n_features)
                .map_err(|e| ModelError::Format(format!("tree {i}: {e}")))?;
        }
        Ok(())
    }
}

impl RiskModel for ForestModel {
    fn kind(&self) -> &'static str {
        "forest"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &[f64]) -> Result<[f64; 2], ModelError> {
        if features.len() != self.n_features {
            return Err(ModelError::Dimension {
                expected: self.n_features,
                got: features.len(),
            });
        }
        let mut sum = [0.0f64; 2];
        for tree in &self.trees {
            let p = tree.leaf_proba(features);
            sum[0] += p[0];
            sum[1] += p[1];
        }
        let n = self.trees.len() as f64;
        Ok([sum[0] / n, sum[1] / n])
    }
}
