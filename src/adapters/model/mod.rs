//! Model adapter: loads trained classifier artifacts from disk.
//!
//! An artifact is a JSON document naming the feature order it was trained on
//! plus the parameters of one algorithm family:
//!
//! ```json
//! { "format_version": 1,
//!   "feature_names": ["A1_Score", "...", "relation"],
//!   "classifier": { "kind": "logistic", "coefficients": [...], "intercept": -4.2 } }
//! ```
//!
//! A `"forest"` classifier carries only `trees`; its input width is the length
//! of `feature_names`.
//!
//! # Integrity
//!
//! When `manifest.json` and `model.sig` sit next to the artifact, the Ed25519
//! signature over the manifest bytes is checked against the configured public
//! key, and the artifact's SHA-256 must match its manifest entry. With
//! `require_signature` set, an unsigned artifact is refused.

mod forest;
mod logistic;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{FEATURE_COUNT, FEATURE_NAMES};
use crate::ports::{ModelError, RiskModel};

pub use forest::{ForestModel, Tree, TreeNode};
pub use logistic::{LogisticModel, Scaler};

/// Artifact format understood by this loader.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "model.sig";

/// Parameters of one supported algorithm family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Classifier {
    Logistic(LogisticModel),
    Forest(ForestModel),
}

/// On-disk model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub feature_names: Vec<String>,
    pub classifier: Classifier,
}

impl ModelArtifact {
    /// Parse and structurally validate an artifact.
    ///
    /// # Errors
    /// Returns `ModelError::Format` if the document is malformed or was not
    /// trained on the screening feature order.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ModelError> {
        let mut artifact: Self =
            serde_json::from_slice(bytes).map_err(|e| ModelError::Format(e.to_string()))?;
        if let Classifier::Forest(forest) = &mut artifact.classifier {
            forest.n_features = artifact.feature_names.len();
        }
        artifact.validate()?;
        Ok(artifact)
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ModelError::Format(format!(
                "unsupported format_version {}",
                self.format_version
            )));
        }
        if self.feature_names.len() != FEATURE_COUNT
            || self
                .feature_names
                .iter()
                .zip(FEATURE_NAMES)
                .any(|(got, want)| got != want)
        {
            return Err(ModelError::Format(format!(
                "feature_names do not match the screening feature order ({} names given)",
                self.feature_names.len()
            )));
        }
        match &self.classifier {
            Classifier::Logistic(m) => m.validate(FEATURE_COUNT),
            Classifier::Forest(m) => m.validate(FEATURE_COUNT),
        }
    }

    /// Hand the classifier out as a shared, read-only model.
    #[must_use]
    pub fn into_model(self) -> Arc<dyn RiskModel> {
        match self.classifier {
            Classifier::Logistic(m) => Arc::new(m),
            Classifier::Forest(m) => Arc::new(m),
        }
    }
}

/// Signed list of artifact digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: u32,
    #[serde(default)]
    pub serial: Option<u64>,
    #[serde(default)]
    pub created_at: Option<i64>,
    /// File name → lowercase hex SHA-256
    pub files: BTreeMap<String, String>,
}

/// Loads artifacts with the configured integrity policy.
#[derive(Debug, Clone, Default)]
pub struct ModelLoader {
    require_signature: bool,
    public_key: Option<VerifyingKey>,
}

impl ModelLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse artifacts without a valid signed manifest.
    #[must_use]
    pub fn require_signature(mut self, require: bool) -> Self {
        self.require_signature = require;
        self
    }

    #[must_use]
    pub fn with_public_key(mut self, key: VerifyingKey) -> Self {
        self.public_key = Some(key);
        self
    }

    /// Load, verify, and validate the artifact at `path`.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, fails integrity checks, or is
    /// not a valid screening model.
    pub fn load(&self, path: &Path) -> Result<Arc<dyn RiskModel>, ModelError> {
        let bytes = std::fs::read(path)?;
        self.verify(path, &bytes)?;

        let artifact = ModelArtifact::from_json(&bytes)?;
        let model = artifact.into_model();

        tracing::info!(
            "Loaded {} model from {:?} (n_features={})",
            model.kind(),
            path,
            model.n_features()
        );
        Ok(model)
    }

    fn verify(&self, path: &Path, artifact_bytes: &[u8]) -> Result<(), ModelError> {
        let dir = path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let manifest_path = dir.join(MANIFEST_FILE);
        let sig_path = dir.join(SIGNATURE_FILE);

        if !manifest_path.exists() || !sig_path.exists() {
            if self.require_signature {
                return Err(ModelError::Integrity(format!(
                    "signed manifest required but {MANIFEST_FILE}/{SIGNATURE_FILE} not found in {dir:?}"
                )));
            }
            tracing::warn!("Loading UNSIGNED model artifact {:?}", path);
            return Ok(());
        }

        let public_key = self.public_key.as_ref().ok_or_else(|| {
            ModelError::Integrity("model is signed but no verifying key is configured".into())
        })?;

        let sig_bytes = std::fs::read(&sig_path)?;
        let sig_array: [u8; 64] = sig_bytes.as_slice().try_into().map_err(|_| {
            ModelError::Integrity("invalid signature length (expected 64 bytes)".into())
        })?;
        let signature = Signature::from_bytes(&sig_array);

        let manifest_bytes = std::fs::read(&manifest_path)?;
        public_key
            .verify(&manifest_bytes, &signature)
            .map_err(|_| ModelError::Integrity("invalid manifest signature".into()))?;

        let manifest: ModelManifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| ModelError::Integrity(format!("invalid manifest format: {e}")))?;
        if manifest.version != 1 {
            return Err(ModelError::Integrity(format!(
                "unsupported manifest version {}",
                manifest.version
            )));
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ModelError::Integrity(format!("unusable artifact path {path:?}")))?;
        let expected = manifest.files.get(file_name).ok_or_else(|| {
            ModelError::Integrity(format!("{file_name} is not bound by the signed manifest"))
        })?;
        let actual = sha256_hex(artifact_bytes);
        if !constant_time_eq_str(&expected.to_ascii_lowercase(), &actual) {
            return Err(ModelError::Integrity(format!(
                "{file_name} does not match its manifest digest"
            )));
        }

        tracing::info!(
            serial = manifest.serial.unwrap_or(0),
            "Verified model manifest signature"
        );
        Ok(())
    }
}

/// Decode a base64 Ed25519 public key.
///
/// # Errors
/// Returns `ModelError::Integrity` for bad base64 or key bytes.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, ModelError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|_| ModelError::Integrity("invalid public key base64".into()))?;
    let key: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        ModelError::Integrity("invalid public key length (expected 32 bytes)".into())
    })?;
    VerifyingKey::from_bytes(&key).map_err(|_| ModelError::Integrity("invalid verifying key".into()))
}

/// Lowercase hex SHA-256.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|b| format!("{b:02x}")).collect()
}

// Constant-time compare for ASCII strings (used for SHA-256 hex digests).
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::RngCore;
    use tempfile::tempdir;

    fn logistic_artifact(intercept: f64) -> ModelArtifact {
        ModelArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            classifier: Classifier::Logistic(LogisticModel {
                coefficients: vec![0.1; FEATURE_COUNT],
                intercept,
                scaler: None,
            }),
        }
    }

    fn write_artifact(dir: &Path, artifact: &ModelArtifact) -> PathBuf {
        let path = dir.join("model.json");
        let json = serde_json::to_vec(artifact).expect("serialize artifact");
        std::fs::write(&path, json).expect("write artifact");
        path
    }

    fn signing_key() -> SigningKey {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        SigningKey::from_bytes(&seed)
    }

    fn write_signed_manifest(dir: &Path, key: &SigningKey, files: &[(&str, &[u8])]) {
        let manifest = ModelManifest {
            version: 1,
            serial: Some(7),
            created_at: Some(1_700_000_000),
            files: files
                .iter()
                .map(|(name, bytes)| ((*name).to_string(), sha256_hex(bytes)))
                .collect(),
        };
        let bytes = serde_json::to_vec(&manifest).expect("serialize manifest");
        std::fs::write(dir.join(MANIFEST_FILE), &bytes).expect("write manifest");
        let sig: Signature = key.sign(&bytes);
        std::fs::write(dir.join(SIGNATURE_FILE), sig.to_bytes()).expect("write signature");
    }

    #[test]
    fn test_load_unsigned_when_not_required() {
        let temp = tempdir().expect("tempdir");
        let path = write_artifact(temp.path(), &logistic_artifact(0.0));

        let model = ModelLoader::new().load(&path).expect("Should load");
        assert_eq!(model.kind(), "logistic");
        assert_eq!(model.n_features(), FEATURE_COUNT);
    }

    #[test]
    fn test_unsigned_refused_when_required() {
        let temp = tempdir().expect("tempdir");
        let path = write_artifact(temp.path(), &logistic_artifact(0.0));

        let err = ModelLoader::new()
            .require_signature(true)
            .load(&path)
            .err()
            .expect("must fail");
        assert!(matches!(err, ModelError::Integrity(_)));
    }

    #[test]
    fn test_signed_artifact_verifies() {
        let temp = tempdir().expect("tempdir");
        let path = write_artifact(temp.path(), &logistic_artifact(0.0));
        let bytes = std::fs::read(&path).expect("read artifact");
        let key = signing_key();
        write_signed_manifest(temp.path(), &key, &[("model.json", &bytes)]);

        let loader = ModelLoader::new()
            .require_signature(true)
            .with_public_key(key.verifying_key());
        assert!(loader.load(&path).is_ok());
    }

    #[test]
    fn test_tampered_artifact_is_rejected() {
        let temp = tempdir().expect("tempdir");
        let path = write_artifact(temp.path(), &logistic_artifact(0.0));
        let bytes = std::fs::read(&path).expect("read artifact");
        let key = signing_key();
        write_signed_manifest(temp.path(), &key, &[("model.json", &bytes)]);

        // Replace the artifact after signing.
        write_artifact(temp.path(), &logistic_artifact(3.0));

        let loader = ModelLoader::new().with_public_key(key.verifying_key());
        let err = loader.load(&path).err().expect("must fail");
        assert!(err.to_string().contains("digest"));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let temp = tempdir().expect("tempdir");
        let path = write_artifact(temp.path(), &logistic_artifact(0.0));
        let bytes = std::fs::read(&path).expect("read artifact");
        write_signed_manifest(temp.path(), &signing_key(), &[("model.json", &bytes)]);

        let loader = ModelLoader::new().with_public_key(signing_key().verifying_key());
        let err = loader.load(&path).err().expect("must fail");
        assert!(err.to_string().contains("signature"));
    }

    #[test]
    fn test_feature_order_must_match() {
        let mut artifact = logistic_artifact(0.0);
        artifact.feature_names.swap(10, 11);
        let json = serde_json::to_vec(&artifact).expect("serialize");
        assert!(matches!(
            ModelArtifact::from_json(&json),
            Err(ModelError::Format(_))
        ));
    }

    #[test]
    fn test_forest_artifact_parses() {
        let json = serde_json::json!({
            "format_version": 1,
            "feature_names": FEATURE_NAMES,
            "classifier": {
                "kind": "forest",
                "trees": [{"nodes": [
                    {"feature": 17, "threshold": 6.5, "left": 1, "right": 2},
                    {"value": [40, 2]},
                    {"value": [3, 30]}
                ]}]
            }
        });
        let bytes = serde_json::to_vec(&json).expect("serialize");
        let model = ModelArtifact::from_json(&bytes)
            .expect("Should parse")
            .into_model();
        assert_eq!(model.kind(), "forest");
        assert_eq!(model.n_features(), FEATURE_COUNT);

        let mut x = [0.0; FEATURE_COUNT];
        x[17] = 9.0;
        let proba = model.predict_proba(&x).expect("Should predict");
        assert!(proba[1] > 0.9);
    }

    #[test]
    fn test_public_key_b64() {
        let key = signing_key();
        let b64 = base64::engine::general_purpose::STANDARD.encode(key.verifying_key().to_bytes());
        let parsed = verifying_key_from_b64(&b64).expect("Should decode");
        assert_eq!(parsed, key.verifying_key());
        assert!(verifying_key_from_b64("not base64!").is_err());
    }
}
