//! Runtime settings.
//!
//! Each value resolves from its command-line flag, then its `EARLYSIGN_*`
//! environment variable, then the built-in default.

use std::path::PathBuf;

use clap::Args;
use ed25519_dalek::VerifyingKey;

use crate::adapters::model::{verifying_key_from_b64, ModelLoader};
use crate::domain::HistoryOrder;

pub const DEFAULT_DB_PATH: &str = "earlysign.db";
pub const DEFAULT_MODEL_PATH: &str = "models/screening_model.json";
pub const DEFAULT_CHART_DIR: &str = "static";

/// Error type for configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{key} must not be empty")]
    Empty { key: &'static str },

    #[error("A signed model is required but EARLYSIGN_MODEL_PUBKEY_B64 is not set")]
    MissingPublicKey,
}

/// Raw settings as parsed from flags and environment.
#[derive(Args, Debug, Clone)]
pub struct SettingsArgs {
    /// SQLite history database
    #[arg(long, global = true, env = "EARLYSIGN_DB_PATH", default_value = DEFAULT_DB_PATH)]
    pub db_path: PathBuf,

    /// Model artifact (JSON)
    #[arg(long, global = true, env = "EARLYSIGN_MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model_path: PathBuf,

    /// Directory for trend charts
    #[arg(long, global = true, env = "EARLYSIGN_CHART_DIR", default_value = DEFAULT_CHART_DIR)]
    pub chart_dir: PathBuf,

    /// History order: insertion or date
    #[arg(long, global = true, env = "EARLYSIGN_HISTORY_ORDER", default_value = "insertion")]
    pub history_order: String,

    /// Refuse model artifacts without a valid signed manifest
    #[arg(long, global = true, env = "EARLYSIGN_REQUIRE_SIGNED_MODEL")]
    pub require_signed_model: bool,

    /// Base64 Ed25519 key that verifies model manifests
    #[arg(long, global = true, env = "EARLYSIGN_MODEL_PUBKEY_B64", hide_env_values = true)]
    pub model_pubkey_b64: Option<String>,
}

/// Validated settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: PathBuf,
    pub model_path: PathBuf,
    pub chart_dir: PathBuf,
    pub history_order: HistoryOrder,
    pub require_signed_model: bool,
    pub model_public_key: Option<VerifyingKey>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            chart_dir: PathBuf::from(DEFAULT_CHART_DIR),
            history_order: HistoryOrder::default(),
            require_signed_model: false,
            model_public_key: None,
        }
    }
}

impl TryFrom<SettingsArgs> for Settings {
    type Error = ConfigError;

    fn try_from(args: SettingsArgs) -> Result<Self, Self::Error> {
        let non_empty = |key: &'static str, path: PathBuf| {
            if path.as_os_str().is_empty() {
                Err(ConfigError::Empty { key })
            } else {
                Ok(path)
            }
        };

        let history_order = args.history_order.parse::<HistoryOrder>().map_err(|e| {
            ConfigError::InvalidValue {
                key: "EARLYSIGN_HISTORY_ORDER",
                value: args.history_order.clone(),
                reason: e.to_string(),
            }
        })?;

        let model_public_key = match args.model_pubkey_b64.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(b64) => Some(verifying_key_from_b64(b64).map_err(|e| {
                ConfigError::InvalidValue {
                    key: "EARLYSIGN_MODEL_PUBKEY_B64",
                    value: b64.to_string(),
                    reason: e.to_string(),
                }
            })?),
        };

        if args.require_signed_model && model_public_key.is_none() {
            return Err(ConfigError::MissingPublicKey);
        }

        Ok(Self {
            db_path: non_empty("EARLYSIGN_DB_PATH", args.db_path)?,
            model_path: non_empty("EARLYSIGN_MODEL_PATH", args.model_path)?,
            chart_dir: non_empty("EARLYSIGN_CHART_DIR", args.chart_dir)?,
            history_order,
            require_signed_model: args.require_signed_model,
            model_public_key,
        })
    }
}

impl Settings {
    /// Model loader carrying the configured integrity policy.
    #[must_use]
    pub fn model_loader(&self) -> ModelLoader {
        let loader = ModelLoader::new().require_signature(self.require_signed_model);
        match self.model_public_key {
            Some(key) => loader.with_public_key(key),
            None => loader,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use ed25519_dalek::SigningKey;

    fn args() -> SettingsArgs {
        SettingsArgs {
            db_path: DEFAULT_DB_PATH.into(),
            model_path: DEFAULT_MODEL_PATH.into(),
            chart_dir: DEFAULT_CHART_DIR.into(),
            history_order: "insertion".into(),
            require_signed_model: false,
            model_pubkey_b64: None,
        }
    }

    fn pubkey_b64() -> String {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        base64::engine::general_purpose::STANDARD.encode(key.verifying_key().to_bytes())
    }

    #[test]
    fn test_defaults_resolve() {
        let settings = Settings::try_from(args()).expect("valid settings");
        assert_eq!(settings.db_path, PathBuf::from("earlysign.db"));
        assert_eq!(settings.history_order, HistoryOrder::Insertion);
        assert!(settings.model_public_key.is_none());
    }

    #[test]
    fn test_history_order_parsed() {
        let mut a = args();
        a.history_order = "date".into();
        let settings = Settings::try_from(a).expect("valid settings");
        assert_eq!(settings.history_order, HistoryOrder::Chronological);

        let mut a = args();
        a.history_order = "random".into();
        assert!(matches!(
            Settings::try_from(a),
            Err(ConfigError::InvalidValue {
                key: "EARLYSIGN_HISTORY_ORDER",
                ..
            })
        ));
    }

    #[test]
    fn test_public_key_validation() {
        let mut a = args();
        a.model_pubkey_b64 = Some("not base64!".into());
        assert!(matches!(
            Settings::try_from(a),
            Err(ConfigError::InvalidValue { .. })
        ));

        let mut a = args();
        a.model_pubkey_b64 = Some(pubkey_b64());
        a.require_signed_model = true;
        let settings = Settings::try_from(a).expect("valid settings");
        assert!(settings.model_public_key.is_some());
    }

    #[test]
    fn test_signed_model_requires_key() {
        let mut a = args();
        a.require_signed_model = true;
        assert!(matches!(
            Settings::try_from(a),
            Err(ConfigError::MissingPublicKey)
        ));
    }

    #[test]
    fn test_empty_path_rejected() {
        let mut a = args();
        a.db_path = PathBuf::new();
        assert!(matches!(
            Settings::try_from(a),
            Err(ConfigError::Empty { .. })
        ));
    }
}
