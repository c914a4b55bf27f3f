//! Process Configuration
//!
//! Loads the signing secret and tunables from the environment.
//! There is no built-in secret: if `API_SECRET_KEY` is unset or empty,
//! loading fails and nothing can be signed or verified.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::game::config::{OutcomeConfig, OutcomeConfigError};
use crate::session::service::{SessionConfig, MAX_SESSION_EXPIRY_SECS};

/// Environment variable holding the signing secret.
pub const SECRET_ENV: &str = "API_SECRET_KEY";

/// Environment variable overriding the session expiry, in seconds.
pub const EXPIRY_ENV: &str = "SESSION_EXPIRY_SECS";

/// Environment variable naming a JSON outcome config file.
pub const OUTCOME_CONFIG_ENV: &str = "OUTCOME_CONFIG";

/// Shared secret used for mixing and proof signatures.
///
/// `Debug` never prints the key material.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    /// Wrap a secret. Empty secrets are rejected.
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::MissingSecret(SECRET_ENV));
        }
        Ok(Self(secret.into_bytes()))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No signing secret was supplied.
    #[error("signing secret not configured: set {0}")]
    MissingSecret(&'static str),

    /// A variable is set but unusable.
    #[error("invalid value for {name}: {reason}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// What was wrong.
        reason: String,
    },

    /// Outcome config file could not be read.
    #[error("cannot read outcome config {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Outcome config is invalid.
    #[error(transparent)]
    Outcome(#[from] OutcomeConfigError),
}

/// Everything the fairness core needs from the process.
#[derive(Clone, Debug)]
pub struct FairnessConfig {
    /// Signing secret.
    pub signing_key: SigningKey,
    /// Session lifecycle settings.
    pub session: SessionConfig,
    /// Grid derivation settings.
    pub outcome: OutcomeConfig,
}

impl FairnessConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to resolve variable names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(SECRET_ENV).ok_or(ConfigError::MissingSecret(SECRET_ENV))?;
        let signing_key = SigningKey::new(secret)?;

        let mut session = SessionConfig::default();
        if let Some(raw) = lookup(EXPIRY_ENV) {
            let secs: i64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: EXPIRY_ENV,
                reason: format!("not an integer: {:?}", raw),
            })?;
            if secs <= 0 || secs > MAX_SESSION_EXPIRY_SECS {
                return Err(ConfigError::InvalidValue {
                    name: EXPIRY_ENV,
                    reason: format!("must be in 1..={}", MAX_SESSION_EXPIRY_SECS),
                });
            }
            session.expiry = chrono::Duration::try_seconds(secs).ok_or(ConfigError::InvalidValue {
                name: EXPIRY_ENV,
                reason: format!("out of range: {}", secs),
            })?;
        }

        let outcome = match lookup(OUTCOME_CONFIG_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                let json = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Io { path: path.clone(), source })?;
                OutcomeConfig::from_json(&json)?
            }
            None => OutcomeConfig::default(),
        };

        Ok(Self { signing_key, session, outcome })
    }
}
