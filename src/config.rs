//! Client configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file,
//! then `HABITS_*` environment variables.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config file read from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "habits.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "HABITS_";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("config file not found: {0}")]
    NotFound(PathBuf),
}

/// Client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Backend base URL; `None` runs offline
    pub backend_url: Option<String>,
    /// Bearer token for backend calls
    pub auth_token: Option<String>,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// JSON enemy catalog that overrides the backend and built-in catalogs
    pub catalog_path: Option<PathBuf>,
    /// Round cap for unattended fights
    pub max_auto_rounds: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: None,
            auth_token: None,
            request_timeout_secs: 10,
            catalog_path: None,
            max_auto_rounds: 200,
        }
    }
}

impl Settings {
    /// Load settings.
    ///
    /// An explicit `path` must exist; otherwise `habits.toml` is read if present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) if !p.exists() => return Err(ConfigError::NotFound(p.to_path_buf())),
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        Self::from_figment(
            Figment::from(Serialized::defaults(Settings::default()))
                .merge(Toml::file(file))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    /// Extract settings from a prepared figment
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(|e| ConfigError::Figment(Box::new(e)))
    }

    /// Whether a backend is configured
    pub fn is_online(&self) -> bool {
        self.backend_url.as_deref().is_some_and(|u| !u.is_empty())
    }
}
