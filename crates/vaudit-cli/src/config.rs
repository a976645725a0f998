//! CLI configuration.
//!
//! Loads defaults from `~/.vaudit/config.toml`, then applies environment
//! overrides (`VAUDIT_CATALOG`, `VAUDIT_FQDN`). Command-line flags take
//! precedence over both.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Defaults for options the user does not pass on every invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog snapshot to audit against when `--catalog` is not given.
    pub catalog: Option<PathBuf>,
    /// Server FQDN when `--fqdn` is not given.
    pub fqdn: Option<String>,
    /// Default output format: `human` or `csv`.
    pub format: Option<String>,
}

impl Config {
    /// Load config from the standard location, then the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(path) = Self::config_path() {
            if path.exists() {
                debug!("loading config from {:?}", path);
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            }
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Config path: `~/.vaudit/config.toml`
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".vaudit/config.toml"))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("VAUDIT_CATALOG") {
            self.catalog = Some(PathBuf::from(path));
        }
        if let Ok(fqdn) = std::env::var("VAUDIT_FQDN") {
            self.fqdn = Some(fqdn);
        }
    }
}
