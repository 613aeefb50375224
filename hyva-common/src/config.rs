//! Configuration loading for the HYVA client
//!
//! Base URL resolution follows a 4-tier priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`HYVA_BASE_URL`)
//! 3. TOML config file
//! 4. Compiled default (fallback)

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8765";
pub const BASE_URL_ENV_VAR: &str = "HYVA_BASE_URL";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_STALL_TIMEOUT_SECS: u64 = 45;

/// Client configuration, loadable from a TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the validation service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// TCP connect timeout for opening the stream
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle-stall timeout: if the stream emits nothing for this long
    /// without a terminal event, the session treats it as a transport
    /// failure and falls back to a locally simulated result.
    #[serde(default = "default_stall_timeout")]
    pub stall_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_stall_timeout() -> u64 {
    DEFAULT_STALL_TIMEOUT_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout(),
            stall_timeout_secs: default_stall_timeout(),
        }
    }
}

impl ClientConfig {
    /// Load configuration with the 4-tier priority order.
    ///
    /// # Arguments
    /// * `cli_base_url` - `--base-url` flag value, if given
    /// * `config_path` - explicit `--config` path; an unreadable explicit
    ///   path is an error, while a missing default-location file is not
    pub fn load(cli_base_url: Option<&str>, config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::from_file(path)?
            }
            None => match default_config_path() {
                Some(path) if path.exists() => {
                    tracing::debug!("Loading config from {}", path.display());
                    Self::from_file(&path)?
                }
                _ => Self::default(),
            },
        };

        // Priority 2: environment variable overrides the file
        if let Ok(url) = std::env::var(BASE_URL_ENV_VAR) {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }

        // Priority 1: command-line argument overrides everything
        if let Some(url) = cli_base_url {
            config.base_url = url.to_string();
        }

        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }
}

/// Default configuration file location: `<config_dir>/hyva/config.toml`
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hyva").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.stall_timeout_secs, 45);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ClientConfig =
            toml::from_str(r#"base_url = "http://validator.local:9000""#).unwrap();
        assert_eq!(config.base_url, "http://validator.local:9000");
        assert_eq!(config.stall_timeout_secs, 45);
    }

    #[test]
    fn test_cli_flag_wins() {
        let config =
            ClientConfig::load(Some("http://flag.example:1"), None).unwrap();
        assert_eq!(config.base_url, "http://flag.example:1");
    }
}
