//! Configuration loading
//!
//! Every setting resolves in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or malformed TOML file never prevents startup; it is logged and
//! the remaining sources are used.

use crate::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Compiled default for the blind-test API
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
/// Compiled default listen address for hbt-ui
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5730";

pub const API_URL_ENV: &str = "HBT_API_URL";
pub const BIND_ADDR_ENV: &str = "HBT_BIND_ADDR";
pub const CONFIG_PATH_ENV: &str = "HBT_CONFIG";

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the recommendation/storage API
    pub api_base_url: Option<String>,
    /// Listen address, e.g. "0.0.0.0:5730"
    pub bind_addr: Option<String>,
}

/// Resolved hbt-ui configuration
#[derive(Debug, Clone, PartialEq)]
pub struct UiConfig {
    /// API base URL without trailing slash
    pub api_base_url: String,
    pub bind_addr: SocketAddr,
}

/// Resolves [`UiConfig`] from CLI, environment, TOML and defaults
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_api_url: Option<String>,
    cli_bind_addr: Option<String>,
    config_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_url(mut self, api_url: Option<String>) -> Self {
        self.cli_api_url = api_url;
        self
    }

    pub fn with_bind_addr(mut self, bind_addr: Option<String>) -> Self {
        self.cli_bind_addr = bind_addr;
        self
    }

    /// Use this TOML file instead of the platform location
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn resolve(&self) -> Result<UiConfig> {
        let toml_config = self.load_toml();

        let api_base_url = pick(
            self.cli_api_url.as_deref(),
            API_URL_ENV,
            toml_config.api_base_url.as_deref(),
            DEFAULT_API_BASE_URL,
        );
        let bind_addr = pick(
            self.cli_bind_addr.as_deref(),
            BIND_ADDR_ENV,
            toml_config.bind_addr.as_deref(),
            DEFAULT_BIND_ADDR,
        );

        Ok(UiConfig {
            api_base_url: normalize_api_url(&api_base_url)?,
            bind_addr: bind_addr
                .parse()
                .map_err(|e| Error::Config(format!("Invalid bind address '{}': {}", bind_addr, e)))?,
        })
    }

    fn config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            return Some(path.clone());
        }
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|d| d.join("hbt").join("config.toml"))
    }

    fn load_toml(&self) -> TomlConfig {
        let Some(path) = self.config_file() else {
            debug!("No config directory on this platform");
            return TomlConfig::default();
        };

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return TomlConfig::default();
        }

        match load_toml_config(&path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                TomlConfig::default()
            }
        }
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
}

fn pick(cli: Option<&str>, env_var: &str, file: Option<&str>, default: &str) -> String {
    if let Some(value) = cli {
        return value.to_string();
    }
    if let Ok(value) = std::env::var(env_var) {
        if !value.is_empty() {
            return value;
        }
    }
    if let Some(value) = file {
        return value.to_string();
    }
    default.to_string()
}

fn normalize_api_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::Config(format!(
            "API URL must start with http:// or https://: '{}'",
            url
        )));
    }
    Ok(trimmed.to_string())
}
