//! Configuration
//!
//! Endpoints, storage location and logging settings, stored as a JSON
//! file next to the app data. A missing file means defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const PRODUCTION_ROOT: &str = "https://fwl.0b101010.site/api/v1";
const DEVELOPMENT_ROOT: &str = "http://localhost:3001/api/v1";

/// Remote API endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub root: String,
    pub auth_url: String,
    pub refresh_url: String,
    pub logout_url: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl ApiConfig {
    /// Endpoints derived from one API root
    pub fn with_root(root: &str) -> Self {
        let root = root.trim_end_matches('/');
        Self {
            root: root.to_string(),
            auth_url: format!("{}/auth", root),
            refresh_url: format!("{}/refresh", root),
            logout_url: format!("{}/logout", root),
            request_timeout_secs: default_timeout_secs(),
        }
    }

    pub fn development() -> Self {
        Self::with_root(DEVELOPMENT_ROOT)
    }

    pub fn production() -> Self {
        Self::with_root(PRODUCTION_ROOT)
    }

    /// Read/write endpoint for the list snapshot
    pub fn lists_url(&self) -> String {
        format!("{}/json/lists", self.root.trim_end_matches('/'))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::production()
    }
}

/// Where local snapshots live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub max_bytes: u64,
    pub buffer_lines: usize,
    /// `trace`, `debug`, `info`, `warn` or `error`
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            max_bytes: 1024 * 1024,
            buffer_lines: 200,
            level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Settings for the rolling logger. Unknown levels fall back to INFO.
    pub fn logger_config(&self) -> rolling_logger::LoggerConfig {
        rolling_logger::LoggerConfig {
            max_bytes: self.max_bytes,
            buffer_lines: self.buffer_lines,
            max_level: self.level.parse().unwrap_or(tracing::Level::INFO),
            ..rolling_logger::LoggerConfig::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// Defaults pointing at a local API server
    pub fn development() -> Self {
        Self {
            api: ApiConfig::development(),
            ..Self::default()
        }
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
