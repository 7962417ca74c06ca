//! Dashboard configuration
//!
//! Backend URL, token metadata, session storage, chain source, date policy,
//! export directory and logging. Read from a TOML file, then overridden by
//! `POR_*` environment variables.

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::chains::ChainSourceKind;
use crate::snapshot::{DateFormat, DatePolicy, MaxDate};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub metadata: MetadataConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub chains: ChainsConfig,

    #[serde(default)]
    pub dates: DatesConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub base_url: String,
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
        }
    }
}

/// Token metadata lookup configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "default_metadata_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_metadata_enabled")]
    pub enabled: bool,
}

fn default_metadata_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_metadata_enabled() -> bool {
    true
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            base_url: default_metadata_url(),
            api_key: String::new(),
            enabled: default_metadata_enabled(),
        }
    }
}

/// Where the bearer token and tutorial flag are kept
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_file")]
    pub file: PathBuf,
}

fn default_session_file() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("por-dashboard").join("session.toml"))
        .unwrap_or_else(|| PathBuf::from("./por_session.toml"))
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            file: default_session_file(),
        }
    }
}

/// Chain registry configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainsConfig {
    #[serde(default)]
    pub source: ChainSourceKind,
}

/// Historical query date policy
#[derive(Debug, Clone, Deserialize)]
pub struct DatesConfig {
    #[serde(default)]
    pub format: DateFormat,

    #[serde(default)]
    pub max_selectable: MaxDate,

    #[serde(default = "default_earliest")]
    pub earliest: NaiveDate,
}

fn default_earliest() -> NaiveDate {
    DatePolicy::default().earliest
}

impl Default for DatesConfig {
    fn default() -> Self {
        Self {
            format: DateFormat::default(),
            max_selectable: MaxDate::default(),
            earliest: default_earliest(),
        }
    }
}

impl DatesConfig {
    pub fn policy(&self) -> DatePolicy {
        DatePolicy {
            format: self.format,
            max_date: self.max_selectable,
            earliest: self.earliest,
        }
    }
}

/// CSV export configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("por-dashboard").join("config.toml")),
            Some(PathBuf::from("/etc/por-dashboard/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_first(&config_paths)
    }

    /// First of `paths` that exists and parses; files that fail are logged
    /// and skipped
    pub fn load_first(paths: &[PathBuf]) -> Self {
        for path_opt in paths {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("POR_API_URL") {
            self.api.base_url = url;
        }

        if let Ok(url) = std::env::var("POR_COINGECKO_URL") {
            self.metadata.base_url = url;
        }
        if let Ok(key) = std::env::var("POR_COINGECKO_API_KEY") {
            self.metadata.api_key = key;
        }

        if let Ok(file) = std::env::var("POR_SESSION_FILE") {
            self.session.file = PathBuf::from(file);
        }

        if let Ok(source) = std::env::var("POR_CHAIN_SOURCE") {
            match source.parse() {
                Ok(kind) => self.chains.source = kind,
                Err(e) => tracing::warn!("Ignoring POR_CHAIN_SOURCE: {}", e),
            }
        }

        if let Ok(format) = std::env::var("POR_DATE_FORMAT") {
            match format.parse() {
                Ok(f) => self.dates.format = f,
                Err(e) => tracing::warn!("Ignoring POR_DATE_FORMAT: {}", e),
            }
        }
        if let Ok(max) = std::env::var("POR_MAX_DATE") {
            match max.parse() {
                Ok(m) => self.dates.max_selectable = m,
                Err(e) => tracing::warn!("Ignoring POR_MAX_DATE: {}", e),
            }
        }

        if let Ok(level) = std::env::var("POR_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("POR_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# PoR Dashboard Configuration
#
# Environment variables override these settings:
# - POR_API_URL
# - POR_COINGECKO_URL
# - POR_COINGECKO_API_KEY
# - POR_SESSION_FILE
# - POR_CHAIN_SOURCE
# - POR_DATE_FORMAT
# - POR_MAX_DATE
# - POR_LOG_LEVEL
# - POR_LOG_FORMAT

[api]
# Reserve backend base URL
base_url = "http://localhost:8000"

[metadata]
# Token metadata service (CoinGecko compatible)
base_url = "https://api.coingecko.com/api/v3"

# Sent as x-cg-demo-api-key when non-empty
api_key = ""

# Disable to add tokens with empty name/symbol and 18 decimals
enabled = true

[session]
# Bearer token and tutorial flag
# file = "~/.local/share/por-dashboard/session.toml"

[chains]
# static: compiled-in chain table
# fetched: chains enabled by GET /chains, validated with the compiled table
source = "static"

[dates]
# iso (YYYY-MM-DD) or dotted (DD.MM.YYYY)
format = "iso"

# Latest selectable historical date: yesterday or today
max_selectable = "yesterday"

# Earliest selectable historical date
earliest = "2025-01-01"

[export]
# Directory for exported snapshot CSV files
output_dir = "."

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
