//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `SEARCHBRIDGE_*` environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How the search URL is derived from a query target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStyle {
    /// `{database}/{table}/_search`
    #[default]
    Typed,
    /// `{table}/_search`
    Index,
}

impl PathStyle {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "typed" => Some(Self::Typed),
            "index" => Some(Self::Index),
            _ => None,
        }
    }
}

/// Search backend connection
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,

    #[serde(default)]
    pub path_style: PathStyle,

    #[serde(default = "default_backend_timeout")]
    pub request_timeout_ms: u64,

    /// Basic auth user, if the backend requires one
    pub username: Option<String>,

    pub password: Option<String>,
}

fn default_backend_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_backend_timeout() -> u64 {
    30_000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            path_style: PathStyle::default(),
            request_timeout_ms: default_backend_timeout(),
            username: None,
            password: None,
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_request_timeout() -> u64 {
    60
}

impl ApiConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            request_timeout_secs: default_request_timeout(),
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
    "info".to_string()
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

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
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
        let config_paths = [
            dirs::config_dir().map(|p| p.join("searchbridge").join("config.toml")),
            Some(PathBuf::from("/etc/searchbridge/config.toml")),
            Some(PathBuf::from("./searchbridge.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Backend overrides
        if let Some(url) = var("SEARCHBRIDGE_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Some(style) = var("SEARCHBRIDGE_BACKEND_PATH_STYLE") {
            match PathStyle::from_str(&style) {
                Some(style) => self.backend.path_style = style,
                None => tracing::warn!("Ignoring unknown path style {:?}", style),
            }
        }
        if let Some(timeout) = var("SEARCHBRIDGE_BACKEND_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.backend.request_timeout_ms = ms;
            }
        }
        if let Some(username) = var("SEARCHBRIDGE_BACKEND_USERNAME") {
            self.backend.username = Some(username);
        }
        if let Some(password) = var("SEARCHBRIDGE_BACKEND_PASSWORD") {
            self.backend.password = Some(password);
        }

        // API overrides
        if let Some(host) = var("SEARCHBRIDGE_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("SEARCHBRIDGE_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        // Logging overrides
        if let Some(level) = var("SEARCHBRIDGE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("SEARCHBRIDGE_LOG_FORMAT") {
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
    r#"# searchbridge configuration
#
# Environment variables override these settings:
# - SEARCHBRIDGE_BACKEND_URL
# - SEARCHBRIDGE_BACKEND_PATH_STYLE
# - SEARCHBRIDGE_BACKEND_TIMEOUT_MS
# - SEARCHBRIDGE_BACKEND_USERNAME
# - SEARCHBRIDGE_BACKEND_PASSWORD
# - SEARCHBRIDGE_API_HOST
# - SEARCHBRIDGE_API_PORT
# - SEARCHBRIDGE_LOG_LEVEL
# - SEARCHBRIDGE_LOG_FORMAT

[backend]
# Search backend base URL
url = "http://localhost:9200"

# Search path layout: "typed" ({database}/{table}/_search)
# or "index" ({table}/_search)
path_style = "typed"

# Per-request timeout (ms)
request_timeout_ms = 30000

# Optional basic auth credentials
# username = "elastic"
# password = ""

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8090

# Allowed CORS origins (empty allows any)
cors_origins = []

# Request timeout in seconds
request_timeout_secs = 60

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
