//! Configuration management
//!
//! Configuration is loaded from `config.yml` and can be overridden with
//! `FOODGRAM_*` environment variables. Missing values fall back to defaults,
//! so an absent or empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Media storage configuration
    #[serde(default)]
    pub media: MediaConfig,
    /// Pagination defaults
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Optional staff account created on startup
    #[serde(default)]
    pub admin: Option<AdminAccountConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Public base URL used to build absolute media links
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            public_url: default_public_url(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_public_url() -> String {
    "http://localhost:8000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database URL or file path
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "data/foodgram.db".to_string()
}

fn default_max_connections() -> u32 {
    20
}

/// Media storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory uploaded images are written to
    #[serde(default = "default_media_root")]
    pub root: PathBuf,
    /// URL prefix the media directory is served under
    #[serde(default = "default_media_url")]
    pub url: String,
    /// Maximum decoded image size in bytes (default: 10MB)
    #[serde(default = "default_max_image_size")]
    pub max_image_size: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_media_root(),
            url: default_media_url(),
            max_image_size: default_max_image_size(),
        }
    }
}

fn default_media_root() -> PathBuf {
    PathBuf::from("media")
}

fn default_media_url() -> String {
    "/media".to_string()
}

fn default_max_image_size() -> u64 {
    10 * 1024 * 1024
}

/// Pagination defaults for list endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size used when the request has no `limit`
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Upper bound for a requested `limit`
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    6
}

fn default_max_page_size() -> u32 {
    100
}

/// Staff account bootstrapped at startup when it doesn't exist yet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminAccountConfig {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_admin_name")]
    pub first_name: String,
    #[serde(default = "default_admin_name")]
    pub last_name: String,
}

fn default_admin_name() -> String {
    "Admin".to_string()
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - FOODGRAM_SERVER_HOST
    /// - FOODGRAM_SERVER_PORT
    /// - FOODGRAM_SERVER_CORS_ORIGIN
    /// - FOODGRAM_SERVER_PUBLIC_URL
    /// - FOODGRAM_DATABASE_URL
    /// - FOODGRAM_MEDIA_ROOT
    /// - FOODGRAM_MEDIA_URL
    /// - FOODGRAM_ADMIN_USERNAME / _EMAIL / _PASSWORD
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("FOODGRAM_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("FOODGRAM_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("FOODGRAM_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }
        if let Ok(public_url) = std::env::var("FOODGRAM_SERVER_PUBLIC_URL") {
            self.server.public_url = public_url;
        }

        if let Ok(url) = std::env::var("FOODGRAM_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(root) = std::env::var("FOODGRAM_MEDIA_ROOT") {
            self.media.root = PathBuf::from(root);
        }
        if let Ok(url) = std::env::var("FOODGRAM_MEDIA_URL") {
            self.media.url = url;
        }

        // The admin account is only taken from the environment when all three are set
        if let (Ok(username), Ok(email), Ok(password)) = (
            std::env::var("FOODGRAM_ADMIN_USERNAME"),
            std::env::var("FOODGRAM_ADMIN_EMAIL"),
            std::env::var("FOODGRAM_ADMIN_PASSWORD"),
        ) {
            self.admin = Some(AdminAccountConfig {
                username,
                email,
                password,
                first_name: default_admin_name(),
                last_name: default_admin_name(),
            });
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pagination.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "pagination.page_size must be at least 1".to_string(),
            ));
        }
        if self.pagination.max_page_size < self.pagination.page_size {
            return Err(ConfigError::ValidationError(
                "pagination.max_page_size must not be below page_size".to_string(),
            ));
        }
        if !self.media.url.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "media.url must start with '/': {}",
                self.media.url
            )));
        }
        Ok(())
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
