//! Configuration management
//!
//! Configuration is read from `config.yml` and then overridden by environment
//! variables. Missing values fall back to defaults, so an absent or empty file
//! still yields a runnable site.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub revalidation: RevalidationConfig,
    #[serde(default)]
    pub newsletter: NewsletterConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub driver: DatabaseDriver,
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/comic.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    #[default]
    Sqlite,
    Mysql,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub driver: CacheDriver,
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Upper bound for entry lifetime in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            driver: CacheDriver::default(),
            redis_url: None,
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_ttl() -> u64 {
    3600
}

/// Cache driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheDriver {
    #[default]
    Memory,
    Redis,
}

/// Public site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Absolute base URL the site is reachable at, without trailing slash
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Title used until the site settings global is edited
    #[serde(default = "default_site_title")]
    pub default_title: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            default_title: default_site_title(),
        }
    }
}

fn default_server_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_site_title() -> String {
    "Hell Versus You".to_string()
}

/// Cache revalidation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevalidationConfig {
    /// Shared secret expected in the `x-revalidate-secret` header
    #[serde(default)]
    pub secret: Option<String>,
    /// Additional base URLs that receive the revalidation call
    #[serde(default)]
    pub peers: Vec<String>,
    #[serde(default = "default_revalidation_timeout")]
    pub timeout_seconds: u64,
}

impl Default for RevalidationConfig {
    fn default() -> Self {
        Self {
            secret: None,
            peers: Vec::new(),
            timeout_seconds: default_revalidation_timeout(),
        }
    }
}

fn default_revalidation_timeout() -> u64 {
    10
}

/// Outgoing email provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MailProvider {
    #[default]
    Resend,
    Smtp,
    /// Logs messages instead of sending them
    Log,
}

/// Newsletter delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsletterConfig {
    #[serde(default)]
    pub provider: MailProvider,
    #[serde(default)]
    pub resend_api_key: Option<String>,
    #[serde(default)]
    pub from_email: Option<String>,
    #[serde(default = "default_resend_endpoint")]
    pub resend_endpoint: String,
    #[serde(default = "default_subscriber_page_size")]
    pub subscriber_page_size: i64,
    #[serde(default)]
    pub smtp: SmtpConfig,
}

impl Default for NewsletterConfig {
    fn default() -> Self {
        Self {
            provider: MailProvider::default(),
            resend_api_key: None,
            from_email: None,
            resend_endpoint: default_resend_endpoint(),
            subscriber_page_size: default_subscriber_page_size(),
            smtp: SmtpConfig::default(),
        }
    }
}

fn default_resend_endpoint() -> String {
    "https://api.resend.com/emails".to_string()
}

fn default_subscriber_page_size() -> i64 {
    100
}

/// SMTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_true")]
    pub use_tls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            use_tls: true,
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

/// Media delivery configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Cloudinary cloud name; transformed delivery URLs are disabled when unset
    #[serde(default)]
    pub cloudinary_cloud_name: Option<String>,
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Maximum file size in bytes (default: 10MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
        "image/svg+xml".to_string(),
        "image/x-icon".to_string(),
    ]
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }

    /// File extension for a MIME type
    pub fn get_extension(&self, mime_type: &str) -> &'static str {
        match mime_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            "image/x-icon" => "ico",
            _ => "bin",
        }
    }
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
    /// A missing or empty file yields the default configuration. Invalid YAML
    /// is reported with its line and column.
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

        Ok(config)
    }

    /// Load configuration from file, then apply environment overrides and validate
    ///
    /// Recognised variables:
    /// - `COMIC_SERVER_HOST`, `COMIC_SERVER_PORT`, `COMIC_SERVER_CORS_ORIGIN`
    /// - `COMIC_DATABASE_DRIVER`, `COMIC_DATABASE_URL`
    /// - `COMIC_CACHE_DRIVER`, `COMIC_CACHE_REDIS_URL`, `COMIC_CACHE_TTL_SECONDS`
    /// - `COMIC_UPLOAD_PATH`
    /// - `NEXT_PUBLIC_SERVER_URL`, `PAYLOAD_SECRET`, `RESEND_API_KEY`,
    ///   `RESEND_FROM_EMAIL`, `CLOUDINARY_CLOUD_NAME`
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the site cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site.server_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "site.server_url must not be empty".to_string(),
            ));
        }
        if self.upload.max_file_size == 0 {
            return Err(ConfigError::ValidationError(
                "upload.max_file_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("COMIC_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("COMIC_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("COMIC_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("COMIC_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {}
            }
        }
        if let Ok(url) = std::env::var("COMIC_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(driver) = std::env::var("COMIC_CACHE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "memory" => self.cache.driver = CacheDriver::Memory,
                "redis" => self.cache.driver = CacheDriver::Redis,
                _ => {}
            }
        }
        if let Ok(redis_url) = std::env::var("COMIC_CACHE_REDIS_URL") {
            self.cache.redis_url = Some(redis_url);
        }
        if let Ok(ttl) = std::env::var("COMIC_CACHE_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.cache.ttl_seconds = ttl;
            }
        }

        if let Ok(path) = std::env::var("COMIC_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }

        // Names used by existing deployments of the site
        if let Some(url) = non_empty_env("NEXT_PUBLIC_SERVER_URL") {
            self.site.server_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secret) = non_empty_env("PAYLOAD_SECRET") {
            self.revalidation.secret = Some(secret);
        }
        if let Some(key) = non_empty_env("RESEND_API_KEY") {
            self.newsletter.resend_api_key = Some(key);
        }
        if let Some(from) = non_empty_env("RESEND_FROM_EMAIL") {
            self.newsletter.from_email = Some(from);
        }
        if let Some(cloud) = non_empty_env("CLOUDINARY_CLOUD_NAME") {
            self.media.cloudinary_cloud_name = Some(cloud);
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
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

// Shared by every test that touches process environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
