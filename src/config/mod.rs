//! Configuration management
//!
//! This module provides YAML-based configuration management with support for:
//! - Environment variable overrides
//! - Multiple configuration file locations
//! - Default values for all settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub invites: InviteConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
    #[serde(default)]
    pub tenancy: TenancyConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed by CORS; empty means any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_token_expiry")]
    pub token_expiry_hours: u64,
    /// Argon2id memory cost in KiB
    #[serde(default = "default_hash_memory")]
    pub password_hash_memory_kib: u32,
    /// Argon2id iteration count
    #[serde(default = "default_hash_iterations")]
    pub password_hash_iterations: u32,
}

fn default_token_expiry() -> u64 {
    24
}

fn default_hash_memory() -> u32 {
    19 * 1024
}

fn default_hash_iterations() -> u32 {
    2
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Log output target (console or file)
    #[serde(default = "default_log_target")]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Log file name prefix
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    /// Enable daily log rotation
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
    /// Maximum number of log files to keep (0 = unlimited)
    #[serde(default = "default_max_log_files")]
    pub max_log_files: usize,
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to console (stdout/stderr) - default for development
    #[default]
    Console,
    /// Log to file with optional rotation - recommended for production
    File,
    /// Log to both console and file
    Both,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_log_target() -> LogTarget {
    LogTarget::Console
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/appzero")
}

fn default_log_prefix() -> String {
    "appzero-accounts".to_string()
}

fn default_log_rotation() -> bool {
    true
}

fn default_max_log_files() -> usize {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: default_log_target(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
            max_log_files: default_max_log_files(),
        }
    }
}

/// Invite issuance configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InviteConfig {
    /// Validity used when the requested number of days is missing or unusable
    #[serde(default = "default_days_valid")]
    pub default_days_valid: i64,
    /// Longest validity a caller may request; larger values fall back to the default
    #[serde(default = "default_max_days_valid")]
    pub max_days_valid: i64,
    /// Base URL embedded in invitation links
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Number of accepted invites shown in the history
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
}

fn default_days_valid() -> i64 {
    7
}

fn default_max_days_valid() -> i64 {
    365
}

fn default_public_base_url() -> String {
    "http://localhost:5080".to_string()
}

fn default_history_limit() -> u32 {
    20
}

impl Default for InviteConfig {
    fn default() -> Self {
        Self {
            default_days_valid: default_days_valid(),
            max_days_valid: default_max_days_valid(),
            public_base_url: default_public_base_url(),
            history_limit: default_history_limit(),
        }
    }
}

/// Registration wizard configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistrationConfig {
    /// Whether the terms of use must be accepted at the confirm step
    #[serde(default = "default_require_terms")]
    pub require_terms: bool,
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    #[serde(default = "default_locale")]
    pub default_locale: String,
    #[serde(default = "default_country")]
    pub default_country: String,
    #[serde(default = "default_plan")]
    pub default_plan: String,
    /// Minutes an idle wizard draft is kept
    #[serde(default = "default_draft_ttl")]
    pub draft_ttl_minutes: u64,
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
}

fn default_require_terms() -> bool {
    true
}

fn default_timezone() -> String {
    "America/Sao_Paulo".to_string()
}

fn default_locale() -> String {
    "pt-BR".to_string()
}

fn default_country() -> String {
    "BR".to_string()
}

fn default_plan() -> String {
    "free".to_string()
}

fn default_draft_ttl() -> u64 {
    30
}

fn default_session_cookie() -> String {
    "reg_session".to_string()
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            require_terms: default_require_terms(),
            default_timezone: default_timezone(),
            default_locale: default_locale(),
            default_country: default_country(),
            default_plan: default_plan(),
            draft_ttl_minutes: default_draft_ttl(),
            session_cookie: default_session_cookie(),
        }
    }
}

/// Tenant resolution configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TenancyConfig {
    /// Header carrying the organization id of the active tenant
    #[serde(default = "default_tenant_header")]
    pub header: String,
}

fn default_tenant_header() -> String {
    "X-Tenant".to_string()
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            header: default_tenant_header(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                cors_origins: Vec::new(),
            },
            auth: AuthConfig {
                jwt_secret: "change-me-in-production-minimum-32-characters-long".to_string(),
                token_expiry_hours: default_token_expiry(),
                password_hash_memory_kib: default_hash_memory(),
                password_hash_iterations: default_hash_iterations(),
            },
            database: DatabaseConfig {
                url: "sqlite://./data/appzero.db".to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            logging: LoggingConfig::default(),
            invites: InviteConfig::default(),
            registration: RegistrationConfig::default(),
            tenancy: TenancyConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values
    /// 2. Configuration file (YAML)
    /// 3. Environment variables (prefixed with APPZERO_)
    pub fn load() -> Result<Self> {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let config_path = std::env::var("APPZERO_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);

        let mut config = match config_path {
            Some(ref path) if path.exists() => {
                eprintln!("[CONFIG] Loading configuration from: {:?}", path);
                Self::from_file(path)?
            }
            Some(ref path) => {
                eprintln!("[CONFIG] Config file not found: {:?}", path);
                AppConfig::default()
            }
            None => {
                eprintln!("[CONFIG] No config file found, using defaults");
                AppConfig::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parse a YAML configuration file without applying overrides
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_norway::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            PathBuf::from("/etc/appzero/config.yaml"),
            dirs::config_dir()
                .map(|p| p.join("appzero/config.yaml"))
                .unwrap_or_default(),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Server overrides
        if let Ok(host) = std::env::var("APPZERO_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("APPZERO_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }

        // Logging overrides
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("APPZERO_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Pretty,
            };
        }
        if let Ok(target) = std::env::var("APPZERO_LOG_TARGET") {
            self.logging.target = match target.to_lowercase().as_str() {
                "file" => LogTarget::File,
                "both" => LogTarget::Both,
                _ => LogTarget::Console,
            };
        }
        if let Ok(dir) = std::env::var("APPZERO_LOG_DIR") {
            self.logging.log_dir = PathBuf::from(dir);
        }

        // Membership flow overrides
        if let Ok(days) = std::env::var("APPZERO_INVITE_MAX_DAYS") {
            if let Ok(days) = days.parse() {
                self.invites.max_days_valid = days;
            }
        }
        if let Ok(url) = std::env::var("APPZERO_PUBLIC_BASE_URL") {
            self.invites.public_base_url = url;
        }
        if let Ok(header) = std::env::var("APPZERO_TENANT_HEADER") {
            self.tenancy.header = header;
        }
        if let Ok(require) = std::env::var("APPZERO_REQUIRE_TERMS") {
            self.registration.require_terms =
                matches!(require.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < 32 {
            anyhow::bail!("JWT secret must be at least 32 characters long");
        }

        if self.auth.password_hash_memory_kib < 8 || self.auth.password_hash_iterations == 0 {
            anyhow::bail!("Password hashing cost is too low");
        }

        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.invites.default_days_valid <= 0 {
            anyhow::bail!("Invite default_days_valid must be positive");
        }
        if self.invites.max_days_valid < self.invites.default_days_valid {
            anyhow::bail!("Invite max_days_valid must not be below default_days_valid");
        }

        let base = &self.invites.public_base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            anyhow::bail!("Invite public_base_url must be an http(s) URL: {}", base);
        }

        if self.tenancy.header.trim().is_empty() {
            anyhow::bail!("Tenant header name cannot be empty");
        }

        Ok(())
    }

    /// Create a default configuration file
    pub fn create_default_config(path: &PathBuf) -> Result<()> {
        let config = AppConfig::default();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_norway::to_string(&config)?;
        std::fs::write(path, yaml)?;

        Ok(())
    }
}
