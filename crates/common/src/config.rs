//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Upload storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Outgoing mail configuration. Mail is disabled when absent.
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign bearer tokens.
    pub jwt_secret: String,
    /// Bearer token lifetime in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: i64,
    /// Password reset token lifetime in seconds.
    #[serde(default = "default_reset_ttl")]
    pub reset_token_ttl_secs: i64,
}

/// Upload storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory uploads are written to.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    /// Public base URL files are served from. Falls back to `{server.url}/uploads`.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Maximum accepted upload size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: i64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            base_url: None,
            max_file_size: default_max_file_size(),
        }
    }
}

/// SMTP configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host.
    pub smtp_host: String,
    /// SMTP port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    #[serde(default)]
    pub username: Option<String>,
    /// SMTP password.
    #[serde(default)]
    pub password: Option<String>,
    /// Sender address, e.g. `StudyHub <no-reply@example.com>`.
    pub from_address: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_token_ttl() -> i64 {
    7 * 24 * 60 * 60
}

const fn default_reset_ttl() -> i64 {
    60 * 60
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

const fn default_max_file_size() -> i64 {
    10 * 1024 * 1024
}

const fn default_smtp_port() -> u16 {
    587
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `STUDYHUB_ENV`)
    /// 3. Environment variables with `STUDYHUB__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("STUDYHUB_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("STUDYHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("STUDYHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Public base URL for uploaded files.
    #[must_use]
    pub fn files_base_url(&self) -> String {
        self.storage.base_url.clone().unwrap_or_else(|| {
            format!("{}/uploads", self.server.url.trim_end_matches('/'))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Config {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let config = parse(
            r#"
            [server]
            url = "https://study.example.com/"
            [database]
            url = "postgres://localhost/studyhub"
            [auth]
            jwt_secret = "secret"
            "#,
        );

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.auth.reset_token_ttl_secs, 3600);
        assert_eq!(config.storage.upload_dir, "uploads");
        assert!(config.email.is_none());
        assert_eq!(
            config.files_base_url(),
            "https://study.example.com/uploads"
        );
    }

    #[test]
    fn test_email_section() {
        let config = parse(
            r#"
            [server]
            url = "http://localhost:3000"
            [database]
            url = "postgres://localhost/studyhub"
            [auth]
            jwt_secret = "secret"
            [storage]
            base_url = "https://cdn.example.com"
            [email]
            smtp_host = "smtp.example.com"
            from_address = "no-reply@example.com"
            "#,
        );

        let email = config.email.as_ref().unwrap();
        assert_eq!(email.smtp_port, 587);
        assert_eq!(config.files_base_url(), "https://cdn.example.com");
    }
}
