//! Configuration
//!
//! Layers, lowest priority first: built-in defaults, an optional
//! `config.toml`, `APP__SECTION__KEY` environment variables, and finally the
//! plain `DATABASE_URL` / `PORT` variables.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub feed: FeedConfig,
    pub mail: MailConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Whole-request timeout for a feed download
    pub timeout_secs: u64,
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub from: String,
    /// Swallow delivery failures instead of reporting them to the caller
    pub fail_silently: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub level: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8083)?
            .set_default("database.url", "")?
            .set_default("database.max_connections", 10)?
            .set_default("feed.timeout_secs", 30)?
            .set_default("feed.max_bytes", 10 * 1024 * 1024)?
            .set_default("mail.from", "noreply@localhost")?
            .set_default("mail.fail_silently", true)?
            .set_default("log.level", "info")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
