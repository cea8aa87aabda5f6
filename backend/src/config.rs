//! Configuration management for the restaurant inventory server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with RIM__ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Demo mode: serve seeded in-memory data instead of PostgreSQL
    pub demo: DemoConfig,

    /// Realtime alert delivery
    pub alerts: AlertsConfig,

    /// Log output
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    #[serde(default)]
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,

    /// Apply migrations on startup
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiration in seconds
    pub refresh_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DemoConfig {
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertsConfig {
    /// Alerts buffered per subscriber before slow listeners start missing events
    pub channel_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `pretty` or `json`
    pub format: String,

    /// Default filter when RUST_LOG is unset
    pub filter: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("RIM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.url", "")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.run_migrations", environment == "development")?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("jwt.refresh_token_expiry", 604800)?
            .set_default("demo.enabled", false)?
            .set_default("alerts.channel_capacity", 256)?
            .set_default("logging.format", "pretty")?
            .set_default(
                "logging.filter",
                "rim_server=debug,rim_backend=debug,tower_http=debug,sqlx=warn",
            )?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (RIM_ prefix)
            .add_source(
                Environment::with_prefix("RIM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject combinations that cannot start a server
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < 16 {
            return Err(ConfigError::Message(
                "jwt.secret must be at least 16 characters".to_string(),
            ));
        }
        if !self.demo.enabled && self.database.url.is_empty() {
            return Err(ConfigError::Message(
                "database.url is required unless demo mode is enabled".to_string(),
            ));
        }
        if self.alerts.channel_capacity == 0 {
            return Err(ConfigError::Message(
                "alerts.channel_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            environment: "test".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 5,
                min_connections: 1,
                acquire_timeout_secs: 5,
                run_migrations: false,
            },
            jwt: JwtConfig {
                secret: "0123456789abcdef0123".to_string(),
                access_token_expiry: 3600,
                refresh_token_expiry: 86400,
            },
            demo: DemoConfig { enabled: true },
            alerts: AlertsConfig {
                channel_capacity: 16,
            },
            logging: LoggingConfig {
                format: "pretty".to_string(),
                filter: "info".to_string(),
            },
        }
    }

    #[test]
    fn demo_mode_needs_no_database() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn database_required_outside_demo_mode() {
        let mut config = sample();
        config.demo.enabled = false;
        assert!(config.validate().is_err());
        config.database.url = "postgres://localhost/rim".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn short_jwt_secret_rejected() {
        let mut config = sample();
        config.jwt.secret = "short".to_string();
        assert!(config.validate().is_err());
    }
}
