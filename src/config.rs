use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, error};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Database URL for the analytics API
    pub db_url: Option<String>,

    /// How long a delivered message id is remembered
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: u64,

    #[serde(default = "default_dedup_max_entries")]
    pub dedup_max_entries: u64,

    /// Upper bound for one send to one client
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,

    /// Frames buffered per connection before sends start waiting
    #[serde(default = "default_connection_buffer")]
    pub connection_buffer: usize,

    #[serde(default = "default_messages_table")]
    pub messages_table: String,

    #[serde(default = "default_participation_table")]
    pub participation_table: String,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                config.validate()?;
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.dedup_window_secs == 0 {
            return Err(ConfigError::Invalid("DEDUP_WINDOW_SECS must be greater than 0".to_string()));
        }
        if self.send_timeout_ms == 0 {
            return Err(ConfigError::Invalid("SEND_TIMEOUT_MS must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_secs(self.dedup_window_secs)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Parsed CORS origins; empty means any origin is allowed
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            db_url: None,
            dedup_window_secs: default_dedup_window_secs(),
            dedup_max_entries: default_dedup_max_entries(),
            send_timeout_ms: default_send_timeout_ms(),
            connection_buffer: default_connection_buffer(),
            messages_table: default_messages_table(),
            participation_table: default_participation_table(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(#[from] envy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_dedup_window_secs() -> u64 {
    300
}

fn default_dedup_max_entries() -> u64 {
    100_000
}

fn default_send_timeout_ms() -> u64 {
    2_000
}

fn default_connection_buffer() -> usize {
    64
}

fn default_messages_table() -> String {
    "chatflow_messages".to_string()
}

fn default_participation_table() -> String {
    "chatflow_room_participation".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_values_override_defaults() {
        let vars = vec![
            ("PORT".to_string(), "9000".to_string()),
            ("DEDUP_WINDOW_SECS".to_string(), "30".to_string()),
            ("CORS_ORIGINS".to_string(), "http://a.test, http://b.test".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.dedup_window(), Duration::from_secs(30));
        assert_eq!(config.send_timeout(), Duration::from_millis(2_000));
        assert_eq!(config.cors_origin_list(), vec!["http://a.test", "http://b.test"]);
        assert!(config.db_url.is_none());
    }

    #[test]
    fn zero_window_is_rejected() {
        let config = Config { dedup_window_secs: 0, ..Config::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert!(Config::default().validate().is_ok());
    }
}
