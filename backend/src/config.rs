//! Configuration management for the booker ledger
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with LEDGER__ prefix

use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Current environment (development, production, test)
    pub environment: String,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Lock/busy retry policy
    pub retry: RetryConfig,

    /// Change notification configuration
    pub notifications: NotificationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub url: String,

    /// How long a statement waits on a locked database before failing
    pub busy_timeout_ms: u64,

    /// Connection attempts made by `Database::initialize`
    pub connect_attempts: u32,

    /// Fixed delay between connection attempts
    pub connect_retry_delay_ms: u64,

    /// Create the database file when it does not exist
    pub create_if_missing: bool,
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_millis(self.connect_retry_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay_ms: u64,

    /// Multiplier applied to the delay after every retry
    pub backoff_factor: f64,

    /// Upper bound for any single delay
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            backoff_factor: 2.0,
            max_delay_ms: 8000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Buffered changes per subscriber before the slowest one lags
    pub capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

impl LedgerConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("LEDGER_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("database.url", "sqlite://booker-ledger.db")?
            .set_default("database.busy_timeout_ms", 5000)?
            .set_default("database.connect_attempts", 3)?
            .set_default("database.connect_retry_delay_ms", 1000)?
            .set_default("database.create_if_missing", true)?
            .set_default("retry.max_attempts", 3)?
            .set_default("retry.initial_delay_ms", 1000)?
            .set_default("retry.backoff_factor", 2.0)?
            .set_default("retry.max_delay_ms", 8000)?
            .set_default("notifications.capacity", 64)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (LEDGER__ prefix)
            .add_source(
                Environment::with_prefix("LEDGER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Private in-memory database with short delays, for tests
    pub fn in_memory() -> Self {
        Self {
            environment: "test".to_string(),
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                busy_timeout_ms: 100,
                connect_attempts: 1,
                connect_retry_delay_ms: 10,
                create_if_missing: true,
            },
            retry: RetryConfig {
                max_attempts: 3,
                initial_delay_ms: 10,
                backoff_factor: 2.0,
                max_delay_ms: 100,
            },
            notifications: NotificationConfig::default(),
        }
    }

    /// File-backed database at `url` with test delays
    pub fn for_url(url: impl Into<String>) -> Self {
        let mut config = Self::in_memory();
        config.database.url = url.into();
        config
    }
}
