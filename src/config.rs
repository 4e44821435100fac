//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to deserialize environment variables into a type-safe struct.

use std::time::Duration;

use serde::Deserialize;

/// Where balances and transactions are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `STORAGE_BACKEND` (optional): `postgres` (default) or `memory`
/// - `DATABASE_URL` (required for postgres): PostgreSQL connection string
/// - `DB_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `SERVER_HOST` / `SERVER_PORT` (optional): bind address, defaults to 0.0.0.0:3000
/// - `OPERATION_TIMEOUT_MS` (optional): per-operation deadline, defaults to 2000
/// - `SHUTDOWN_TIMEOUT_SECS` (optional): graceful shutdown grace period, defaults to 3
/// - `NATIVE_CURRENCY` (optional): currency every balance is kept in, defaults to RUB
/// - `RATES_URL` / `RATES_ACCESS_KEY` / `RATES_TIMEOUT_MS` (optional): exchange rate feed
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_storage_backend")]
    pub storage_backend: StorageBackend,

    pub database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_host")]
    pub server_host: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    #[serde(default = "default_native_currency")]
    pub native_currency: String,

    #[serde(default = "default_rates_url")]
    pub rates_url: String,

    pub rates_access_key: Option<String>,

    #[serde(default = "default_rates_timeout_ms")]
    pub rates_timeout_ms: u64,
}

/// Invalid combination of configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("DATABASE_URL is required when STORAGE_BACKEND=postgres")]
    MissingDatabaseUrl,

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("NATIVE_CURRENCY must be a 3-letter code, got {0:?}")]
    InvalidCurrency(String),
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Postgres
}

fn default_max_connections() -> u32 {
    5
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_operation_timeout_ms() -> u64 {
    2000
}

fn default_shutdown_timeout_secs() -> u64 {
    3
}

fn default_native_currency() -> String {
    "RUB".to_string()
}

fn default_rates_url() -> String {
    "http://api.exchangeratesapi.io/v1/latest".to_string()
}

fn default_rates_timeout_ms() -> u64 {
    2000
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Environment variable values cannot be parsed into expected types
    /// - The values fail [`Config::validate`]
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are converted automatically: database_url -> DATABASE_URL
        Self::from_vars(std::env::vars())
    }

    /// Build configuration from explicit key/value pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_backend == StorageBackend::Postgres && self.database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::ZeroValue("DB_MAX_CONNECTIONS"));
        }
        if self.operation_timeout_ms == 0 {
            return Err(ConfigError::ZeroValue("OPERATION_TIMEOUT_MS"));
        }
        if self.rates_timeout_ms == 0 {
            return Err(ConfigError::ZeroValue("RATES_TIMEOUT_MS"));
        }
        let currency = &self.native_currency;
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::InvalidCurrency(currency.clone()));
        }
        Ok(())
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn rates_timeout(&self) -> Duration {
        Duration::from_millis(self.rates_timeout_ms)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
