//! Configuration module
//!
//! Loads configuration from environment variables.

use sha2::{Digest, Sha256};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::ledger::RetryPolicy;

/// Which ledger store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidValue("STORE_BACKEND")),
        }
    }
}

/// Connection pool tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Hard ceiling on open connections
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// Idle connections above the floor are closed after this long
    pub idle_timeout: Duration,
    /// Connections are recycled after this long regardless of use
    pub max_lifetime: Duration,
    /// How long a worker waits for a free connection
    pub acquire_timeout: Duration,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Ledger store backend
    pub store_backend: StoreBackend,

    /// Database connection URL (required for the Postgres backend)
    pub database_url: Option<String>,

    /// Database pool tuning
    pub pool: PoolConfig,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// SHA-256 of the API key expected in `X-API-Key`
    pub api_key_hash: [u8; 32],

    /// Default deadline for one transfer attempt
    pub transfer_timeout: Duration,

    /// Caller-side retry for conflicts and timeouts
    pub retry: RetryPolicy,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_backend = match lookup("STORE_BACKEND") {
            Some(value) => value.parse()?,
            None => StoreBackend::Postgres,
        };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnv("DATABASE_URL"));
        }

        let pool = PoolConfig {
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            min_connections: parse_or(&lookup, "DATABASE_MIN_CONNECTIONS", 5)?,
            idle_timeout: Duration::from_secs(parse_or(&lookup, "DATABASE_IDLE_TIMEOUT_SECS", 60)?),
            max_lifetime: Duration::from_secs(parse_or(
                &lookup,
                "DATABASE_MAX_LIFETIME_SECS",
                300,
            )?),
            acquire_timeout: Duration::from_secs(parse_or(
                &lookup,
                "DATABASE_ACQUIRE_TIMEOUT_SECS",
                5,
            )?),
        };
        if pool.max_connections == 0 {
            return Err(ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"));
        }
        if pool.min_connections > pool.max_connections {
            return Err(ConfigError::InvalidValue("DATABASE_MIN_CONNECTIONS"));
        }

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or(&lookup, "PORT", 3000)?;
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let api_key = lookup("API_KEY")
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingEnv("API_KEY"))?;

        let transfer_timeout = Duration::from_millis(parse_or(&lookup, "TRANSFER_TIMEOUT_MS", 5000)?);
        let retry = RetryPolicy {
            max_attempts: parse_or(&lookup, "TRANSFER_MAX_ATTEMPTS", 3)?,
            base_delay: Duration::from_millis(parse_or(&lookup, "TRANSFER_RETRY_BASE_MS", 50)?),
            max_delay: Duration::from_millis(parse_or(&lookup, "TRANSFER_RETRY_MAX_MS", 1000)?),
        };
        if retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue("TRANSFER_MAX_ATTEMPTS"));
        }

        Ok(Self {
            store_backend,
            database_url,
            pool,
            host,
            port,
            environment,
            api_key_hash: hash_api_key(&api_key),
            transfer_timeout,
            retry,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// SHA-256 digest used to compare API keys without keeping the plaintext
pub fn hash_api_key(key: &str) -> [u8; 32] {
    Sha256::digest(key.as_bytes()).into()
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key)),
        None => Ok(default),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
