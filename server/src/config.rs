//! Configuration management for the server.

use crate::plan;
use faultsync_engine::{parse_version, SemVer};
use std::env;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Upper bound of the connection pool
    pub max_connections: u32,
    /// Clients below this dataset version always get a full snapshot
    pub min_delta_version: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = match lookup("PORT") {
            Some(port) => port.parse().map_err(|_| ConfigError::InvalidPort)?,
            None => 3000,
        };

        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(n) => n.parse().map_err(|_| ConfigError::InvalidMaxConnections)?,
            None => 10,
        };

        let min_delta_version = match lookup("FAULTSYNC_MIN_DELTA_VERSION") {
            Some(v) if parse_version(&v) == SemVer::ZERO => {
                return Err(ConfigError::InvalidMinDeltaVersion(v))
            }
            Some(v) => v.trim().to_string(),
            None => plan::MIN_DELTA_VERSION.to_string(),
        };

        Ok(Self {
            host,
            port,
            database_url,
            max_connections,
            min_delta_version,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL environment variable is required")]
    MissingDatabaseUrl,

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid DATABASE_MAX_CONNECTIONS value")]
    InvalidMaxConnections,

    #[error("FAULTSYNC_MIN_DELTA_VERSION must be a version above 0.0.0, got {0:?}")]
    InvalidMinDeltaVersion(String),
}
