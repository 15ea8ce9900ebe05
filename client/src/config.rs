//! Configuration management for the sync client.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root URL of the sync server
    pub remote_url: String,
    /// Path of the local SQLite database
    pub db_path: PathBuf,
    /// Age after which the local dataset counts as outdated
    pub max_age_hours: u64,
    /// Timeout applied to each remote request
    pub request_timeout: Duration,
    /// Interval of background sync, if enabled
    pub auto_sync_interval: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let remote_url = env::var("FAULTSYNC_REMOTE_URL").map_err(|_| ConfigError::MissingRemoteUrl)?;

        let db_path = env::var("FAULTSYNC_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("faultsync.db"));

        let max_age_hours = env::var("FAULTSYNC_MAX_AGE_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("FAULTSYNC_MAX_AGE_HOURS"))?;

        let timeout_secs: u64 = env::var("FAULTSYNC_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("FAULTSYNC_REQUEST_TIMEOUT_SECS"))?;

        let auto_sync_interval = match env::var("FAULTSYNC_AUTO_SYNC_HOURS") {
            Ok(raw) => {
                let hours: u64 = raw
                    .parse()
                    .map_err(|_| ConfigError::Invalid("FAULTSYNC_AUTO_SYNC_HOURS"))?;
                if hours == 0 {
                    return Err(ConfigError::Invalid("FAULTSYNC_AUTO_SYNC_HOURS"));
                }
                Some(Duration::from_secs(hours * 3600))
            }
            Err(_) => None,
        };

        Ok(Self {
            remote_url,
            db_path,
            max_age_hours,
            request_timeout: Duration::from_secs(timeout_secs),
            auto_sync_interval,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("FAULTSYNC_REMOTE_URL environment variable is required")]
    MissingRemoteUrl,

    #[error("Invalid {0} value")]
    Invalid(&'static str),
}
