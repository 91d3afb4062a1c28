//! Manager configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default cadence of the periodic retry scan.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Default maximum age of a job, measured from creation, after which it is
/// evicted regardless of outcome.
pub const DEFAULT_MAX_RETRY_TIMEOUT: Duration = Duration::from_secs(300);

/// Default store location.
pub const DEFAULT_DB_PATH: &str = "jobs.db";

/// Configuration for a [`Manager`](crate::Manager).
///
/// All fields are optional when deserialized; missing fields take the
/// documented defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Retry/scan cadence in milliseconds. Zero falls back to the default.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Maximum retry age in milliseconds, measured from job creation.
    /// Zero means jobs expire on the first tick after creation.
    #[serde(default = "default_max_retry_timeout_ms")]
    pub max_retry_timeout_ms: u64,

    /// Path of the embedded store database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_retry_timeout_ms: default_max_retry_timeout_ms(),
            db_path: default_db_path(),
        }
    }
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL.as_millis() as u64
}

fn default_max_retry_timeout_ms() -> u64 {
    DEFAULT_MAX_RETRY_TIMEOUT.as_millis() as u64
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

impl ManagerConfig {
    /// Returns the scan interval as a `Duration`, substituting the default
    /// when configured as zero.
    pub fn interval(&self) -> Duration {
        if self.interval_ms == 0 {
            DEFAULT_INTERVAL
        } else {
            Duration::from_millis(self.interval_ms)
        }
    }

    /// Returns the maximum retry age as a `Duration`. Zero is meaningful:
    /// it expires every job on the first tick after creation.
    pub fn max_retry_timeout(&self) -> Duration {
        Duration::from_millis(self.max_retry_timeout_ms)
    }

    /// Sets the scan interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = interval.as_millis() as u64;
        self
    }

    /// Sets the maximum retry age.
    pub fn with_max_retry_timeout(mut self, timeout: Duration) -> Self {
        self.max_retry_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Sets the store database path.
    pub fn with_db_path(mut self, path: impl Into<String>) -> Self {
        self.db_path = path.into();
        self
    }
}
