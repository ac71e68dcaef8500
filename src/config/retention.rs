//! Data retention configuration.
//!
//! Supplies the per-domain defaults a cycling run falls back to when the
//! command line does not override them.
//!
//! # Example
//!
//! ```toml
//! [retention.jobs]
//! days = 120
//! chunk_size = 100
//! sleep_time_secs = 0
//!
//! [retention.performance]
//! days = 365
//! chunk_size = 100
//! max_runtime_hours = 23
//! scoped_repository = "try"
//! scoped_days = 28
//! floor_exempt_hosts = ["treeherder-prototype2.herokuapp.com"]
//! ```

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Performance data younger than this many days is never cycled, unless the
/// deployment is listed in `floor_exempt_hosts`.
pub const MINIMUM_PERFORMANCE_RETENTION_DAYS: u32 = 365;

/// Data retention configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Job results and their ancillary data.
    #[serde(default)]
    pub jobs: JobRetentionConfig,

    /// Performance data points.
    #[serde(default)]
    pub performance: PerformanceRetentionConfig,
}

impl RetentionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs.chunk_size == 0 {
            return Err(ConfigError::Validation(
                "retention.jobs.chunk_size must be at least 1".into(),
            ));
        }
        if self.performance.chunk_size == 0 {
            return Err(ConfigError::Validation(
                "retention.performance.chunk_size must be at least 1".into(),
            ));
        }
        for (field, h) in [
            ("retention.jobs.max_runtime_hours", self.jobs.max_runtime_hours),
            ("retention.performance.max_runtime_hours", self.performance.max_runtime_hours),
        ] {
            if h.checked_mul(3600).is_none() {
                return Err(ConfigError::Validation(format!("{field} is out of range: {h}")));
            }
        }
        if self.performance.scoped_repository.is_empty() {
            return Err(ConfigError::Validation(
                "retention.performance.scoped_repository cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Retention settings for job results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobRetentionConfig {
    /// Jobs submitted more than this many days ago are deleted.
    /// Default: 120
    #[serde(default = "default_job_days")]
    pub days: u32,

    /// Jobs deleted per statement batch.
    /// Default: 100
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Pause between chunks, to throttle load on a shared database.
    /// Default: 0
    #[serde(default)]
    pub sleep_time_secs: u64,

    /// Wall-clock budget for the whole run, in hours.
    /// Set to 0 for unlimited.
    /// Default: 0
    #[serde(default)]
    pub max_runtime_hours: u64,
}

impl Default for JobRetentionConfig {
    fn default() -> Self {
        Self {
            days: default_job_days(),
            chunk_size: default_chunk_size(),
            sleep_time_secs: 0,
            max_runtime_hours: 0,
        }
    }
}

impl JobRetentionConfig {
    pub fn max_runtime(&self) -> Option<std::time::Duration> {
        hours(self.max_runtime_hours)
    }
}

/// Retention settings for performance data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerformanceRetentionConfig {
    /// Data points pushed more than this many days ago are deleted.
    /// Must be at least [`MINIMUM_PERFORMANCE_RETENTION_DAYS`].
    /// Default: 365
    #[serde(default = "default_performance_days")]
    pub days: u32,

    /// Rows deleted per statement batch.
    /// Default: 100
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Wall-clock budget for the whole run, in hours. Keeps a run from
    /// colliding with the next scheduled one. Set to 0 for unlimited.
    /// Default: 23
    #[serde(default = "default_max_runtime_hours")]
    pub max_runtime_hours: u64,

    /// Repository whose data expires on the shorter `scoped_days` interval.
    /// Default: "try"
    #[serde(default = "default_scoped_repository")]
    pub scoped_repository: String,

    /// Retention for `scoped_repository`, in days.
    /// Default: 28
    #[serde(default = "default_scoped_days")]
    pub scoped_days: u32,

    /// Site hostnames allowed to go below the retention floor
    /// (typically throwaway prototype deployments).
    #[serde(default)]
    pub floor_exempt_hosts: Vec<String>,
}

impl Default for PerformanceRetentionConfig {
    fn default() -> Self {
        Self {
            days: default_performance_days(),
            chunk_size: default_chunk_size(),
            max_runtime_hours: default_max_runtime_hours(),
            scoped_repository: default_scoped_repository(),
            scoped_days: default_scoped_days(),
            floor_exempt_hosts: Vec::new(),
        }
    }
}

impl PerformanceRetentionConfig {
    pub fn max_runtime(&self) -> Option<std::time::Duration> {
        hours(self.max_runtime_hours)
    }

    /// Whether the given site may cycle performance data below the floor.
    pub fn is_floor_exempt(&self, site_hostname: Option<&str>) -> bool {
        site_hostname.is_some_and(|host| self.floor_exempt_hosts.iter().any(|h| h == host))
    }
}

fn hours(h: u64) -> Option<std::time::Duration> {
    if h == 0 {
        None
    } else {
        Some(std::time::Duration::from_secs(h.saturating_mul(3600)))
    }
}

fn default_job_days() -> u32 {
    120
}

fn default_performance_days() -> u32 {
    MINIMUM_PERFORMANCE_RETENTION_DAYS
}

fn default_chunk_size() -> u32 {
    100
}

fn default_max_runtime_hours() -> u64 {
    23
}

fn default_scoped_repository() -> String {
    "try".to_string()
}

fn default_scoped_days() -> u32 {
    28 // 4 weeks
}
