use std::time::Duration;

use chrono::{DateTime, Utc};

use super::CycleError;

/// How old data must be before it is cycled, and how it is deleted.
///
/// A policy always has a chunk size of at least one. The performance
/// retention floor is not checked here because whether it applies depends on
/// the deployment; see [`RetentionPolicy::ensure_floor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    days: u32,
    chunk_size: u32,
    max_runtime: Option<Duration>,
}

impl RetentionPolicy {
    pub fn new(
        days: u32,
        chunk_size: u32,
        max_runtime: Option<Duration>,
    ) -> Result<Self, CycleError> {
        if chunk_size == 0 {
            return Err(CycleError::InvalidPolicy("chunk size must be at least 1".into()));
        }
        Ok(Self {
            days,
            chunk_size,
            max_runtime,
        })
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn cutoff_interval(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.days))
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn max_runtime(&self) -> Option<Duration> {
        self.max_runtime
    }

    /// Rows stamped before the returned instant are eligible for deletion.
    pub fn cutoff_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.cutoff_interval()
    }

    pub fn ensure_floor(&self, floor_days: u32) -> Result<(), CycleError> {
        if self.days < floor_days {
            return Err(CycleError::BelowRetentionFloor {
                days: self.days,
                floor: floor_days,
            });
        }
        Ok(())
    }
}
