use std::{
    fmt,
    time::{Duration, Instant},
};

/// The run used up its wall-clock budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxRuntimeExceeded {
    pub elapsed: Duration,
    pub max_runtime: Duration,
}

impl fmt::Display for MaxRuntimeExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Max runtime of {}s exceeded after {}s",
            self.max_runtime.as_secs(),
            self.elapsed.as_secs()
        )
    }
}

/// Result of checking a [`RuntimeGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    Within,
    Exceeded(MaxRuntimeExceeded),
}

impl Budget {
    pub fn is_exceeded(&self) -> bool {
        matches!(self, Budget::Exceeded(_))
    }
}

/// Wall-clock ceiling for one cycling run.
///
/// The guard is cooperative: callers check it before each chunk and stop
/// issuing statements once it reports [`Budget::Exceeded`]. Work already
/// committed stays committed.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeGuard {
    started_at: Instant,
    max_runtime: Option<Duration>,
}

impl RuntimeGuard {
    /// Start the clock now. `None` means no ceiling.
    pub fn new(max_runtime: Option<Duration>) -> Self {
        Self::starting_at(Instant::now(), max_runtime)
    }

    pub fn starting_at(started_at: Instant, max_runtime: Option<Duration>) -> Self {
        Self {
            started_at,
            max_runtime,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn check(&self) -> Budget {
        let elapsed = self.elapsed();
        if let Some(max_runtime) = self.max_runtime
            && elapsed > max_runtime
        {
            return Budget::Exceeded(MaxRuntimeExceeded {
                elapsed,
                max_runtime,
            });
        }
        Budget::Within
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started_ago(ago: Duration, max_runtime: Option<Duration>) -> RuntimeGuard {
        let started_at = Instant::now()
            .checked_sub(ago)
            .expect("monotonic clock too close to its origin");
        RuntimeGuard::starting_at(started_at, max_runtime)
    }

    #[test]
    fn test_unlimited_guard_never_trips() {
        let guard = started_ago(Duration::from_millis(50), None);
        assert_eq!(guard.check(), Budget::Within);
    }

    #[test]
    fn test_within_budget() {
        let guard = RuntimeGuard::new(Some(Duration::from_secs(23 * 3600)));
        assert!(!guard.check().is_exceeded());
    }

    #[test]
    fn test_exceeded_budget_reports_elapsed() {
        let guard = started_ago(Duration::from_millis(50), Some(Duration::from_millis(10)));
        let Budget::Exceeded(exceeded) = guard.check() else {
            panic!("guard should have tripped");
        };
        assert_eq!(exceeded.max_runtime, Duration::from_millis(10));
        assert!(exceeded.elapsed >= Duration::from_millis(50));
    }

    #[test]
    fn test_exceeded_display() {
        let exceeded = MaxRuntimeExceeded {
            elapsed: Duration::from_secs(90),
            max_runtime: Duration::from_secs(60),
        };
        assert_eq!(
            exceeded.to_string(),
            "Max runtime of 60s exceeded after 90s"
        );
    }
}
