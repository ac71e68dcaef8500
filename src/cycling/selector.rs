use std::time::Duration;

use super::{
    CycleError, DataSource,
    perfherder::{PerfherderCycler, ScopedRetention},
    policy::RetentionPolicy,
    report::CycleOutcome,
    treeherder::TreeherderCycler,
};
use crate::{config::RetentionConfig, db::DbPool};

/// Per-invocation overrides. Unset fields fall back to the domain's
/// configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleOptions {
    pub days: Option<u32>,
    pub chunk_size: Option<u32>,
    /// Seconds to pause between job chunks.
    pub sleep_time: Option<u64>,
}

/// A configured run for one data domain.
#[derive(Debug, Clone)]
pub enum DataCycler {
    Treeherder(TreeherderCycler),
    Perfherder(PerfherderCycler),
}

impl DataCycler {
    pub fn source(&self) -> DataSource {
        match self {
            DataCycler::Treeherder(_) => DataSource::Treeherder,
            DataCycler::Perfherder(_) => DataSource::Perfherder,
        }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        match self {
            DataCycler::Treeherder(c) => c.policy(),
            DataCycler::Perfherder(c) => c.policy(),
        }
    }

    pub async fn cycle(&self, db: &DbPool) -> Result<CycleOutcome, CycleError> {
        let policy = self.policy();
        tracing::info!(
            source = %self.source(),
            days = policy.days(),
            chunk_size = policy.chunk_size(),
            max_runtime_secs = policy.max_runtime().map(|d| d.as_secs()),
            "Cycling {} data",
            self.source().title()
        );

        match self {
            DataCycler::Treeherder(c) => {
                let jobs = db.jobs();
                let ancillary = db.ancillary();
                c.cycle(jobs.as_ref(), ancillary.as_ref()).await
            }
            DataCycler::Perfherder(c) => c.cycle(db.performance().as_ref()).await,
        }
    }
}

/// Build the cycler for `source`.
///
/// Validation (chunk size, performance retention floor) happens here, before
/// any database work. `site_hostname` identifies the deployment for the
/// floor exemption.
pub fn fabricate_data_cycler(
    source: DataSource,
    options: &CycleOptions,
    config: &RetentionConfig,
    site_hostname: Option<&str>,
) -> Result<DataCycler, CycleError> {
    let span = tracing::info_span!("cycle_data", source = %source);

    match source {
        DataSource::Treeherder => {
            let jobs = &config.jobs;
            let policy = RetentionPolicy::new(
                options.days.unwrap_or(jobs.days),
                options.chunk_size.unwrap_or(jobs.chunk_size),
                jobs.max_runtime(),
            )?;
            let sleep_time =
                Duration::from_secs(options.sleep_time.unwrap_or(jobs.sleep_time_secs));

            Ok(DataCycler::Treeherder(TreeherderCycler::new(policy, sleep_time, span)))
        }
        DataSource::Perfherder => {
            let performance = &config.performance;
            if options.sleep_time.is_some_and(|s| s > 0) {
                tracing::debug!("Sleep time is ignored when cycling performance data");
            }
            let policy = RetentionPolicy::new(
                options.days.unwrap_or(performance.days),
                options.chunk_size.unwrap_or(performance.chunk_size),
                performance.max_runtime(),
            )?;
            let scoped = ScopedRetention {
                repository: performance.scoped_repository.clone(),
                days: performance.scoped_days,
            };
            let floor_exempt = performance.is_floor_exempt(site_hostname);

            Ok(DataCycler::Perfherder(PerfherderCycler::new(
                policy,
                scoped,
                floor_exempt,
                span,
            )?))
        }
    }
}
