use std::time::Duration;

use chrono::Utc;
use tracing::{Instrument, Span};

use super::{
    CycleError, DataSource,
    guard::{Budget, RuntimeGuard},
    policy::RetentionPolicy,
    pruner::OrphanPruner,
    report::{CycleOutcome, CycleReport, StepReport},
};
use crate::db::{AncillaryRepo, DbError, JobRepo};

/// Cycles job results: deletes aged jobs with their dependent rows, then
/// prunes lookup rows the deleted jobs left unreferenced.
#[derive(Debug, Clone)]
pub struct TreeherderCycler {
    policy: RetentionPolicy,
    sleep_time: Duration,
    span: Span,
}

impl TreeherderCycler {
    pub fn new(policy: RetentionPolicy, sleep_time: Duration, span: Span) -> Self {
        Self {
            policy,
            sleep_time,
            span,
        }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    pub async fn cycle(
        &self,
        jobs: &dyn JobRepo,
        ancillary: &dyn AncillaryRepo,
    ) -> Result<CycleOutcome, CycleError> {
        let guard = RuntimeGuard::new(self.policy.max_runtime());
        self.cycle_with_guard(jobs, ancillary, guard)
            .instrument(self.span.clone())
            .await
    }

    async fn cycle_with_guard(
        &self,
        jobs: &dyn JobRepo,
        ancillary: &dyn AncillaryRepo,
        guard: RuntimeGuard,
    ) -> Result<CycleOutcome, CycleError> {
        let cutoff = self.policy.cutoff_from(Utc::now());
        let mut report = CycleReport::new(DataSource::Treeherder);

        tracing::info!(cutoff = %cutoff, "Cycling jobs across all repositories");

        let mut step = StepReport::new("jobs");
        let budget = match self.delete_jobs(jobs, cutoff, &guard, &mut step).await {
            Ok(budget) => budget,
            Err(e) if e.is_transient() => {
                // Pruning still runs after a transient failure
                tracing::error!(error = %e, "Error running cycle_data");
                step.fail(&e);
                Budget::Within
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(deleted = step.deleted, "Deleted {} jobs", step.deleted);
        report.push(step);

        let budget = match budget {
            Budget::Within => {
                OrphanPruner::new(self.policy.chunk_size())
                    .prune(ancillary, &guard, &mut report)
                    .await
            }
            exceeded => exceeded,
        };

        report.elapsed = guard.elapsed();
        Ok(match budget {
            Budget::Within => CycleOutcome::Completed(report),
            Budget::Exceeded(reason) => {
                tracing::warn!(%reason, deleted = report.total_deleted(), "Cycling aborted");
                CycleOutcome::Aborted { report, reason }
            }
        })
    }

    async fn delete_jobs(
        &self,
        jobs: &dyn JobRepo,
        cutoff: chrono::DateTime<Utc>,
        guard: &RuntimeGuard,
        step: &mut StepReport,
    ) -> Result<Budget, DbError> {
        let eligible = jobs.count_before(cutoff).await?;
        tracing::info!(eligible, "Found {} jobs older than the cutoff", eligible);

        let chunk_size = self.policy.chunk_size();
        loop {
            if let Budget::Exceeded(exceeded) = guard.check() {
                return Ok(Budget::Exceeded(exceeded));
            }

            let deleted = jobs.delete_chunk_before(cutoff, chunk_size).await?;
            step.record_statement(deleted);
            tracing::debug!(deleted, total = step.deleted, "Deleted job chunk");

            if deleted < u64::from(chunk_size) {
                return Ok(Budget::Within);
            }

            if !self.sleep_time.is_zero() {
                tokio::time::sleep(self.sleep_time).await;
            }
        }
    }
}
