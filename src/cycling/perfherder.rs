use chrono::Utc;
use tracing::{Instrument, Span};

use super::{
    CycleError, DataSource,
    guard::{Budget, RuntimeGuard},
    policy::RetentionPolicy,
    report::{CycleOutcome, CycleReport, StepReport},
    strategy::RemovalStrategy,
};
use crate::{config::MINIMUM_PERFORMANCE_RETENTION_DAYS, db::PerformanceDatumRepo};

/// Repository whose data expires sooner than everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedRetention {
    pub repository: String,
    pub days: u32,
}

/// Cycles performance data through the main strategy, then the scoped one.
#[derive(Debug, Clone)]
pub struct PerfherderCycler {
    policy: RetentionPolicy,
    scoped: ScopedRetention,
    span: Span,
}

impl PerfherderCycler {
    /// Fails unless the policy keeps at least
    /// [`MINIMUM_PERFORMANCE_RETENTION_DAYS`] of data or `floor_exempt` is set.
    pub fn new(
        policy: RetentionPolicy,
        scoped: ScopedRetention,
        floor_exempt: bool,
        span: Span,
    ) -> Result<Self, CycleError> {
        if !floor_exempt {
            policy.ensure_floor(MINIMUM_PERFORMANCE_RETENTION_DAYS)?;
        }
        Ok(Self {
            policy,
            scoped,
            span,
        })
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    pub async fn cycle(
        &self,
        repo: &dyn PerformanceDatumRepo,
    ) -> Result<CycleOutcome, CycleError> {
        let guard = RuntimeGuard::new(self.policy.max_runtime());
        self.cycle_with_guard(repo, guard)
            .instrument(self.span.clone())
            .await
    }

    async fn cycle_with_guard(
        &self,
        repo: &dyn PerformanceDatumRepo,
        guard: RuntimeGuard,
    ) -> Result<CycleOutcome, CycleError> {
        let now = Utc::now();
        let mut report = CycleReport::new(DataSource::Perfherder);
        let strategies = self.strategies(repo, now, &mut report).await?;

        for strategy in &strategies {
            let mut step = StepReport::new(strategy.name());
            tracing::info!(
                strategy = %step.name,
                cutoff = %strategy.cutoff(),
                "Running removal strategy"
            );

            let result = strategy.run(repo, &guard, &mut step).await;
            tracing::info!(
                strategy = %step.name,
                deleted = step.deleted,
                statements = step.statements,
                "Removal strategy finished"
            );

            match result {
                Ok(Budget::Within) => report.push(step),
                Ok(Budget::Exceeded(reason)) => {
                    report.push(step);
                    report.elapsed = guard.elapsed();
                    tracing::warn!(%reason, deleted = report.total_deleted(), "Cycling aborted");
                    return Ok(CycleOutcome::Aborted { report, reason });
                }
                Err(e) if e.is_transient() => {
                    tracing::error!(strategy = %step.name, error = %e, "Removal strategy failed");
                    step.fail(&e);
                    report.push(step);
                }
                Err(e) => return Err(e.into()),
            }
        }

        report.elapsed = guard.elapsed();
        Ok(CycleOutcome::Completed(report))
    }

    /// Main strategy plus, when its repository exists, the scoped one.
    async fn strategies(
        &self,
        repo: &dyn PerformanceDatumRepo,
        now: chrono::DateTime<Utc>,
        report: &mut CycleReport,
    ) -> Result<Vec<RemovalStrategy>, CycleError> {
        let chunk_size = self.policy.chunk_size();
        let mut strategies = vec![RemovalStrategy::main(
            self.policy.cutoff_from(now),
            chunk_size,
        )];

        let scoped_cutoff = now - chrono::Duration::days(i64::from(self.scoped.days));
        let scoped =
            RemovalStrategy::scoped(repo, &self.scoped.repository, scoped_cutoff, chunk_size).await;
        match scoped {
            Ok(Some(strategy)) => strategies.push(strategy),
            Ok(None) => {
                tracing::warn!(
                    repository = %self.scoped.repository,
                    "Repository not found, skipping scoped removal"
                );
            }
            Err(e) if e.is_transient() => {
                tracing::error!(
                    repository = %self.scoped.repository,
                    error = %e,
                    "Could not resolve repository, skipping scoped removal"
                );
                let mut step = StepReport::new(format!("scoped:{}", self.scoped.repository));
                step.fail(&e);
                report.push(step);
            }
            Err(e) => return Err(e.into()),
        }

        Ok(strategies)
    }
}
