use super::{
    guard::{Budget, RuntimeGuard},
    report::{CycleReport, StepReport},
};
use crate::db::{AncillaryKind, AncillaryRepo, DbResult};

/// Deletes lookup rows (job types, job groups, machines) that no job
/// references any more.
#[derive(Debug, Clone, Copy)]
pub struct OrphanPruner {
    chunk_size: usize,
}

impl OrphanPruner {
    pub fn new(chunk_size: u32) -> Self {
        Self {
            chunk_size: chunk_size.max(1) as usize,
        }
    }

    /// Prune every kind in [`AncillaryKind::PRUNE_ORDER`], adding one step
    /// per kind to `report`.
    ///
    /// A failing kind is logged and recorded on its step; the remaining kinds
    /// still run. Only the guard stops the sequence early.
    pub async fn prune(
        &self,
        repo: &dyn AncillaryRepo,
        guard: &RuntimeGuard,
        report: &mut CycleReport,
    ) -> Budget {
        tracing::info!("Pruning ancillary data: job types, groups and machines");

        for kind in AncillaryKind::PRUNE_ORDER {
            if let Budget::Exceeded(exceeded) = guard.check() {
                return Budget::Exceeded(exceeded);
            }

            let mut step = StepReport::new(format!("prune:{kind}"));
            let budget = match self.prune_kind(repo, kind, guard, &mut step).await {
                Ok(budget) => budget,
                Err(e) => {
                    tracing::error!(kind = %kind, error = %e, "Error pruning ancillary data");
                    step.fail(&e);
                    Budget::Within
                }
            };
            report.push(step);

            if budget.is_exceeded() {
                return budget;
            }
        }

        Budget::Within
    }

    async fn prune_kind(
        &self,
        repo: &dyn AncillaryRepo,
        kind: AncillaryKind,
        guard: &RuntimeGuard,
        step: &mut StepReport,
    ) -> DbResult<Budget> {
        let unused = repo.unreferenced_ids(kind).await?;
        tracing::info!(
            kind = %kind,
            count = unused.len(),
            "Removing {} records from {}",
            unused.len(),
            kind
        );

        let mut remaining = unused.len();
        for chunk in unused.chunks(self.chunk_size) {
            if let Budget::Exceeded(exceeded) = guard.check() {
                return Ok(Budget::Exceeded(exceeded));
            }

            tracing::debug!(kind = %kind, "Deleting {} of {}", chunk.len(), remaining);
            let deleted = repo.delete_unreferenced(kind, chunk).await?;
            step.record_statement(deleted);
            remaining -= chunk.len();
        }

        Ok(Budget::Within)
    }
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        cycling::DataSource,
        db::{
            DbError,
            sqlite::SqliteAncillaryRepo,
            tests::harness::{Seed, SqliteSeed, create_sqlite_pool},
        },
    };

    /// Fails every call for one kind and delegates the rest.
    struct FailingKind {
        inner: SqliteAncillaryRepo,
        failing: AncillaryKind,
    }

    #[async_trait]
    impl AncillaryRepo for FailingKind {
        async fn unreferenced_ids(&self, kind: AncillaryKind) -> DbResult<Vec<i64>> {
            if kind == self.failing {
                return Err(DbError::Internal(format!("no such table: {kind}")));
            }
            self.inner.unreferenced_ids(kind).await
        }

        async fn delete_unreferenced(&self, kind: AncillaryKind, ids: &[i64]) -> DbResult<u64> {
            self.inner.delete_unreferenced(kind, ids).await
        }
    }

    /// Three lookups of each kind; only the first of each is used by a job.
    async fn seed_lookups(seed: &SqliteSeed) -> (i64, i64, i64) {
        let used = seed.lookups("used").await;
        seed.lookups("stale-1").await;
        seed.lookups("stale-2").await;
        let submitted = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        seed.job(submitted, used.0, used.1, used.2).await;
        used
    }

    #[tokio::test]
    async fn test_prune_removes_only_unreferenced() {
        let pool = create_sqlite_pool().await;
        let repo = SqliteAncillaryRepo::new(pool.clone());
        let seed = SqliteSeed(pool);
        let (job_type, job_group, machine) = seed_lookups(&seed).await;

        let mut report = CycleReport::new(DataSource::Treeherder);
        let budget = OrphanPruner::new(1)
            .prune(&repo, &RuntimeGuard::new(None), &mut report)
            .await;

        assert_eq!(budget, Budget::Within);
        assert_eq!(seed.ids("job_type").await, vec![job_type]);
        assert_eq!(seed.ids("job_group").await, vec![job_group]);
        assert_eq!(seed.ids("machine").await, vec![machine]);

        let names: Vec<_> = report.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["prune:job_type", "prune:job_group", "prune:machine"]
        );
        // chunk size 1, two orphans per kind
        assert!(report.steps.iter().all(|s| s.statements == 2 && s.deleted == 2));
    }

    #[tokio::test]
    async fn test_failing_kind_does_not_stop_others() {
        let pool = create_sqlite_pool().await;
        let repo = FailingKind {
            inner: SqliteAncillaryRepo::new(pool.clone()),
            failing: AncillaryKind::JobType,
        };
        let seed = SqliteSeed(pool);
        seed_lookups(&seed).await;

        let mut report = CycleReport::new(DataSource::Treeherder);
        OrphanPruner::new(100)
            .prune(&repo, &RuntimeGuard::new(None), &mut report)
            .await;

        assert!(report.has_failures());
        assert!(report.step("prune:job_type").unwrap().error.is_some());
        assert_eq!(seed.count("job_type").await, 3);
        assert_eq!(seed.count("job_group").await, 1);
        assert_eq!(seed.count("machine").await, 1);
    }

    #[tokio::test]
    async fn test_tripped_guard_prunes_nothing() {
        let pool = create_sqlite_pool().await;
        let repo = SqliteAncillaryRepo::new(pool.clone());
        let seed = SqliteSeed(pool);
        seed_lookups(&seed).await;
        let guard = RuntimeGuard::starting_at(
            Instant::now() - Duration::from_millis(50),
            Some(Duration::from_millis(10)),
        );

        let mut report = CycleReport::new(DataSource::Treeherder);
        let budget = OrphanPruner::new(100).prune(&repo, &guard, &mut report).await;

        assert!(budget.is_exceeded());
        assert!(report.steps.is_empty());
        assert_eq!(seed.count("machine").await, 3);
    }
}
