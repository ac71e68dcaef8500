use std::borrow::Cow;

use chrono::{DateTime, Utc};

use super::{
    chunk_sizer::ChunkSizer,
    guard::{Budget, RuntimeGuard},
    report::StepReport,
};
use crate::db::{DbResult, PerformanceDatumRepo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyKind {
    /// Every repository, full retention interval.
    Main,
    /// One repository, its own (shorter) interval.
    Scoped { repository: String, repository_id: i64 },
}

/// One way of deleting aged `performance_datum` rows.
///
/// The cutoff is fixed when the strategy is built, so a long run never
/// starts deleting rows that were young when it began.
#[derive(Debug, Clone)]
pub struct RemovalStrategy {
    kind: StrategyKind,
    cutoff: DateTime<Utc>,
    chunk_size: u32,
    sizer: ChunkSizer,
}

impl RemovalStrategy {
    pub fn main(cutoff: DateTime<Utc>, chunk_size: u32) -> Self {
        Self {
            kind: StrategyKind::Main,
            cutoff,
            chunk_size,
            sizer: ChunkSizer::new(cutoff, chunk_size, None),
        }
    }

    /// Resolve `repository` to its id and build a strategy scoped to it.
    ///
    /// Returns `None` when no such repository exists.
    pub async fn scoped(
        repo: &dyn PerformanceDatumRepo,
        repository: &str,
        cutoff: DateTime<Utc>,
        chunk_size: u32,
    ) -> DbResult<Option<Self>> {
        let Some(repository_id) = repo.repository_id(repository).await? else {
            return Ok(None);
        };

        Ok(Some(Self {
            kind: StrategyKind::Scoped {
                repository: repository.to_string(),
                repository_id,
            },
            cutoff,
            chunk_size,
            sizer: ChunkSizer::new(cutoff, chunk_size, Some(repository_id)),
        }))
    }

    pub fn kind(&self) -> &StrategyKind {
        &self.kind
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    pub fn name(&self) -> Cow<'static, str> {
        match &self.kind {
            StrategyKind::Main => Cow::Borrowed("main"),
            StrategyKind::Scoped { repository, .. } => Cow::Owned(format!("scoped:{repository}")),
        }
    }

    fn repository_id(&self) -> Option<i64> {
        match &self.kind {
            StrategyKind::Main => None,
            StrategyKind::Scoped { repository_id, .. } => Some(*repository_id),
        }
    }

    /// Issue a single bounded DELETE. Returns the rows it removed.
    pub async fn remove(&self, repo: &dyn PerformanceDatumRepo) -> DbResult<u64> {
        let (_, deleted) = self.remove_sized(repo).await?;
        Ok(deleted)
    }

    async fn remove_sized(&self, repo: &dyn PerformanceDatumRepo) -> DbResult<(u32, u64)> {
        let limit = self.sizer.ideal_chunk_size(repo).await?;
        let deleted = repo
            .delete_before(self.cutoff, self.repository_id(), limit)
            .await?;

        tracing::debug!(strategy = %self.name(), limit, deleted, "Removed chunk");
        Ok((limit, deleted))
    }

    /// Whether any row at or before the cutoff is left in scope.
    async fn has_remaining(&self, repo: &dyn PerformanceDatumRepo) -> DbResult<bool> {
        let left = repo
            .count_at_or_before(self.cutoff, None, self.repository_id(), 1)
            .await?;
        Ok(left > 0)
    }

    /// Call [`Self::remove`] until no eligible rows are left or the guard
    /// trips.
    ///
    /// A statement that deletes fewer rows than its limit ran dry. One that
    /// filled a limit below the chunk size was sized around young rows, so
    /// the loop only stops there once nothing old remains in scope.
    ///
    /// Counters in `step` include every statement that completed, even when
    /// this returns an error.
    pub async fn run(
        &self,
        repo: &dyn PerformanceDatumRepo,
        guard: &RuntimeGuard,
        step: &mut StepReport,
    ) -> DbResult<Budget> {
        loop {
            if let Budget::Exceeded(exceeded) = guard.check() {
                return Ok(Budget::Exceeded(exceeded));
            }

            let (limit, deleted) = self.remove_sized(repo).await?;
            step.record_statement(deleted);

            if deleted < u64::from(limit) {
                return Ok(Budget::Within);
            }
            if limit < self.chunk_size && !self.has_remaining(repo).await? {
                return Ok(Budget::Within);
            }
        }
    }
}
