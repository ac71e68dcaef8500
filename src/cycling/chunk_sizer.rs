use chrono::{DateTime, Utc};

use crate::db::{DbResult, PerformanceDatumRepo};

/// Picks how many rows the next delete may touch.
///
/// Ids grow with insertion time, so the highest id among rows newer than the
/// cutoff marks where old data ends. Counting the old rows below that
/// boundary (capped at the nominal size) keeps a delete from scanning far
/// into young data looking for rows it will never match.
#[derive(Debug, Clone)]
pub struct ChunkSizer {
    cutoff: DateTime<Utc>,
    nominal: u32,
    repository_id: Option<i64>,
}

impl ChunkSizer {
    pub fn new(cutoff: DateTime<Utc>, nominal: u32, repository_id: Option<i64>) -> Self {
        Self {
            cutoff,
            nominal,
            repository_id,
        }
    }

    /// Never more than the nominal size. Falls back to the nominal size when
    /// nothing is eligible, so the delete still runs as a bounded no-op.
    pub async fn ideal_chunk_size(&self, repo: &dyn PerformanceDatumRepo) -> DbResult<u32> {
        let boundary = repo.max_id_after(self.cutoff, self.repository_id).await?;
        let older = repo
            .count_at_or_before(self.cutoff, boundary, self.repository_id, self.nominal)
            .await?;

        tracing::trace!(?boundary, older, nominal = self.nominal, "Sized chunk");

        if older == 0 {
            return Ok(self.nominal);
        }
        Ok(older.min(u64::from(self.nominal)) as u32)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    /// Answers sizing queries with fixed values.
    struct FixedCounts {
        boundary: Option<i64>,
        older: u64,
    }

    #[async_trait]
    impl PerformanceDatumRepo for FixedCounts {
        async fn repository_id(&self, _name: &str) -> DbResult<Option<i64>> {
            Ok(None)
        }

        async fn max_id_after(
            &self,
            _cutoff: DateTime<Utc>,
            _repository_id: Option<i64>,
        ) -> DbResult<Option<i64>> {
            Ok(self.boundary)
        }

        async fn count_at_or_before(
            &self,
            _cutoff: DateTime<Utc>,
            _max_id: Option<i64>,
            _repository_id: Option<i64>,
            _cap: u32,
        ) -> DbResult<u64> {
            Ok(self.older)
        }

        async fn delete_before(
            &self,
            _cutoff: DateTime<Utc>,
            _repository_id: Option<i64>,
            _limit: u32,
        ) -> DbResult<u64> {
            Ok(0)
        }
    }

    fn sizer(nominal: u32) -> ChunkSizer {
        ChunkSizer::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            nominal,
            None,
        )
    }

    #[rstest]
    #[case::nothing_eligible(Some(10), 0, 100)]
    #[case::no_boundary_nothing_eligible(None, 0, 100)]
    #[case::sparse(Some(10), 37, 37)]
    #[case::dense(Some(10), 100, 100)]
    #[case::over_reported(None, 5_000, 100)]
    #[tokio::test]
    async fn test_ideal_chunk_size(
        #[case] boundary: Option<i64>,
        #[case] older: u64,
        #[case] expected: u32,
    ) {
        let repo = FixedCounts { boundary, older };
        assert_eq!(sizer(100).ideal_chunk_size(&repo).await.unwrap(), expected);
    }

    #[cfg(feature = "database-sqlite")]
    mod sqlite {
        use chrono::Duration;

        use super::*;
        use crate::db::{
            sqlite::SqlitePerformanceDatumRepo,
            tests::harness::{Seed, SqliteSeed, create_sqlite_pool},
        };

        fn cutoff() -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        }

        #[tokio::test]
        async fn test_counts_old_rows_below_boundary() {
            let pool = create_sqlite_pool().await;
            let repo = SqlitePerformanceDatumRepo::new(pool.clone());
            let seed = SqliteSeed(pool);
            let central = seed.repository("mozilla-central").await;

            for _ in 0..3 {
                seed.datum(central, cutoff() - Duration::days(2)).await;
            }
            seed.datum(central, cutoff() + Duration::days(2)).await;
            // Backfilled after the boundary, so not counted
            seed.datum(central, cutoff() - Duration::days(2)).await;

            let sizer = ChunkSizer::new(cutoff(), 100, None);
            assert_eq!(sizer.ideal_chunk_size(&repo).await.unwrap(), 3);
        }

        #[tokio::test]
        async fn test_without_boundary_counts_all_old_rows() {
            let pool = create_sqlite_pool().await;
            let repo = SqlitePerformanceDatumRepo::new(pool.clone());
            let seed = SqliteSeed(pool);
            let central = seed.repository("mozilla-central").await;

            for _ in 0..5 {
                seed.datum(central, cutoff() - Duration::days(2)).await;
            }

            assert_eq!(
                ChunkSizer::new(cutoff(), 3, None)
                    .ideal_chunk_size(&repo)
                    .await
                    .unwrap(),
                3
            );
            assert_eq!(
                ChunkSizer::new(cutoff(), 100, None)
                    .ideal_chunk_size(&repo)
                    .await
                    .unwrap(),
                5
            );
        }

        #[tokio::test]
        async fn test_scope_applies_to_both_queries() {
            let pool = create_sqlite_pool().await;
            let repo = SqlitePerformanceDatumRepo::new(pool.clone());
            let seed = SqliteSeed(pool);
            let central = seed.repository("mozilla-central").await;
            let try_repo = seed.repository("try").await;

            seed.datum(try_repo, cutoff() - Duration::days(2)).await;
            seed.datum(try_repo, cutoff() - Duration::days(2)).await;
            seed.datum(try_repo, cutoff() + Duration::days(2)).await;
            for _ in 0..4 {
                seed.datum(central, cutoff() - Duration::days(2)).await;
            }

            let sizer = ChunkSizer::new(cutoff(), 100, Some(try_repo));
            assert_eq!(sizer.ideal_chunk_size(&repo).await.unwrap(), 2);
        }
    }
}
