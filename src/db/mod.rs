mod error;
#[cfg(feature = "database-postgres")]
pub mod postgres;
pub mod repos;
#[cfg(feature = "database-sqlite")]
pub mod sqlite;

#[cfg(all(test, any(feature = "database-sqlite", feature = "database-postgres")))]
pub mod tests;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use repos::*;

use crate::config::DatabaseConfig;

/// Cached repository trait objects, created once at startup.
struct CachedRepos {
    jobs: Arc<dyn JobRepo>,
    ancillary: Arc<dyn AncillaryRepo>,
    performance: Arc<dyn PerformanceDatumRepo>,
}

enum PoolStorage {
    #[cfg(feature = "database-sqlite")]
    Sqlite(sqlx::SqlitePool),
    #[cfg(feature = "database-postgres")]
    Postgres(sqlx::PgPool),
    #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
    _None(std::convert::Infallible),
}

/// Connection to the store being cycled, plus its repositories.
///
/// Pools hold a single connection: statements run one after another, and a
/// chunk transaction never competes with another statement from this process.
pub struct DbPool {
    inner: PoolStorage,
    repos: CachedRepos,
}

impl DbPool {
    #[cfg(feature = "database-sqlite")]
    pub fn from_sqlite(pool: sqlx::SqlitePool) -> Self {
        let repos = CachedRepos {
            jobs: Arc::new(sqlite::SqliteJobRepo::new(pool.clone())),
            ancillary: Arc::new(sqlite::SqliteAncillaryRepo::new(pool.clone())),
            performance: Arc::new(sqlite::SqlitePerformanceDatumRepo::new(pool.clone())),
        };

        DbPool {
            inner: PoolStorage::Sqlite(pool),
            repos,
        }
    }

    #[cfg(feature = "database-postgres")]
    pub fn from_postgres(pool: sqlx::PgPool) -> Self {
        let repos = CachedRepos {
            jobs: Arc::new(postgres::PostgresJobRepo::new(pool.clone())),
            ancillary: Arc::new(postgres::PostgresAncillaryRepo::new(pool.clone())),
            performance: Arc::new(postgres::PostgresPerformanceDatumRepo::new(pool.clone())),
        };

        DbPool {
            inner: PoolStorage::Postgres(pool),
            repos,
        }
    }

    /// Create a database pool from configuration
    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        match config {
            DatabaseConfig::None => Err(DbError::NotConfigured),
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(cfg) => {
                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect_with(
                        sqlx::sqlite::SqliteConnectOptions::new()
                            .filename(&cfg.path)
                            .create_if_missing(cfg.create_if_missing)
                            .journal_mode(if cfg.wal_mode {
                                sqlx::sqlite::SqliteJournalMode::Wal
                            } else {
                                sqlx::sqlite::SqliteJournalMode::Delete
                            })
                            .busy_timeout(std::time::Duration::from_millis(cfg.busy_timeout_ms)),
                    )
                    .await?;

                tracing::debug!(path = %cfg.path, "Opened SQLite database");
                Ok(Self::from_sqlite(pool))
            }
            #[cfg(feature = "database-postgres")]
            DatabaseConfig::Postgres(cfg) => {
                let options = cfg
                    .url
                    .parse::<sqlx::postgres::PgConnectOptions>()?
                    .ssl_mode(cfg.ssl_mode.to_sqlx())
                    .options([("lock_timeout", cfg.lock_timeout_ms.to_string())]);

                let pool = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(1)
                    .acquire_timeout(std::time::Duration::from_secs(cfg.connect_timeout_secs))
                    .connect_with(options)
                    .await?;

                tracing::debug!(
                    lock_timeout_ms = cfg.lock_timeout_ms,
                    "Opened PostgreSQL connection"
                );
                Ok(Self::from_postgres(pool))
            }
        }
    }

    /// Get job repository
    pub fn jobs(&self) -> Arc<dyn JobRepo> {
        Arc::clone(&self.repos.jobs)
    }

    /// Get ancillary lookup repository
    pub fn ancillary(&self) -> Arc<dyn AncillaryRepo> {
        Arc::clone(&self.repos.ancillary)
    }

    /// Get performance datum repository
    pub fn performance(&self) -> Arc<dyn PerformanceDatumRepo> {
        Arc::clone(&self.repos.performance)
    }

    /// Health check for database connectivity
    pub async fn health_check(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }

    /// Close the underlying pool, waiting for the connection to be returned.
    pub async fn close(&self) {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => pool.close().await,
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pool) => pool.close().await,
            #[cfg(not(any(feature = "database-sqlite", feature = "database-postgres")))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }
}
