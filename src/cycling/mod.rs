//! Data cycling: permanent deletion of rows that aged past their retention.
//!
//! A run covers one data domain ([`DataSource`]):
//! 1. **Treeherder**: deletes jobs (with their logs and details) in chunked
//!    transactions, then prunes job types, job groups and machines no job
//!    references any more.
//! 2. **Perfherder**: runs the main [`RemovalStrategy`] over all
//!    performance data, then a scoped one over a single repository with a
//!    shorter retention.
//!
//! Every delete is bounded, and a [`RuntimeGuard`] is checked before each one
//! so a run can stop cleanly when its time budget is spent. Runs are built by
//! [`fabricate_data_cycler`].

use std::fmt;

use thiserror::Error;

use crate::db::DbError;

mod chunk_sizer;
mod guard;
mod perfherder;
mod policy;
mod pruner;
mod report;
mod selector;
mod strategy;
mod treeherder;

pub use chunk_sizer::ChunkSizer;
pub use guard::{Budget, MaxRuntimeExceeded, RuntimeGuard};
pub use perfherder::{PerfherderCycler, ScopedRetention};
pub use policy::RetentionPolicy;
pub use pruner::OrphanPruner;
pub use report::{CycleOutcome, CycleReport, StepReport};
pub use selector::{CycleOptions, DataCycler, fabricate_data_cycler};
pub use strategy::{RemovalStrategy, StrategyKind};
pub use treeherder::TreeherderCycler;

/// Data domain a run cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DataSource {
    /// Job results and their ancillary data.
    #[default]
    Treeherder,
    /// Performance data points.
    Perfherder,
}

impl DataSource {
    pub fn title(&self) -> &'static str {
        match self {
            DataSource::Treeherder => "Treeherder",
            DataSource::Perfherder => "Perfherder",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Treeherder => f.write_str("treeherder"),
            DataSource::Perfherder => f.write_str("perfherder"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Cannot remove performance data that is more recent than {floor} days (requested {days})")]
    BelowRetentionFloor { days: u32, floor: u32 },

    #[error("Invalid retention policy: {0}")]
    InvalidPolicy(String),

    #[error(transparent)]
    Database(#[from] DbError),
}
