//! Scheduled data-retention engine for the store behind a CI results service.
//!
//! Permanently deletes job results and performance data that aged past their
//! retention, in bounded chunks, within a wall-clock budget, and without
//! leaving unreferenced lookup rows behind. See [`cycling`] for the run
//! sequence and [`cycling::fabricate_data_cycler`] for the entry point.

pub mod config;
pub mod cycling;
pub mod db;
#[cfg(feature = "cli")]
pub mod observability;
