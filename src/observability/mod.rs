//! Observability: structured logging setup for the `cycle-data` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the binary.

mod tracing_init;

pub use tracing_init::*;
