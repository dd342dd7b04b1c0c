//! Tickersnap Runner — configuration, pipeline orchestration, scheduling.
//!
//! This crate builds on `tickersnap-core` to provide:
//! - Layered configuration (defaults, TOML file, environment)
//! - The fetch → stamp → load pipeline with a structured run report
//! - A fixed-interval scheduler with no overlap between runs
//! - Console logging setup

pub mod config;
pub mod pipeline;
pub mod scheduler;
pub mod telemetry;

pub use config::{ConfigError, SinkKind, SyncConfig};
pub use pipeline::{BuildError, Pipeline, RunOutcome, RunReport};
pub use scheduler::Scheduler;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn pipeline_is_send_sync() {
        assert_send::<Pipeline>();
        assert_sync::<Pipeline>();
    }

    #[test]
    fn run_report_is_send_sync() {
        assert_send::<RunReport>();
        assert_sync::<RunReport>();
    }
}
