//! Destinations for a fetched snapshot.
//!
//! Both sinks have full-replace semantics: each load supersedes whatever the
//! previous run wrote.

pub mod csv_file;
pub mod warehouse;

pub use csv_file::CsvFileSink;
pub use warehouse::{WarehouseConfig, WarehouseSink};

use crate::domain::TickerRecord;
use thiserror::Error;

/// What a sink did with a record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The snapshot was written and now holds `rows` records.
    Written { rows: usize },
    /// Nothing to write; the destination was not touched.
    Skipped,
}

/// Sink failures. A failed load never leaves a partial snapshot behind.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("file I/O error on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("CSV encoding error: {0}")]
    Csv(#[from] csv::Error),

    #[error("warehouse connection failed: {0}")]
    Connection(String),

    #[error("warehouse query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("invalid sink configuration: {0}")]
    Config(String),
}

/// A destination that takes the whole snapshot in one call.
pub trait TickerSink: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Replace the destination's contents with `records`.
    ///
    /// An empty slice is a no-op that returns [`LoadOutcome::Skipped`].
    fn load(&self, records: &[TickerRecord]) -> Result<LoadOutcome, SinkError>;
}
