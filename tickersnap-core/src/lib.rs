//! Tickersnap Core — ticker listing fetch, normalization, and sinks.
//!
//! This crate contains the pieces of one snapshot run:
//! - Domain types (ticker records, the listing query)
//! - Page sources and the pagination loop that follows `next_url`
//! - Capture-date stamping
//! - CSV file and warehouse sinks with full-replace semantics

pub mod data;
pub mod domain;
pub mod normalize;
pub mod sink;

pub use data::{FetchError, FetchOutcome, PageHalt, PageSource, PolygonClient, TickerFetcher, TickerPage};
pub use domain::{SortOrder, TickerQuery, TickerRecord};
pub use normalize::{CaptureDatePolicy, Normalizer};
pub use sink::{CsvFileSink, LoadOutcome, SinkError, TickerSink, WarehouseConfig, WarehouseSink};

/// URL type used by page sources.
pub use reqwest::Url;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: pipeline parts can move to a worker thread.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<TickerRecord>();
        require_sync::<TickerRecord>();
        require_send::<TickerFetcher>();
        require_sync::<TickerFetcher>();
        require_send::<CsvFileSink>();
        require_sync::<WarehouseSink>();
    }
}
