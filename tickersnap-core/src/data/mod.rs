//! Listing retrieval: page sources, the Polygon client, and pagination.

pub mod fetch;
pub mod polygon;
pub mod provider;

pub use fetch::{FetchOutcome, PageHalt, TickerFetcher};
pub use polygon::{PolygonClient, DEFAULT_BASE_URL};
pub use provider::{FetchError, PageSource, TickerPage};
