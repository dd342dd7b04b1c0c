//! Domain types: ticker records and the listing query.

pub mod query;
pub mod record;

pub use query::{SortOrder, TickerQuery, MAX_PAGE_LIMIT};
pub use record::{TickerRecord, CAPTURE_DATE_FIELD, PROVIDER_FIELDS};
