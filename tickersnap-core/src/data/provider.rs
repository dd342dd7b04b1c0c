//! Page source trait, listing page shape, and structured fetch errors.
//!
//! The PageSource trait abstracts over how a listing page is retrieved so the
//! pagination loop can be driven by the real HTTP client or by a scripted
//! source in tests.

use crate::domain::TickerRecord;
use reqwest::Url;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// One page of the ticker listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TickerPage {
    /// Absent when the provider reports a failure. Entries without a usable
    /// ticker are dropped; the rest of the page is kept.
    #[serde(default, deserialize_with = "lenient_results")]
    pub results: Option<Vec<TickerRecord>>,
    /// Continuation reference; absent on the last page.
    pub next_url: Option<String>,
    pub status: Option<String>,
    pub error: Option<String>,
    pub message: Option<String>,
    pub request_id: Option<String>,
    pub count: Option<u64>,
}

impl TickerPage {
    /// Whether the provider flagged this page as an error.
    pub fn is_error(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("ERROR"))
    }

    /// The provider's explanation for a failed page.
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "Unknown error".to_string())
    }

    /// Records on a usable page, or `None` if the page ends pagination.
    pub fn into_usable_results(self) -> Result<(Vec<TickerRecord>, Option<String>), String> {
        if self.is_error() {
            return Err(self.error_message());
        }
        let message = self.error_message();
        match self.results {
            Some(results) => Ok((results, self.next_url)),
            None => Err(message),
        }
    }
}

fn lenient_results<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<TickerRecord>>, D::Error> {
    let raw: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|entries| {
        entries
            .into_iter()
            .filter_map(|entry| match TickerRecord::from_json(entry) {
                Ok(record) => Some(record),
                Err(reason) => {
                    tracing::warn!(%reason, "skipping unusable listing entry");
                    None
                }
            })
            .collect()
    }))
}

/// Failures that abort a fetch outright.
///
/// A page the provider marks as an error is not a `FetchError`: it ends
/// pagination and the records gathered so far are kept. The fetcher treats
/// `Decode` the same way.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error requesting {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("could not decode listing page from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("invalid listing URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

/// Retrieves a single listing page from a fully-formed URL.
pub trait PageSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// GET one page. The URL already carries the credential.
    fn get_page(&self, url: &Url) -> Result<TickerPage, FetchError>;
}
