//! Polygon.io reference-data client.
//!
//! Fetches pages of `/v3/reference/tickers`. Failures are reported in the
//! JSON body (`status: "ERROR"`) alongside a non-2xx status, so the body is
//! decoded regardless of the HTTP status code.

use super::provider::{FetchError, PageSource, TickerPage};
use reqwest::Url;

/// Public API host.
pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";

/// Path of the ticker listing endpoint.
pub const TICKERS_PATH: &str = "/v3/reference/tickers";

/// Blocking HTTP page source backed by `reqwest`.
pub struct PolygonClient {
    client: reqwest::blocking::Client,
}

impl PolygonClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("tickersnap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl PageSource for PolygonClient {
    fn name(&self) -> &str {
        "polygon"
    }

    fn get_page(&self, url: &Url) -> Result<TickerPage, FetchError> {
        // Never echo the credential into errors or logs.
        let shown = redact_api_key(url);

        let resp = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| FetchError::Transport {
                url: shown.clone(),
                reason: e.without_url().to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            tracing::debug!(%status, url = %shown, "listing request returned non-success status");
        }

        resp.json::<TickerPage>().map_err(|e| FetchError::Decode {
            url: shown,
            reason: format!("HTTP {status}: {}", e.without_url()),
        })
    }
}

/// Copy of `url` with any `apiKey` query value masked.
pub fn redact_api_key(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == "apiKey") {
        return url.to_string();
    }
    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "apiKey" { "REDACTED".into() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}
