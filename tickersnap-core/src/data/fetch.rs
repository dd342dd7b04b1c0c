//! Pagination loop: follow `next_url` until the listing is exhausted.

use super::polygon::{redact_api_key, TICKERS_PATH};
use super::provider::{FetchError, PageSource};
use crate::domain::{TickerQuery, TickerRecord};
use reqwest::Url;
use std::time::Duration;

/// Where pagination stopped early, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHalt {
    /// Zero-based index of the page that failed.
    pub page: usize,
    pub message: String,
}

/// Everything gathered by one fetch.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Records in the order the provider returned them.
    pub records: Vec<TickerRecord>,
    /// Pages that contributed records.
    pub pages: usize,
    /// How many of `records` came from the initial page.
    pub first_page_len: usize,
    /// Set when a page reported an error and the remaining pages were skipped.
    pub halted: Option<PageHalt>,
}

impl FetchOutcome {
    pub fn is_complete(&self) -> bool {
        self.halted.is_none()
    }
}

/// Drives a [`PageSource`] through every page of a listing query.
pub struct TickerFetcher {
    source: Box<dyn PageSource>,
    base_url: Url,
    api_key: String,
    page_delay: Duration,
}

impl TickerFetcher {
    pub fn new(
        source: Box<dyn PageSource>,
        base_url: &str,
        api_key: impl Into<String>,
        page_delay: Duration,
    ) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url).map_err(|e| FetchError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            source,
            base_url,
            api_key: api_key.into(),
            page_delay,
        })
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// URL of the first listing page, credential included.
    pub fn initial_url(&self, query: &TickerQuery) -> Result<Url, FetchError> {
        let mut url = self.base_url.join(TICKERS_PATH).map_err(|e| FetchError::InvalidUrl {
            url: self.base_url.to_string(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut()
            .extend_pairs(query.query_pairs())
            .append_pair("apiKey", &self.api_key);
        Ok(url)
    }

    /// The continuation cursor with the credential appended.
    pub fn continuation_url(&self, next_url: &str) -> Result<Url, FetchError> {
        let mut url = Url::parse(next_url).map_err(|e| FetchError::InvalidUrl {
            url: next_url.to_string(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut().append_pair("apiKey", &self.api_key);
        Ok(url)
    }

    /// Fetch every page matching `query`.
    ///
    /// A page that reports an error, carries no `results`, or cannot be
    /// decoded ends the loop and the records already gathered are returned.
    /// Transport failures abort the fetch with an error.
    pub fn fetch(&self, query: &TickerQuery) -> Result<FetchOutcome, FetchError> {
        let mut outcome = FetchOutcome {
            records: Vec::new(),
            pages: 0,
            first_page_len: 0,
            halted: None,
        };

        let mut url = self.initial_url(query)?;
        tracing::info!(
            source = self.source.name(),
            url = %redact_api_key(&url),
            "requesting ticker listing"
        );

        loop {
            let page_index = outcome.pages;
            let usable = match self.source.get_page(&url) {
                Ok(page) => page.into_usable_results(),
                Err(FetchError::Decode { reason, .. }) => Err(format!("undecodable page: {reason}")),
                Err(e) => return Err(e),
            };

            let next_url = match usable {
                Ok((results, next_url)) => {
                    if page_index == 0 {
                        outcome.first_page_len = results.len();
                    }
                    outcome.records.extend(results);
                    outcome.pages += 1;
                    next_url
                }
                Err(message) => {
                    if page_index == 0 {
                        tracing::warn!(error = %message, "error retrieving initial data");
                    } else {
                        tracing::warn!(page = page_index, error = %message, "error retrieving next page");
                    }
                    outcome.halted = Some(PageHalt {
                        page: page_index,
                        message,
                    });
                    break;
                }
            };

            let Some(next_url) = next_url else {
                break;
            };

            if !self.page_delay.is_zero() {
                std::thread::sleep(self.page_delay);
            }
            tracing::info!(next_url = %next_url, "requesting next page");
            url = self.continuation_url(&next_url)?;
        }

        tracing::info!(
            records = outcome.records.len(),
            pages = outcome.pages,
            complete = outcome.is_complete(),
            "ticker listing fetched"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::TickerPage;
    use std::sync::Mutex;

    /// Serves pages in order and remembers the URLs it was asked for.
    struct Scripted {
        pages: Mutex<Vec<TickerPage>>,
        seen: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(mut pages: Vec<TickerPage>) -> Self {
            pages.reverse();
            Self {
                pages: Mutex::new(pages),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl PageSource for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn get_page(&self, url: &Url) -> Result<TickerPage, FetchError> {
            self.seen.lock().unwrap().push(url.to_string());
            self.pages
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| FetchError::Transport {
                    url: url.to_string(),
                    reason: "script exhausted".into(),
                })
        }
    }

    fn fetcher(source: Scripted) -> TickerFetcher {
        TickerFetcher::new(
            Box::new(source),
            "https://api.example.test",
            "k3y",
            Duration::ZERO,
        )
        .unwrap()
    }

    #[test]
    fn initial_url_carries_query_and_key() {
        let f = fetcher(Scripted::new(vec![]));
        let url = f.initial_url(&TickerQuery::default()).unwrap();
        assert_eq!(url.path(), "/v3/reference/tickers");
        let q = url.query().unwrap();
        assert!(q.contains("market=stocks"));
        assert!(q.contains("active=true"));
        assert!(q.contains("limit=1000"));
        assert!(q.contains("sort=ticker"));
        assert!(q.contains("order=asc"));
        assert!(q.ends_with("apiKey=k3y"));
    }

    #[test]
    fn continuation_url_appends_key_to_cursor() {
        let f = fetcher(Scripted::new(vec![]));
        let url = f
            .continuation_url("https://api.example.test/v3/reference/tickers?cursor=YWJj")
            .unwrap();
        assert_eq!(url.query(), Some("cursor=YWJj&apiKey=k3y"));
    }

    #[test]
    fn initial_error_page_yields_nothing() {
        let page = TickerPage {
            status: Some("ERROR".into()),
            error: Some("Unknown API Key".into()),
            next_url: Some("https://api.example.test/next".into()),
            ..Default::default()
        };
        let outcome = fetcher(Scripted::new(vec![page]))
            .fetch(&TickerQuery::default())
            .unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(
            outcome.halted,
            Some(PageHalt {
                page: 0,
                message: "Unknown API Key".into()
            })
        );
    }

    #[test]
    fn undecodable_later_page_keeps_earlier_records() {
        struct Garbled(Mutex<usize>);
        impl PageSource for Garbled {
            fn name(&self) -> &str {
                "garbled"
            }
            fn get_page(&self, url: &Url) -> Result<TickerPage, FetchError> {
                let mut calls = self.0.lock().unwrap();
                *calls += 1;
                if *calls == 1 {
                    Ok(TickerPage {
                        status: Some("OK".into()),
                        results: Some(vec![TickerRecord::new("A"), TickerRecord::new("B")]),
                        next_url: Some("https://api.example.test/next".into()),
                        ..Default::default()
                    })
                } else {
                    Err(FetchError::Decode {
                        url: url.to_string(),
                        reason: "HTTP 502 Bad Gateway: expected value".into(),
                    })
                }
            }
        }

        let f = TickerFetcher::new(
            Box::new(Garbled(Mutex::new(0))),
            "https://api.example.test",
            "k3y",
            Duration::ZERO,
        )
        .unwrap();
        let outcome = f.fetch(&TickerQuery::default()).unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.pages, 1);
        let halt = outcome.halted.unwrap();
        assert_eq!(halt.page, 1);
        assert!(halt.message.contains("502"));
    }

    #[test]
    fn invalid_next_url_is_an_error() {
        let page = TickerPage {
            status: Some("OK".into()),
            results: Some(vec![TickerRecord::new("A")]),
            next_url: Some("not a url".into()),
            ..Default::default()
        };
        let err = fetcher(Scripted::new(vec![page]))
            .fetch(&TickerQuery::default())
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }
}
