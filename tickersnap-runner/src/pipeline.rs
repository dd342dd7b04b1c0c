//! One snapshot run: fetch → stamp → load.
//!
//! A run never returns an error and never panics on provider or sink
//! failures. Everything that happened is folded into a [`RunReport`] so the
//! scheduler can log it and move on to the next tick.

use chrono::{DateTime, Local, NaiveDate};
use thiserror::Error;
use tickersnap_core::{
    CsvFileSink, FetchError, LoadOutcome, Normalizer, PageHalt, PageSource, PolygonClient,
    SinkError, TickerFetcher, TickerQuery, TickerSink, WarehouseSink,
};

use crate::config::{ConfigError, SinkKind, SyncConfig};

/// Errors building a pipeline from configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("fetcher setup failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("sink setup failed: {0}")]
    Sink(#[from] SinkError),
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The sink now holds `rows` records.
    Loaded { rows: usize },
    /// The fetch produced no records; the sink was left as it was.
    NothingToLoad,
    /// Transport failure; the sink was not invoked.
    FetchFailed(String),
    /// The sink rejected the snapshot; its previous contents are intact.
    SinkFailed(String),
}

/// Structured summary of a single run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub capture_date: NaiveDate,
    pub sink: String,
    pub fetched: usize,
    pub pages: usize,
    pub halted: Option<PageHalt>,
    pub outcome: RunOutcome,
}

impl RunReport {
    /// A run that loaded rows, or found a genuinely empty listing.
    ///
    /// An empty run whose very first page was refused (bad key, rate limit,
    /// unreadable body) is a failure.
    pub fn is_success(&self) -> bool {
        match self.outcome {
            RunOutcome::Loaded { .. } => true,
            RunOutcome::NothingToLoad => !self.rejected_at_first_page(),
            RunOutcome::FetchFailed(_) | RunOutcome::SinkFailed(_) => false,
        }
    }

    fn rejected_at_first_page(&self) -> bool {
        self.halted.as_ref().is_some_and(|h| h.page == 0)
    }

    /// Emit one summary event for this run.
    pub fn log(&self) {
        let elapsed_ms = (self.finished_at - self.started_at).num_milliseconds();
        let halted = self.halted.as_ref().map(|h| h.message.as_str());
        match &self.outcome {
            RunOutcome::Loaded { rows } => tracing::info!(
                sink = %self.sink,
                fetched = self.fetched,
                pages = self.pages,
                rows,
                halted,
                elapsed_ms,
                "snapshot run loaded"
            ),
            RunOutcome::NothingToLoad if self.rejected_at_first_page() => tracing::error!(
                sink = %self.sink,
                error = halted.unwrap_or_default(),
                elapsed_ms,
                "snapshot run rejected on the first page"
            ),
            RunOutcome::NothingToLoad => tracing::warn!(
                sink = %self.sink,
                pages = self.pages,
                halted,
                elapsed_ms,
                "snapshot run fetched no tickers"
            ),
            RunOutcome::FetchFailed(reason) => tracing::error!(
                sink = %self.sink,
                error = %reason,
                elapsed_ms,
                "snapshot run failed during fetch"
            ),
            RunOutcome::SinkFailed(reason) => tracing::error!(
                sink = %self.sink,
                fetched = self.fetched,
                error = %reason,
                elapsed_ms,
                "snapshot run failed during load"
            ),
        }
    }
}

/// Fetcher, normalizer, and sink wired together for repeated runs.
pub struct Pipeline {
    fetcher: TickerFetcher,
    query: TickerQuery,
    normalizer: Normalizer,
    sink: Box<dyn TickerSink>,
}

impl Pipeline {
    pub fn new(
        fetcher: TickerFetcher,
        query: TickerQuery,
        normalizer: Normalizer,
        sink: Box<dyn TickerSink>,
    ) -> Self {
        Self {
            fetcher,
            query,
            normalizer,
            sink,
        }
    }

    /// Build a pipeline that talks to the real provider.
    pub fn from_config(config: &SyncConfig) -> Result<Self, BuildError> {
        let client = PolygonClient::new()?;
        Self::with_source(config, Box::new(client))
    }

    /// Build a pipeline from config with a caller-supplied page source.
    pub fn with_source(
        config: &SyncConfig,
        source: Box<dyn PageSource>,
    ) -> Result<Self, BuildError> {
        config.validate()?;
        let fetcher = TickerFetcher::new(
            source,
            &config.api.base_url,
            config.api_key()?,
            config.api.page_delay()?,
        )?;
        let sink: Box<dyn TickerSink> = match config.sink.kind {
            SinkKind::Csv => Box::new(CsvFileSink::new(&config.sink.csv.path)),
            SinkKind::Warehouse => Box::new(WarehouseSink::new(config.sink.warehouse.clone())?),
        };
        Ok(Self::new(
            fetcher,
            config.query.clone(),
            Normalizer::new(config.normalize.capture_date),
            sink,
        ))
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    /// Run once, stamping records with today's local date.
    pub fn run(&self) -> RunReport {
        self.run_on(Local::now().date_naive())
    }

    /// Run once with an explicit capture date.
    pub fn run_on(&self, today: NaiveDate) -> RunReport {
        let started_at = Local::now();
        let mut report = RunReport {
            started_at,
            finished_at: started_at,
            capture_date: today,
            sink: self.sink.name().to_string(),
            fetched: 0,
            pages: 0,
            halted: None,
            outcome: RunOutcome::NothingToLoad,
        };

        let fetched = match self.fetcher.fetch(&self.query) {
            Ok(outcome) => outcome,
            Err(e) => {
                report.outcome = RunOutcome::FetchFailed(e.to_string());
                report.finished_at = Local::now();
                return report;
            }
        };
        report.fetched = fetched.records.len();
        report.pages = fetched.pages;
        report.halted = fetched.halted.clone();

        let records = self.normalizer.stamp(fetched, today);

        report.outcome = match self.sink.load(&records) {
            Ok(LoadOutcome::Written { rows }) => RunOutcome::Loaded { rows },
            Ok(LoadOutcome::Skipped) => RunOutcome::NothingToLoad,
            Err(e) => RunOutcome::SinkFailed(e.to_string()),
        };
        report.finished_at = Local::now();
        report
    }
}
