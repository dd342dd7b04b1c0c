//! Capture-date stamping.

use crate::data::FetchOutcome;
use crate::domain::TickerRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which fetched records receive the capture date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureDatePolicy {
    /// Every record is stamped.
    #[default]
    AllPages,
    /// Only records from continuation pages; the initial page is left bare.
    ContinuationPagesOnly,
}

/// Attaches the capture date to fetched records.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    policy: CaptureDatePolicy,
}

impl Normalizer {
    pub fn new(policy: CaptureDatePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> CaptureDatePolicy {
        self.policy
    }

    /// Consume a fetch outcome and return its records stamped with `today`.
    pub fn stamp(&self, outcome: FetchOutcome, today: NaiveDate) -> Vec<TickerRecord> {
        let skip = match self.policy {
            CaptureDatePolicy::AllPages => 0,
            CaptureDatePolicy::ContinuationPagesOnly => outcome.first_page_len,
        };
        let mut records = outcome.records;
        for record in records.iter_mut().skip(skip) {
            record.capture_date = Some(today);
        }
        records
    }
}
