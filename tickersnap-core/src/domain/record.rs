//! Ticker reference record as returned by the listing endpoint.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Provider fields in the order they appear in a listing response.
pub const PROVIDER_FIELDS: [&str; 12] = [
    "ticker",
    "name",
    "market",
    "locale",
    "primary_exchange",
    "type",
    "active",
    "currency_name",
    "cik",
    "composite_figi",
    "share_class_figi",
    "last_updated_utc",
];

/// Name of the capture-date field added by the normalizer.
pub const CAPTURE_DATE_FIELD: &str = "ds";

/// One ticker from the reference listing.
///
/// Only `ticker` is guaranteed; the provider omits identifiers it does not
/// have. Unrecognised fields, and known fields whose value has an
/// unexpected shape, are kept in `extra` so the record stays a faithful flat
/// mapping of what was received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerRecord {
    pub ticker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_exchange: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cik: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composite_figi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_class_figi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_utc: Option<DateTime<Utc>>,
    #[serde(rename = "ds", skip_serializing_if = "Option::is_none")]
    pub capture_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl TryFrom<Map<String, Value>> for TickerRecord {
    type Error = String;

    /// Only a missing or non-string `ticker` is rejected. Any other field
    /// that does not parse into its typed slot moves to `extra` verbatim.
    fn try_from(mut raw: Map<String, Value>) -> Result<Self, Self::Error> {
        let ticker = match raw.remove("ticker") {
            Some(Value::String(t)) if !t.is_empty() => t,
            Some(other) => return Err(format!("listing entry has unusable ticker {other}")),
            None => return Err("listing entry has no ticker".to_string()),
        };

        let mut spill = BTreeMap::new();
        let mut rec = TickerRecord::new(ticker);
        rec.name = take(&mut raw, &mut spill, "name", text);
        rec.market = take(&mut raw, &mut spill, "market", text);
        rec.locale = take(&mut raw, &mut spill, "locale", text);
        rec.primary_exchange = take(&mut raw, &mut spill, "primary_exchange", text);
        rec.asset_type = take(&mut raw, &mut spill, "type", text);
        rec.active = take(&mut raw, &mut spill, "active", Value::as_bool);
        rec.currency_name = take(&mut raw, &mut spill, "currency_name", text);
        rec.cik = take(&mut raw, &mut spill, "cik", text);
        rec.composite_figi = take(&mut raw, &mut spill, "composite_figi", text);
        rec.share_class_figi = take(&mut raw, &mut spill, "share_class_figi", text);
        rec.last_updated_utc = take(&mut raw, &mut spill, "last_updated_utc", |v| {
            v.as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc))
        });
        rec.capture_date = take(&mut raw, &mut spill, CAPTURE_DATE_FIELD, |v| {
            v.as_str()
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        });
        rec.extra = raw.into_iter().chain(spill).collect();
        Ok(rec)
    }
}

impl<'de> Deserialize<'de> for TickerRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Map<String, Value> = Map::deserialize(deserializer)?;
        TickerRecord::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// Remove `key` from `raw` and parse it. A present, non-null value that does
/// not parse is moved to `spill` unchanged.
fn take<T>(
    raw: &mut Map<String, Value>,
    spill: &mut BTreeMap<String, Value>,
    key: &str,
    parse: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    let value = raw.remove(key)?;
    if value.is_null() {
        return None;
    }
    let parsed = parse(&value);
    if parsed.is_none() {
        spill.insert(key.to_string(), value);
    }
    parsed
}

fn text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

impl TickerRecord {
    /// Minimal record with only the symbol set.
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            name: None,
            market: None,
            locale: None,
            primary_exchange: None,
            asset_type: None,
            active: None,
            currency_name: None,
            cik: None,
            composite_figi: None,
            share_class_figi: None,
            last_updated_utc: None,
            capture_date: None,
            extra: BTreeMap::new(),
        }
    }

    /// Decode one raw listing entry.
    pub fn from_json(value: Value) -> Result<Self, String> {
        match value {
            Value::Object(raw) => Self::try_from(raw),
            other => Err(format!("listing entry is not an object: {other}")),
        }
    }

    /// Keys present on this record: provider fields first, then any extra
    /// fields (sorted), then the capture date.
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = PROVIDER_FIELDS
            .iter()
            .filter(|f| self.field(f).is_some())
            .map(|f| f.to_string())
            .collect();
        names.extend(
            self.extra
                .keys()
                .filter(|k| !is_typed_field(k) && self.field(k).is_some())
                .cloned(),
        );
        if self.field(CAPTURE_DATE_FIELD).is_some() {
            names.push(CAPTURE_DATE_FIELD.to_string());
        }
        names
    }

    /// Render a single field as text, or `None` if the record lacks it.
    ///
    /// A known field that arrived in an unexpected shape renders from its
    /// raw value in `extra`.
    pub fn field(&self, name: &str) -> Option<String> {
        let typed = match name {
            "ticker" => Some(self.ticker.clone()),
            "name" => self.name.clone(),
            "market" => self.market.clone(),
            "locale" => self.locale.clone(),
            "primary_exchange" => self.primary_exchange.clone(),
            "type" => self.asset_type.clone(),
            "active" => self.active.map(|a| a.to_string()),
            "currency_name" => self.currency_name.clone(),
            "cik" => self.cik.clone(),
            "composite_figi" => self.composite_figi.clone(),
            "share_class_figi" => self.share_class_figi.clone(),
            "last_updated_utc" => self
                .last_updated_utc
                .map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            CAPTURE_DATE_FIELD => self.capture_date.map(|d| d.format("%Y-%m-%d").to_string()),
            _ => None,
        };
        typed.or_else(|| self.extra.get(name).and_then(render_json))
    }
}

fn is_typed_field(name: &str) -> bool {
    name == CAPTURE_DATE_FIELD || PROVIDER_FIELDS.contains(&name)
}

/// Flatten a JSON scalar to its text form. Null renders as absent.
fn render_json(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
