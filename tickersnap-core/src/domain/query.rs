//! Base query for the ticker listing endpoint.

use serde::{Deserialize, Serialize};

/// Largest page size the listing endpoint accepts.
pub const MAX_PAGE_LIMIT: u32 = 1000;

/// Sort direction for the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Filters and paging applied to the first listing request.
///
/// Continuation pages inherit these from the server-supplied cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerQuery {
    pub market: String,
    pub active: bool,
    pub limit: u32,
    pub sort: String,
    pub order: SortOrder,
}

impl Default for TickerQuery {
    fn default() -> Self {
        Self {
            market: "stocks".into(),
            active: true,
            limit: MAX_PAGE_LIMIT,
            sort: "ticker".into(),
            order: SortOrder::Asc,
        }
    }
}

impl TickerQuery {
    /// Query pairs in the order the provider documents them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("market", self.market.clone()),
            ("active", self.active.to_string()),
            ("order", self.order.as_str().to_string()),
            ("limit", self.limit.to_string()),
            ("sort", self.sort.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_active_stocks_by_ticker() {
        let q = TickerQuery::default();
        let pairs = q.query_pairs();
        assert!(pairs.contains(&("market", "stocks".to_string())));
        assert!(pairs.contains(&("active", "true".to_string())));
        assert!(pairs.contains(&("limit", "1000".to_string())));
        assert!(pairs.contains(&("sort", "ticker".to_string())));
        assert!(pairs.contains(&("order", "asc".to_string())));
    }
}
