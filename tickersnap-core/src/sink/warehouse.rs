//! Warehouse sink: truncate-then-insert into a fixed-schema table.
//!
//! Table creation, truncation, and the batch insert share one transaction,
//! so a failure at any step rolls back to the previous snapshot. The
//! connection lives only for the duration of a single load.

use super::{LoadOutcome, SinkError, TickerSink};
use crate::domain::TickerRecord;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{Bool, Date, Nullable, Text, Timestamp};
use diesel::sqlite::{Sqlite, SqliteConnection};
use serde::{Deserialize, Serialize};

/// Columns of the snapshot table, in insert order.
pub const WAREHOUSE_COLUMNS: [(&str, &str); 13] = [
    ("ticker", "TEXT NOT NULL"),
    ("name", "TEXT"),
    ("market", "TEXT"),
    ("locale", "TEXT"),
    ("primary_exchange", "TEXT"),
    ("type", "TEXT"),
    ("active", "BOOLEAN"),
    ("currency_name", "TEXT"),
    ("cik", "TEXT"),
    ("composite_figi", "TEXT"),
    ("share_class_figi", "TEXT"),
    ("last_updated_utc", "TIMESTAMP"),
    ("ds", "DATE"),
];

/// Rows per INSERT statement. 13 binds per row keeps each statement under
/// SQLite's 999-parameter floor.
pub const INSERT_CHUNK_ROWS: usize = 64;

/// Connection identity and target table for the warehouse sink.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Database location. Defaults to `<database>.sqlite3`.
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub account: Option<String>,
    pub warehouse: Option<String>,
    pub database: String,
    pub schema: String,
    pub table: String,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            url: None,
            user: None,
            password: None,
            account: None,
            warehouse: None,
            database: "stocks".into(),
            schema: "main".into(),
            table: "stock_tickers".into(),
        }
    }
}

impl std::fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("account", &self.account)
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("table", &self.table)
            .finish()
    }
}

impl WarehouseConfig {
    pub fn connection_url(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| format!("{}.sqlite3", self.database))
    }

    /// `"schema"."table"`, quoted for SQL.
    pub fn qualified_table(&self) -> String {
        format!("\"{}\".\"{}\"", self.schema, self.table)
    }

    /// Reject identifiers that cannot be safely interpolated into SQL.
    pub fn validate(&self) -> Result<(), SinkError> {
        for (what, ident) in [
            ("database", &self.database),
            ("schema", &self.schema),
            ("table", &self.table),
        ] {
            if !is_identifier(ident) {
                return Err(SinkError::Config(format!(
                    "warehouse {what} name '{ident}' must match [A-Za-z_][A-Za-z0-9_]*"
                )));
            }
        }
        Ok(())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub struct WarehouseSink {
    config: WarehouseConfig,
}

impl WarehouseSink {
    pub fn new(config: WarehouseConfig) -> Result<Self, SinkError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    fn connect(&self) -> Result<SqliteConnection, SinkError> {
        let url = self.config.connection_url();
        SqliteConnection::establish(&url).map_err(|e| SinkError::Connection(e.to_string()))
    }

    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = WAREHOUSE_COLUMNS
            .iter()
            .map(|(name, ty)| format!("\"{name}\" {ty}"))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.config.qualified_table(),
            columns.join(", ")
        )
    }

    /// Multi-row INSERT with placeholders for `rows` records.
    pub fn insert_sql(&self, rows: usize) -> String {
        let names: Vec<String> = WAREHOUSE_COLUMNS
            .iter()
            .map(|(name, _)| format!("\"{name}\""))
            .collect();
        let row = format!("({})", vec!["?"; WAREHOUSE_COLUMNS.len()].join(", "));
        format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.config.qualified_table(),
            names.join(", "),
            vec![row; rows].join(", ")
        )
    }

    fn replace_snapshot(
        &self,
        conn: &mut SqliteConnection,
        records: &[TickerRecord],
    ) -> Result<usize, SinkError> {
        conn.transaction::<usize, SinkError, _>(|conn| {
            sql_query(self.create_table_sql()).execute(conn)?;
            sql_query(format!("DELETE FROM {}", self.config.qualified_table())).execute(conn)?;

            for chunk in records.chunks(INSERT_CHUNK_ROWS) {
                let mut insert = sql_query(self.insert_sql(chunk.len())).into_boxed::<Sqlite>();
                for r in chunk {
                    // Text columns fall back to the raw provider value when
                    // it did not fit the typed field.
                    insert = insert
                        .bind::<Text, _>(r.ticker.clone())
                        .bind::<Nullable<Text>, _>(r.field("name"))
                        .bind::<Nullable<Text>, _>(r.field("market"))
                        .bind::<Nullable<Text>, _>(r.field("locale"))
                        .bind::<Nullable<Text>, _>(r.field("primary_exchange"))
                        .bind::<Nullable<Text>, _>(r.field("type"))
                        .bind::<Nullable<Bool>, _>(r.active)
                        .bind::<Nullable<Text>, _>(r.field("currency_name"))
                        .bind::<Nullable<Text>, _>(r.field("cik"))
                        .bind::<Nullable<Text>, _>(r.field("composite_figi"))
                        .bind::<Nullable<Text>, _>(r.field("share_class_figi"))
                        .bind::<Nullable<Timestamp>, _>(r.last_updated_utc.map(|t| t.naive_utc()))
                        .bind::<Nullable<Date>, _>(r.capture_date);
                }
                insert.execute(conn)?;
            }
            Ok(records.len())
        })
    }
}

impl TickerSink for WarehouseSink {
    fn name(&self) -> &str {
        "warehouse"
    }

    fn load(&self, records: &[TickerRecord]) -> Result<LoadOutcome, SinkError> {
        let table = self.config.qualified_table();
        if records.is_empty() {
            tracing::info!(%table, "no tickers retrieved; warehouse table left unchanged");
            return Ok(LoadOutcome::Skipped);
        }

        let span = tracing::info_span!(
            "warehouse_load",
            %table,
            user = self.config.user.as_deref().unwrap_or(""),
            account = self.config.account.as_deref().unwrap_or(""),
            warehouse = self.config.warehouse.as_deref().unwrap_or(""),
        );
        let _guard = span.enter();

        let mut conn = match self.connect() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!(error = %e, "warehouse connection failed; load aborted");
                return Err(e);
            }
        };

        match self.replace_snapshot(&mut conn, records) {
            Ok(rows) => {
                tracing::info!(rows, "warehouse snapshot replaced");
                Ok(LoadOutcome::Written { rows })
            }
            Err(e) => {
                tracing::error!(error = %e, "warehouse load failed; transaction rolled back");
                Err(e)
            }
        }
    }
}
