//! SQLite-backed no-data ledger.
//!
//! The ledger lives in its own database file and mirrors the price store's
//! per-ticker table names, but each table carries only the key column:
//! `date_day` (TEXT, `YYYY-MM-DD`) for EOD slots and `date_time` (INTEGER,
//! epoch seconds) for intraday slots. A present key means the provider was
//! asked and confirmed nothing exists there.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};

use gapsync_core::errors::{Error, Result};
use gapsync_core::store::NoDataLedger;
use gapsync_core::types::{SeriesKind, Ticker};

use crate::db::{get_connection, table_exists, DbPool};
use crate::errors::{IntoCore, StorageError};
use crate::utils::{chunk_for_sqlite, quote_ident, table_name};

/// Smallest timestamp accepted as plausible epoch seconds (ten digits,
/// i.e. dates from 2001-09-09 onward).
const MIN_EPOCH_SECONDS: i64 = 1_000_000_000;

#[derive(QueryableByName)]
struct DateKeyRow {
    #[diesel(sql_type = Text)]
    date_day: String,
}

#[derive(QueryableByName)]
struct TsKeyRow {
    #[diesel(sql_type = BigInt)]
    date_time: i64,
}

/// No-data ledger over a dedicated SQLite file.
pub struct SqliteNoDataRepository {
    pool: Arc<DbPool>,
}

impl SqliteNoDataRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    fn ddl_for(kind: SeriesKind, table: &str) -> String {
        match kind {
            SeriesKind::Eod => format!(
                "CREATE TABLE IF NOT EXISTS {} (date_day TEXT NOT NULL UNIQUE)",
                quote_ident(table)
            ),
            SeriesKind::Intra => format!(
                "CREATE TABLE IF NOT EXISTS {} (date_time INTEGER NOT NULL UNIQUE)",
                quote_ident(table)
            ),
        }
    }

    fn validate_keys(dates: &[NaiveDate], timestamps: &[i64]) -> Result<()> {
        for date in dates {
            // Years outside four digits would not render as YYYY-MM-DD and
            // would corrupt the ledger's key format.
            if !(1000..=9999).contains(&date.year()) {
                return Err(Error::Validation(format!(
                    "no-data date '{}' is not a valid YYYY-MM-DD key",
                    date
                )));
            }
        }
        for ts in timestamps {
            if *ts < MIN_EPOCH_SECONDS {
                return Err(Error::Validation(format!(
                    "no-data timestamp {} is not plausible epoch seconds",
                    ts
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl NoDataLedger for SqliteNoDataRepository {
    async fn ensure_schema(&self, ticker: &Ticker) -> Result<Vec<SeriesKind>> {
        let mut conn = get_connection(&self.pool)?;
        let mut created = Vec::new();
        for kind in SeriesKind::ALL {
            let table = table_name(ticker, kind);
            if table_exists(&mut conn, &table)? {
                continue;
            }
            diesel::sql_query(Self::ddl_for(kind, &table))
                .execute(&mut conn)
                .map_err(|e| e.into_core())?;
            created.push(kind);
        }
        Ok(created)
    }

    async fn existing_keys(&self, ticker: &Ticker) -> Result<(Vec<NaiveDate>, Vec<i64>)> {
        let mut conn = get_connection(&self.pool)?;

        let eod_table = table_name(ticker, SeriesKind::Eod);
        let dates = if table_exists(&mut conn, &eod_table)? {
            let rows: Vec<DateKeyRow> = diesel::sql_query(format!(
                "SELECT date_day FROM {} ORDER BY date_day",
                quote_ident(&eod_table)
            ))
            .load(&mut conn)
            .map_err(|e| e.into_core())?;
            rows.into_iter()
                .map(|r| {
                    NaiveDate::parse_from_str(&r.date_day, "%Y-%m-%d").map_err(|e| {
                        Error::Validation(format!(
                            "ledger key '{}' is not a date: {}",
                            r.date_day, e
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let intra_table = table_name(ticker, SeriesKind::Intra);
        let timestamps = if table_exists(&mut conn, &intra_table)? {
            let rows: Vec<TsKeyRow> = diesel::sql_query(format!(
                "SELECT date_time FROM {} ORDER BY date_time",
                quote_ident(&intra_table)
            ))
            .load(&mut conn)
            .map_err(|e| e.into_core())?;
            rows.into_iter().map(|r| r.date_time).collect()
        } else {
            Vec::new()
        };

        Ok((dates, timestamps))
    }

    async fn record(&self, ticker: &Ticker, dates: &[NaiveDate], timestamps: &[i64]) -> Result<()> {
        if dates.is_empty() && timestamps.is_empty() {
            return Ok(());
        }
        Self::validate_keys(dates, timestamps)?;

        let mut conn = get_connection(&self.pool)?;
        let eod_sql = format!(
            "INSERT OR REPLACE INTO {} (date_day) VALUES (?)",
            quote_ident(&table_name(ticker, SeriesKind::Eod))
        );
        let intra_sql = format!(
            "INSERT OR REPLACE INTO {} (date_time) VALUES (?)",
            quote_ident(&table_name(ticker, SeriesKind::Intra))
        );

        conn.transaction::<(), StorageError, _>(|conn| {
            for date in dates {
                diesel::sql_query(&eod_sql)
                    .bind::<Text, _>(date.format("%Y-%m-%d").to_string())
                    .execute(conn)?;
            }
            for ts in timestamps {
                diesel::sql_query(&intra_sql)
                    .bind::<BigInt, _>(*ts)
                    .execute(conn)?;
            }
            Ok(())
        })
        .map_err(Error::from)
    }

    async fn reconcile(
        &self,
        ticker: &Ticker,
        satisfied_dates: &[NaiveDate],
        satisfied_timestamps: &[i64],
    ) -> Result<()> {
        if satisfied_dates.is_empty() && satisfied_timestamps.is_empty() {
            return Ok(());
        }

        let mut conn = get_connection(&self.pool)?;

        let eod_table = table_name(ticker, SeriesKind::Eod);
        if !satisfied_dates.is_empty() && table_exists(&mut conn, &eod_table)? {
            for chunk in chunk_for_sqlite(satisfied_dates) {
                // Keys are NaiveDate-rendered, so the literal list is safe.
                let list = chunk
                    .iter()
                    .map(|d| format!("'{}'", d.format("%Y-%m-%d")))
                    .collect::<Vec<_>>()
                    .join(",");
                diesel::sql_query(format!(
                    "DELETE FROM {} WHERE date_day IN ({})",
                    quote_ident(&eod_table),
                    list
                ))
                .execute(&mut conn)
                .map_err(|e| e.into_core())?;
            }
        }

        let intra_table = table_name(ticker, SeriesKind::Intra);
        if !satisfied_timestamps.is_empty() && table_exists(&mut conn, &intra_table)? {
            for chunk in chunk_for_sqlite(satisfied_timestamps) {
                let list = chunk
                    .iter()
                    .map(|ts| ts.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                diesel::sql_query(format!(
                    "DELETE FROM {} WHERE date_time IN ({})",
                    quote_ident(&intra_table),
                    list
                ))
                .execute(&mut conn)
                .map_err(|e| e.into_core())?;
            }
        }

        Ok(())
    }
}
