//! SQLite-backed price store.
//!
//! One table pair per ticker (`{ticker}_eod`, `{ticker}_intra`), provisioned
//! on first touch. Upserts are insert-or-replace on the natural key and run
//! inside a single transaction per batch. Before a batch commits, the same
//! keys are reconciled out of the no-data ledger so a key never survives a
//! commit boundary in both stores; a crash between the two steps leaves the
//! key in neither, which the next run repairs by re-fetching.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Nullable, Text};

use gapsync_core::errors::{Error, Result};
use gapsync_core::store::{NoDataLedger, PriceStore};
use gapsync_core::types::{EodRow, IntraRow, SeriesKind, Ticker};

use crate::db::{get_connection, table_exists, DbPool};
use crate::errors::{IntoCore, StorageError};
use crate::utils::{quote_ident, table_name};

#[derive(QueryableByName)]
struct TradeDateRow {
    #[diesel(sql_type = Text)]
    trade_date: String,
}

#[derive(QueryableByName)]
struct TradeTimestampRow {
    #[diesel(sql_type = BigInt)]
    trade_timestamp: i64,
}

/// Price store over a SQLite file, wired to the ledger it reconciles against.
pub struct SqlitePriceRepository<N: NoDataLedger> {
    pool: Arc<DbPool>,
    ledger: Arc<N>,
}

impl<N: NoDataLedger> SqlitePriceRepository<N> {
    pub fn new(pool: Arc<DbPool>, ledger: Arc<N>) -> Self {
        Self { pool, ledger }
    }

    fn ddl_for(kind: SeriesKind, table: &str) -> String {
        match kind {
            SeriesKind::Eod => format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 trade_date TEXT NOT NULL UNIQUE, \
                 open REAL NOT NULL, \
                 high REAL NOT NULL, \
                 low REAL NOT NULL, \
                 close REAL NOT NULL, \
                 adj_close REAL NOT NULL, \
                 volume BIGINT NOT NULL)",
                quote_ident(table)
            ),
            SeriesKind::Intra => format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 trade_timestamp INTEGER NOT NULL UNIQUE, \
                 open REAL NOT NULL, \
                 high REAL NOT NULL, \
                 low REAL NOT NULL, \
                 close REAL NOT NULL, \
                 volume BIGINT)",
                quote_ident(table)
            ),
        }
    }
}

#[async_trait]
impl<N: NoDataLedger> PriceStore for SqlitePriceRepository<N> {
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

    async fn existing_keys(
        &self,
        ticker: &Ticker,
        start_date: NaiveDate,
        end_date: NaiveDate,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<(Vec<NaiveDate>, Vec<i64>)> {
        let mut conn = get_connection(&self.pool)?;

        let eod_table = table_name(ticker, SeriesKind::Eod);
        let dates = if table_exists(&mut conn, &eod_table)? {
            let rows: Vec<TradeDateRow> = diesel::sql_query(format!(
                "SELECT trade_date FROM {} \
                 WHERE trade_date >= ? AND trade_date <= ? \
                 ORDER BY trade_date",
                quote_ident(&eod_table)
            ))
            .bind::<Text, _>(start_date.format("%Y-%m-%d").to_string())
            .bind::<Text, _>(end_date.format("%Y-%m-%d").to_string())
            .load(&mut conn)
            .map_err(|e| e.into_core())?;
            rows.into_iter()
                .map(|r| {
                    NaiveDate::parse_from_str(&r.trade_date, "%Y-%m-%d").map_err(|e| {
                        Error::Validation(format!(
                            "stored key '{}' is not a date: {}",
                            r.trade_date, e
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        let intra_table = table_name(ticker, SeriesKind::Intra);
        let timestamps = if table_exists(&mut conn, &intra_table)? {
            let rows: Vec<TradeTimestampRow> = diesel::sql_query(format!(
                "SELECT trade_timestamp FROM {} \
                 WHERE trade_timestamp >= ? AND trade_timestamp <= ? \
                 ORDER BY trade_timestamp",
                quote_ident(&intra_table)
            ))
            .bind::<BigInt, _>(start_ts)
            .bind::<BigInt, _>(end_ts)
            .load(&mut conn)
            .map_err(|e| e.into_core())?;
            rows.into_iter().map(|r| r.trade_timestamp).collect()
        } else {
            Vec::new()
        };

        Ok((dates, timestamps))
    }

    async fn upsert_eod(&self, ticker: &Ticker, rows: &[EodRow]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        // Ledger first: if we crash after this, the keys sit in neither
        // store and are simply re-fetched next run.
        let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        self.ledger.reconcile(ticker, &dates, &[]).await?;

        let sql = format!(
            "INSERT OR REPLACE INTO {} \
             (trade_date, open, high, low, close, adj_close, volume) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            quote_ident(&table_name(ticker, SeriesKind::Eod))
        );

        let mut conn = get_connection(&self.pool)?;
        conn.transaction::<usize, StorageError, _>(|conn| {
            let mut written = 0;
            for row in rows {
                written += diesel::sql_query(&sql)
                    .bind::<Text, _>(row.date.format("%Y-%m-%d").to_string())
                    .bind::<Double, _>(row.open)
                    .bind::<Double, _>(row.high)
                    .bind::<Double, _>(row.low)
                    .bind::<Double, _>(row.close)
                    .bind::<Double, _>(row.adj_close)
                    .bind::<BigInt, _>(row.volume)
                    .execute(conn)?;
            }
            Ok(written)
        })
        .map_err(Error::from)
    }

    async fn upsert_intra(&self, ticker: &Ticker, rows: &[IntraRow]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let timestamps: Vec<i64> = rows.iter().map(|r| r.timestamp).collect();
        self.ledger.reconcile(ticker, &[], &timestamps).await?;

        let sql = format!(
            "INSERT OR REPLACE INTO {} \
             (trade_timestamp, open, high, low, close, volume) \
             VALUES (?, ?, ?, ?, ?, ?)",
            quote_ident(&table_name(ticker, SeriesKind::Intra))
        );

        let mut conn = get_connection(&self.pool)?;
        conn.transaction::<usize, StorageError, _>(|conn| {
            let mut written = 0;
            for row in rows {
                written += diesel::sql_query(&sql)
                    .bind::<BigInt, _>(row.timestamp)
                    .bind::<Double, _>(row.open)
                    .bind::<Double, _>(row.high)
                    .bind::<Double, _>(row.low)
                    .bind::<Double, _>(row.close)
                    .bind::<Nullable<BigInt>, _>(row.volume)
                    .execute(conn)?;
            }
            Ok(written)
        })
        .map_err(Error::from)
    }
}
