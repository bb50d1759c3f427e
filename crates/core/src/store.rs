//! Storage traits for price data and the no-data ledger.
//!
//! These traits abstract the persistence layer; the `storage-sqlite` crate
//! provides the shipped implementations. Table naming is part of the
//! contract: price tables are `{ticker}_eod` / `{ticker}_intra`, and the
//! ledger mirrors the same names in its own store.
//!
//! # Dual-store consistency
//!
//! `PriceStore::upsert_*` must remove any ledger record sharing an upserted
//! key before its own commit, so a key never survives a commit boundary in
//! both stores.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::Result;
use crate::types::{EodRow, IntraRow, SeriesKind, Ticker};

// =============================================================================
// Price Store
// =============================================================================

/// Storage interface for per-ticker OHLCV rows.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Creates the per-ticker tables that do not exist yet.
    ///
    /// Idempotent. Returns only the kinds whose table was newly created by
    /// this call, so the caller can seed the no-data ledger for the same
    /// ticker.
    async fn ensure_schema(&self, ticker: &Ticker) -> Result<Vec<SeriesKind>>;

    /// Currently stored keys within the given bounds, both axes, all bounds
    /// inclusive.
    async fn existing_keys(
        &self,
        ticker: &Ticker,
        start_date: NaiveDate,
        end_date: NaiveDate,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<(Vec<NaiveDate>, Vec<i64>)>;

    /// Upserts EOD rows by trading date, insert-or-replace.
    ///
    /// The whole batch commits atomically (all rows or none) and removes
    /// matching date keys from the no-data ledger before committing.
    /// Returns the number of rows written.
    async fn upsert_eod(&self, ticker: &Ticker, rows: &[EodRow]) -> Result<usize>;

    /// Upserts intraday rows by epoch-second timestamp; same contract as
    /// [`upsert_eod`](Self::upsert_eod).
    async fn upsert_intra(&self, ticker: &Ticker, rows: &[IntraRow]) -> Result<usize>;
}

// =============================================================================
// No-Data Ledger
// =============================================================================

/// Storage interface for confirmed-absent slots.
///
/// Mirrors the price store's per-ticker/per-kind table structure but stores
/// only the key column, no payload. A recorded key means "checked, the
/// provider confirmed nothing exists here" — it is never re-requested.
#[async_trait]
pub trait NoDataLedger: Send + Sync {
    /// Same idempotent contract as [`PriceStore::ensure_schema`].
    async fn ensure_schema(&self, ticker: &Ticker) -> Result<Vec<SeriesKind>>;

    /// All recorded keys for the ticker, both axes.
    ///
    /// Unbounded read: the per-ticker ledger is small enough that no range
    /// filter is offered.
    async fn existing_keys(&self, ticker: &Ticker) -> Result<(Vec<NaiveDate>, Vec<i64>)>;

    /// Records confirmed-absent keys, insert-or-replace.
    ///
    /// Validates before insert: rendered dates must be `YYYY-MM-DD` and
    /// timestamps must be plausible epoch seconds (at least ten digits). Any
    /// malformed entry fails the whole call with a validation error and
    /// nothing is committed.
    async fn record(&self, ticker: &Ticker, dates: &[NaiveDate], timestamps: &[i64]) -> Result<()>;

    /// Deletes exactly the given keys. No-op success on empty input.
    ///
    /// Called by the price store's upsert hook when real data arrives for a
    /// previously-absent slot.
    async fn reconcile(
        &self,
        ticker: &Ticker,
        satisfied_dates: &[NaiveDate],
        satisfied_timestamps: &[i64],
    ) -> Result<()>;
}
