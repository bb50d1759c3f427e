//! Helpers for dynamic per-ticker tables and SQLite limits.

use gapsync_core::types::{SeriesKind, Ticker};

/// Maximum number of keys per `IN (...)` list.
///
/// SQLite has a compile-time limit on statement size and parameter count
/// (typically around 999 variables). Key lists for deletes are chunked to
/// stay safely under it.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Chunk a slice into smaller slices for batch SQLite statements.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

/// Unquoted table name for a ticker/kind pair: `AAPL_eod`, `AAPL_intra`.
///
/// The naming is a compatibility contract shared by the price store and the
/// no-data ledger. `Ticker` construction already restricts the character set
/// to `[A-Z0-9.-]`, so the name is safe once double-quoted.
pub fn table_name(ticker: &Ticker, kind: SeriesKind) -> String {
    format!("{}_{}", ticker.as_str(), kind.as_str())
}

/// Double-quoted identifier for embedding into dynamic SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name)
}
