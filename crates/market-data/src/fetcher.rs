//! The fetch capability consumed by the sync engine.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::MarketDataError;
use crate::models::{Fundamentals, RawBars};

/// Provider access as seen by the sync engine.
///
/// Implementations perform the actual HTTP requests; the engine only sees
/// `Ok(bars)` or a classified error. Empty payloads on successful requests
/// must be reported as [`MarketDataError::EmptyResponse`] rather than
/// `Ok(vec![])` — "nothing because no data" is determined downstream.
#[async_trait]
pub trait MarketDataFetcher: Send + Sync {
    /// Requests daily bars for `[start, end]`, both bounds inclusive.
    async fn request_eod(
        &self,
        symbol: &str,
        exchange: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawBars, MarketDataError>;

    /// Requests 1-minute bars for `[start_ts, end_ts]` (epoch seconds).
    ///
    /// Providers cap the span of a single intraday request; callers are
    /// expected to partition longer ranges before calling.
    async fn request_intra(
        &self,
        symbol: &str,
        exchange: &str,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<RawBars, MarketDataError>;

    /// Requests the fundamentals slice (listing date) for a symbol.
    async fn request_fundamentals(
        &self,
        symbol: &str,
        exchange: &str,
    ) -> Result<Fundamentals, MarketDataError>;
}
