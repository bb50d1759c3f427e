//! Strong types for the sync engine.
//!
//! These types enforce clear boundaries and prevent mixing of concepts:
//! - `Ticker` - validated symbol, doubles as the per-ticker table partition key
//! - `SeriesKind` - EOD vs intraday series
//! - `EodRow` / `IntraRow` - normalized price rows keyed by their natural key

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::Error;

// =============================================================================
// Ticker
// =============================================================================

/// Validated ticker symbol.
///
/// Examples: "AAPL", "BRK.A", "SPY-W"
///
/// The symbol is embedded into per-ticker table names (`{ticker}_eod`), so
/// construction enforces the safe character set `[A-Z0-9.-]` and uppercases
/// the input. A ticker is never mutated, only referenced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    /// Parses and validates a ticker symbol.
    ///
    /// Fails on empty input or characters outside `[A-Za-z0-9.-]`.
    pub fn parse(symbol: impl AsRef<str>) -> Result<Self, Error> {
        let symbol = symbol.as_ref().trim();
        if symbol.is_empty() {
            return Err(Error::Validation("ticker symbol is empty".to_string()));
        }
        if !symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(Error::Validation(format!(
                "ticker symbol '{}' contains invalid characters",
                symbol
            )));
        }
        Ok(Self(symbol.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Ticker {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<Ticker> for String {
    fn from(t: Ticker) -> Self {
        t.0
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// SeriesKind
// =============================================================================

/// The two per-ticker series, each with its own table and key axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    /// One row per trading date, keyed by the date.
    Eod,
    /// One row per minute slot, keyed by an epoch-second timestamp.
    Intra,
}

impl SeriesKind {
    /// Table-name suffix: `"eod"` or `"intra"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesKind::Eod => "eod",
            SeriesKind::Intra => "intra",
        }
    }

    /// Both kinds, in provisioning order.
    pub const ALL: [SeriesKind; 2] = [SeriesKind::Eod, SeriesKind::Intra];
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Price rows
// =============================================================================

/// One end-of-day bar, keyed by `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EodRow {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: i64,
}

/// One 1-minute bar, keyed by `timestamp` (epoch seconds).
///
/// Volume is optional: providers report null volume for thin pre/post-market
/// minutes that still have prints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntraRow {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<i64>,
}
