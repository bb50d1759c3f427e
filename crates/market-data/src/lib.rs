//! Gapsync Market Data Crate
//!
//! Provider access for the sync engine: historical end-of-day bars,
//! 1-minute intraday bars and fundamentals (listing dates).
//!
//! # Overview
//!
//! The crate exposes a single capability trait, [`MarketDataFetcher`], with
//! one concrete implementation, [`EodhdClient`], speaking the EODHD REST API.
//! Bar payloads are returned with provider-native field names preserved
//! ([`RawBars`]); mapping them onto the internal schema is the consumer's
//! job, so a provider-side field rename surfaces as a validation failure
//! instead of silently corrupt data.
//!
//! # Empty responses
//!
//! An empty payload on a successful HTTP response is reported as
//! [`MarketDataError::EmptyResponse`]. Whether a slot genuinely has no data
//! is decided by the sync engine's gap ledger, never by this crate.

pub mod errors;
pub mod fetcher;
pub mod models;
pub mod provider;

pub use errors::{MarketDataError, RetryClass};
pub use fetcher::MarketDataFetcher;
pub use models::{Fundamentals, RawBar, RawBars};
pub use provider::eodhd::EodhdClient;
