//! Gapsync Core - Calendar, gap analysis, store traits, and the sync engine.
//!
//! This crate contains the gap-reconciliation logic. It is storage-agnostic
//! and defines the [`store::PriceStore`] and [`store::NoDataLedger`] traits
//! that are implemented by the `storage-sqlite` crate; provider access comes
//! in through the `gapsync-market-data` fetch trait.
//!
//! # Data flow
//!
//! ```text
//! +----------------+    sessions/grid    +-----------------+
//! | TradingCalendar| ------------------> |                 |
//! +----------------+                     |                 |
//! +----------------+   existing keys     |   SyncService   |
//! |   PriceStore   | <-----------------> |  (per-ticker    |
//! +----------------+    upsert           |  state machine) |
//! +----------------+   existing keys     |                 |
//! |  NoDataLedger  | <-----------------> |                 |
//! +----------------+   record/reconcile  +-----------------+
//!                                                 |
//!                                                 v
//!                                        +-----------------+
//!                                        |MarketDataFetcher|
//!                                        +-----------------+
//! ```
//!
//! The central invariant: for every (ticker, kind, key), after any commit
//! boundary the key exists in at most one of {price store, no-data ledger}.

pub mod calendar;
pub mod errors;
pub mod gaps;
pub mod store;
pub mod sync;
pub mod types;

pub use errors::{Error, Result};
pub use types::{EodRow, IntraRow, SeriesKind, Ticker};
