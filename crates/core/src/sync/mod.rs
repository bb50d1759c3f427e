//! The sync orchestrator: per-ticker gap reconciliation.
//!
//! One run walks each ticker through a fixed sequence of states:
//!
//! ```text
//! Init -> SchemaReady -> RangeClipped -> GapsComputed
//!      -> (Fetching -> Fetched)* -> Reconciled -> Done
//! ```
//!
//! with a terminal `Errored` reachable from any state. A ticker failure
//! never halts the run; the reference calendar failing to build does.

mod normalize;
mod service;
mod types;

pub use normalize::{normalize_eod, normalize_intra};
pub use service::{SyncParams, SyncService, DEFAULT_EXCHANGE, DEFAULT_MAX_INTRA_WINDOW_DAYS};
pub use types::{SkipReason, SyncReport, SyncStatus, TickerSyncResult};
