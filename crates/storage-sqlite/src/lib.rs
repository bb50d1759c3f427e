//! SQLite storage implementation for gapsync.
//!
//! This crate implements the `PriceStore` and `NoDataLedger` traits from
//! `gapsync-core` over two SQLite files: one for price rows, one for the
//! no-data ledger (mirrored table names, key-only columns).
//!
//! # Architecture
//!
//! This crate is the only place where Diesel dependencies exist; everything
//! above it works with traits.
//!
//! ```text
//!   core (engine)
//!        |
//!        v
//!   storage-sqlite (this crate)
//!      |        |
//!      v        v
//!  prices.db  nodata.db
//! ```
//!
//! Tables are per ticker (`{ticker}_eod` / `{ticker}_intra`) and provisioned
//! at runtime, so all SQL goes through `diesel::sql_query` rather than the
//! schema DSL.

pub mod db;
pub mod errors;
pub mod nodata;
pub mod prices;
pub mod utils;

// Re-export database utilities
pub use db::{create_pool, get_connection, DbConnection, DbPool};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from gapsync-core for convenience
pub use gapsync_core::errors::{DatabaseError, Error, Result};

pub use nodata::SqliteNoDataRepository;
pub use prices::SqlitePriceRepository;
