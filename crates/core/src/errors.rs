//! Core error types for the sync engine.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, etc.) are converted to these types by the storage
//! layer; provider errors arrive via `gapsync-market-data`.

use thiserror::Error;

use gapsync_market_data::MarketDataError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the sync engine.
///
/// The variants mirror the failure taxonomy the orchestrator works with:
/// fetch failures are per-ticker and transient-at-next-run, validation
/// failures abort the current operation with nothing committed, and a
/// calendar failure is fatal for the whole run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] MarketDataError),

    #[error("Input validation failed: {0}")]
    Validation(String),

    #[error("Calendar construction failed: {0}")]
    Calendar(String),

    #[error("Consistency violation: {0}")]
    Consistency(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Database-agnostic error type for storage operations.
///
/// This enum uses `String` for all error details, allowing the storage layer
/// to convert storage-specific errors (Diesel, SQLite, etc.) into this format.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// A database transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// An identifier could not be used to form a table name.
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),
}

impl Error {
    /// True when the failure is plausibly resolved by rerunning the sync.
    ///
    /// Used by callers deciding whether a failed ticker belongs in the
    /// saved retry list.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Fetch(e) => e.retry_class() == gapsync_market_data::RetryClass::Transient,
            Error::Database(_) => true,
            Error::Validation(_) | Error::Calendar(_) | Error::Consistency(_) => false,
            Error::Unexpected(_) => false,
        }
    }
}
