//! Storage-specific error types for SQLite operations.
//!
//! This module provides error types that wrap Diesel-specific errors and
//! convert them to the database-agnostic error types defined in
//! `gapsync_core`.

use diesel::result::Error as DieselError;
use thiserror::Error;

use gapsync_core::errors::{DatabaseError, Error};

/// Storage-specific errors that wrap Diesel and r2d2 types.
///
/// These errors are internal to the storage layer and are converted to
/// `gapsync_core::Error` before being returned to callers.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Query execution failed: {0}")]
    QueryFailed(#[from] DieselError),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConnectionFailed(e) => {
                Error::Database(DatabaseError::ConnectionFailed(e.to_string()))
            }
            StorageError::PoolError(e) => {
                Error::Database(DatabaseError::PoolCreationFailed(e.to_string()))
            }
            StorageError::QueryFailed(DieselError::RollbackTransaction) => {
                Error::Database(DatabaseError::TransactionFailed(
                    "transaction rolled back".to_string(),
                ))
            }
            StorageError::QueryFailed(e) => {
                Error::Database(DatabaseError::QueryFailed(e.to_string()))
            }
        }
    }
}

/// Extension trait to convert Diesel/r2d2 errors to core errors.
///
/// Since we can't implement `From<DieselError> for Error` due to orphan
/// rules, this trait provides a method to perform the conversion.
pub trait IntoCore {
    /// Convert to a core Error type.
    fn into_core(self) -> Error;
}

impl IntoCore for DieselError {
    fn into_core(self) -> Error {
        StorageError::QueryFailed(self).into()
    }
}

impl IntoCore for r2d2::Error {
    fn into_core(self) -> Error {
        StorageError::PoolError(self).into()
    }
}

impl IntoCore for diesel::ConnectionError {
    fn into_core(self) -> Error {
        StorageError::ConnectionFailed(self).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diesel_error_maps_to_query_failed() {
        let err = DieselError::NotFound.into_core();
        assert!(matches!(
            err,
            Error::Database(DatabaseError::QueryFailed(_))
        ));
    }

    #[test]
    fn test_rollback_maps_to_transaction_failed() {
        let err: Error = StorageError::QueryFailed(DieselError::RollbackTransaction).into();
        assert!(matches!(
            err,
            Error::Database(DatabaseError::TransactionFailed(_))
        ));
    }
}
