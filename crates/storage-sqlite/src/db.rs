//! Connection pooling for the two SQLite files.

use std::sync::Arc;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;

use crate::errors::IntoCore;
use gapsync_core::errors::{DatabaseError, Error, Result};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Applies per-connection pragmas when the pool hands out a connection.
#[derive(Debug)]
struct ConnectionOptions;

impl r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(
            "PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL; \
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Creates a pool over one SQLite file.
///
/// The sync engine is a single sequential writer, so the pool is small; the
/// extra connection covers reads while a write is in flight.
pub fn create_pool(db_path: &str) -> Result<Arc<DbPool>> {
    let manager = ConnectionManager::<SqliteConnection>::new(db_path);
    let pool = Pool::builder()
        .max_size(2)
        .connection_customizer(Box::new(ConnectionOptions))
        .build(manager)
        .map_err(|e| Error::Database(DatabaseError::PoolCreationFailed(e.to_string())))?;
    Ok(Arc::new(pool))
}

/// Checks out a connection, converting pool errors to core errors.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection> {
    pool.get().map_err(|e| e.into_core())
}

#[derive(diesel::QueryableByName)]
struct CountRow {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    n: i64,
}

/// True when a table with the given (unquoted) name exists.
pub fn table_exists(conn: &mut SqliteConnection, name: &str) -> Result<bool> {
    use diesel::prelude::*;
    let row: CountRow = diesel::sql_query(
        "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = ?",
    )
    .bind::<diesel::sql_types::Text, _>(name)
    .get_result(conn)
    .map_err(|e| e.into_core())?;
    Ok(row.n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_pool_on_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.db");
        let pool = create_pool(path.to_str().unwrap()).unwrap();
        assert!(get_connection(&pool).is_ok());
    }
}
