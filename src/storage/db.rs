use std::path::Path;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

use crate::core::error::AppResult;
use crate::storage::migrations::run_migrations;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Initializes a connection pool with up to 4 connections and applies the
/// embedded schema migrations on the first one.
///
/// # Arguments
///
/// * `database_path` - Path to SQLite database file
///
/// # Example
///
/// ```no_run
/// use invitrack::storage::create_pool;
///
/// let pool = create_pool("data.db")?;
/// # Ok::<(), invitrack::core::AppError>(())
/// ```
pub fn create_pool(database_path: &str) -> AppResult<DbPool> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder().max_size(4).build(manager)?;

    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;

    Ok(pool)
}

/// Open the database only if the file is already there
///
/// Returns `Ok(None)` for a missing file instead of creating an empty one.
pub fn open_existing_pool(database_path: &str) -> AppResult<Option<DbPool>> {
    if !Path::new(database_path).exists() {
        return Ok(None);
    }
    create_pool(database_path).map(Some)
}

/// Get a connection from the pool
///
/// The connection is returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}
