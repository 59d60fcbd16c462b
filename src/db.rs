//! SQLite connection management.
//!
//! Request handling uses a read-only pool: the schema and its rows belong
//! to the mzIdentML converter, and nothing here writes to them. Only the
//! development bootstrap ([`crate::schema`]) opens the file writable.
//!
//! # Connection Pool
//!
//! Uses `sqlx::SqlitePool` with `db.max_connections` connections. Each
//! request takes exactly one connection for its whole lifetime (see
//! [`crate::sqlite_store`]).

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::config::Config;

/// Open a read-only pool on the configured database.
///
/// # Errors
///
/// Returns an error if the database file does not exist or cannot be opened.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .read_only(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.db.max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

    Ok(pool)
}

/// Open a writable pool, creating the file and its parent directories if
/// they don't exist. Used by `xiview init` only.
///
/// Keeps the default rollback journal: a WAL-mode file cannot be opened by
/// the read-only pool unless its `-shm` file is present.
pub async fn connect_writable(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    Ok(pool)
}
