//! SQLite connection pool.
//!
//! All three background passes share one pool. WAL mode lets the
//! notification drains read while the assignment pass writes reviewer rows.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Type alias for the SQLite connection pool.
pub type DbPool = Pool<Sqlite>;

/// Connections kept by the pool. One per background pass plus headroom.
const MAX_CONNECTIONS: u32 = 5;

/// How long a writer waits on a locked database before failing the statement.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Create a new connection pool with WAL mode enabled.
///
/// The parent directory must already exist; `create_if_missing` only
/// creates the file.
pub async fn create_pool(db_path: &Path) -> Result<DbPool, sqlx::Error> {
    let db_url = format!("sqlite:{}", db_path.display());

    let connect_options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(connect_options)
        .await?;

    let mode: (String,) = sqlx::query_as("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await?;
    log::debug!("[db] opened {} (journal_mode={})", db_path.display(), mode.0);

    Ok(pool)
}
