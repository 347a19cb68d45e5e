//! Record of background pass runs, pruned to the most recent entries.

use crate::db::pool::DbPool;
use crate::error::AppError;
use serde::Serialize;
use sqlx::FromRow;

/// Entries kept in `pass_log`.
pub const MAX_ENTRIES: i64 = 200;

/// One completed pass.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PassLogEntry {
    pub id: i64,
    /// `assignment`, `review_state` or `single_shot`.
    pub operation: String,
    /// `success` or `error`.
    pub status: String,
    pub message: Option<String>,
    pub duration_ms: Option<i64>,
    pub timestamp: i64,
}

/// Log a pass and prune old entries.
pub async fn record_pass(
    pool: &DbPool,
    operation: &str,
    status: &str,
    message: Option<&str>,
    duration_ms: Option<i64>,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO pass_log (operation, status, message, duration_ms, timestamp) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(operation)
    .bind(status)
    .bind(message)
    .bind(duration_ms)
    .bind(crate::db::now())
    .execute(pool)
    .await?;

    sqlx::query(
        "DELETE FROM pass_log WHERE id NOT IN (SELECT id FROM pass_log ORDER BY id DESC LIMIT ?)",
    )
    .bind(MAX_ENTRIES)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent passes, newest first.
pub async fn recent_passes(pool: &DbPool, limit: i64) -> Result<Vec<PassLogEntry>, AppError> {
    let entries = sqlx::query_as::<_, PassLogEntry>(
        "SELECT id, operation, status, message, duration_ms, timestamp FROM pass_log ORDER BY id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}
