//! Action log persistence.
//!
//! `mr_actions` is appended to by the sync process. The notification passes
//! read pending entries and flip `notified` exactly once; nothing here ever
//! resets the flag.

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::models::{ActionType, MrAction, NewMrAction};
use sqlx::Row;

const ACTION_COLUMNS: &str =
    "id, mr_id, action_type, actor_id, target_user_id, created_at, notified, notified_at";

/// Append an action to the log.
///
/// # Arguments
/// * `pool` - Database connection pool
/// * `input` - Action type, MR and the users involved
///
/// # Returns
/// The stored action with its ID
pub async fn enqueue_action(pool: &DbPool, input: NewMrAction) -> Result<MrAction, AppError> {
    let result = sqlx::query(&format!(
        r#"
        INSERT INTO mr_actions (mr_id, action_type, actor_id, target_user_id, created_at, notified)
        VALUES (?, ?, ?, ?, ?, 0)
        RETURNING {}
        "#,
        ACTION_COLUMNS
    ))
    .bind(input.mr_id)
    .bind(input.action_type.as_str())
    .bind(input.actor_id)
    .bind(input.target_user_id)
    .bind(input.created_at)
    .fetch_one(pool)
    .await?;

    Ok(MrAction {
        id: result.get("id"),
        mr_id: result.get("mr_id"),
        action_type: result.get("action_type"),
        actor_id: result.get("actor_id"),
        target_user_id: result.get("target_user_id"),
        created_at: result.get("created_at"),
        notified: result.get("notified"),
        notified_at: result.get("notified_at"),
    })
}

/// Unnotified actions of the given types, oldest first.
pub async fn get_pending_actions(
    pool: &DbPool,
    types: &[ActionType],
) -> Result<Vec<MrAction>, AppError> {
    if types.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders: Vec<&str> = types.iter().map(|_| "?").collect();
    let query = format!(
        r#"
        SELECT {}
        FROM mr_actions
        WHERE notified = 0 AND action_type IN ({})
        ORDER BY created_at ASC, id ASC
        "#,
        ACTION_COLUMNS,
        placeholders.join(", ")
    );

    let mut query_builder = sqlx::query_as::<_, MrAction>(&query);
    for action_type in types {
        query_builder = query_builder.bind(action_type.as_str());
    }

    Ok(query_builder.fetch_all(pool).await?)
}

/// All actions recorded for an MR, oldest first.
pub async fn get_actions_for_mr(pool: &DbPool, mr_id: i64) -> Result<Vec<MrAction>, AppError> {
    let actions = sqlx::query_as::<_, MrAction>(&format!(
        "SELECT {} FROM mr_actions WHERE mr_id = ? ORDER BY created_at ASC, id ASC",
        ACTION_COLUMNS
    ))
    .bind(mr_id)
    .fetch_all(pool)
    .await?;

    Ok(actions)
}

/// Mark actions as notified.
///
/// Already-notified rows are left alone so their `notified_at` keeps the
/// first delivery time.
///
/// # Returns
/// Number of rows that changed
pub async fn mark_notified(pool: &DbPool, action_ids: &[i64]) -> Result<u64, AppError> {
    if action_ids.is_empty() {
        return Ok(0);
    }

    let placeholders: Vec<&str> = action_ids.iter().map(|_| "?").collect();
    let query = format!(
        "UPDATE mr_actions SET notified = 1, notified_at = ? WHERE notified = 0 AND id IN ({})",
        placeholders.join(", ")
    );

    let mut query_builder = sqlx::query(&query).bind(crate::db::now());
    for id in action_ids {
        query_builder = query_builder.bind(*id);
    }

    let result = query_builder
        .execute(pool)
        .await
        .map_err(|e| AppError::database_with_op(e.to_string(), "mark_notified"))?;

    Ok(result.rows_affected())
}

/// Mark every unnotified action created before `cutoff` as notified.
///
/// # Returns
/// Number of actions swept
pub async fn mark_stale(pool: &DbPool, cutoff: i64) -> Result<u64, AppError> {
    let result = sqlx::query(
        "UPDATE mr_actions SET notified = 1, notified_at = ? WHERE notified = 0 AND created_at < ?",
    )
    .bind(crate::db::now())
    .bind(cutoff)
    .execute(pool)
    .await
    .map_err(|e| AppError::database_with_op(e.to_string(), "mark_stale"))?;

    Ok(result.rows_affected())
}

/// Count of unnotified actions.
pub async fn pending_count(pool: &DbPool) -> Result<i64, AppError> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mr_actions WHERE notified = 0")
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}
