//! Merge request queries.
//!
//! The sync process owns every column except `last_notified_state`. The bot
//! also appends to `mr_reviewers`, but never removes rows from it.

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::models::{MergeRequest, NewMergeRequest, ReviewState, User};

const MR_COLUMNS: &str = "id, iid, repository_id, title, description, source_branch, target_branch, \
     state, draft, author_id, labels, web_url, last_notified_state, created_at, updated_at";

/// Insert or refresh an MR from the sync process.
///
/// `last_notified_state` is preserved on update.
pub async fn upsert_merge_request(pool: &DbPool, mr: &NewMergeRequest) -> Result<(), AppError> {
    let labels = serde_json::to_string(&mr.labels)?;

    sqlx::query(
        r#"
        INSERT INTO merge_requests (
            id, iid, repository_id, title, description, source_branch, target_branch,
            state, draft, author_id, labels, web_url, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            description = excluded.description,
            source_branch = excluded.source_branch,
            target_branch = excluded.target_branch,
            state = excluded.state,
            draft = excluded.draft,
            labels = excluded.labels,
            web_url = excluded.web_url,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(mr.id)
    .bind(mr.iid)
    .bind(mr.repository_id)
    .bind(&mr.title)
    .bind(&mr.description)
    .bind(&mr.source_branch)
    .bind(&mr.target_branch)
    .bind(mr.state.to_string())
    .bind(mr.draft)
    .bind(mr.author_id)
    .bind(&labels)
    .bind(&mr.web_url)
    .bind(mr.created_at)
    .bind(crate::db::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Get an MR by ID.
pub async fn get_merge_request(pool: &DbPool, mr_id: i64) -> Result<MergeRequest, AppError> {
    sqlx::query_as::<_, MergeRequest>(&format!(
        "SELECT {} FROM merge_requests WHERE id = ?",
        MR_COLUMNS
    ))
    .bind(mr_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found_with_id("MergeRequest", mr_id.to_string()))
}

/// MRs the assignment pass should look at.
///
/// Open, non-draft MRs created strictly after `created_after` in repositories
/// that at least one chat is subscribed to, oldest first.
pub async fn list_assignment_candidates(
    pool: &DbPool,
    created_after: i64,
) -> Result<Vec<MergeRequest>, AppError> {
    let mrs = sqlx::query_as::<_, MergeRequest>(&format!(
        r#"
        SELECT {}
        FROM merge_requests m
        WHERE m.state = 'opened'
          AND m.draft = 0
          AND m.created_at > ?
          AND EXISTS (
              SELECT 1 FROM chat_subscriptions s WHERE s.repository_id = m.repository_id
          )
        ORDER BY m.created_at ASC, m.id ASC
        "#,
        MR_COLUMNS
    ))
    .bind(created_after)
    .fetch_all(pool)
    .await?;

    Ok(mrs)
}

/// Current reviewers of an MR in assignment order.
pub async fn get_reviewers(pool: &DbPool, mr_id: i64) -> Result<Vec<User>, AppError> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.username, u.name, u.email, u.on_vacation
        FROM mr_reviewers r
        JOIN users u ON u.id = r.user_id
        WHERE r.mr_id = ?
        ORDER BY r.assigned_at ASC, u.id ASC
        "#,
    )
    .bind(mr_id)
    .fetch_all(pool)
    .await?;

    Ok(users)
}

/// IDs of users who approved an MR.
pub async fn get_approver_ids(pool: &DbPool, mr_id: i64) -> Result<Vec<i64>, AppError> {
    let rows: Vec<(i64,)> =
        sqlx::query_as("SELECT user_id FROM mr_approvers WHERE mr_id = ? ORDER BY user_id")
            .bind(mr_id)
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Add reviewers to an MR. Existing rows are kept as they are.
///
/// # Returns
/// Number of reviewer rows actually inserted
pub async fn add_reviewers(
    pool: &DbPool,
    mr_id: i64,
    user_ids: &[i64],
    assigned_at: i64,
) -> Result<u64, AppError> {
    if user_ids.is_empty() {
        return Ok(0);
    }

    let values: Vec<&str> = user_ids.iter().map(|_| "(?, ?, ?)").collect();
    let query = format!(
        "INSERT OR IGNORE INTO mr_reviewers (mr_id, user_id, assigned_at) VALUES {}",
        values.join(", ")
    );

    let mut query_builder = sqlx::query(&query);
    for user_id in user_ids {
        query_builder = query_builder.bind(mr_id).bind(*user_id).bind(assigned_at);
    }

    let result = query_builder
        .execute(pool)
        .await
        .map_err(|e| AppError::database_with_op(e.to_string(), "add_reviewers"))?;

    Ok(result.rows_affected())
}

/// Record an approval from the sync process.
pub async fn add_approver(
    pool: &DbPool,
    mr_id: i64,
    user_id: i64,
    approved_at: i64,
) -> Result<(), AppError> {
    sqlx::query("INSERT OR IGNORE INTO mr_approvers (mr_id, user_id, approved_at) VALUES (?, ?, ?)")
        .bind(mr_id)
        .bind(user_id)
        .bind(approved_at)
        .execute(pool)
        .await?;

    Ok(())
}

/// Move `last_notified_state` from `expected` to `new`.
///
/// Returns `false` when another pass already moved it, in which case the
/// caller must not announce the transition.
pub async fn compare_and_set_notified_state(
    pool: &DbPool,
    mr_id: i64,
    expected: ReviewState,
    new: ReviewState,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        "UPDATE merge_requests SET last_notified_state = ? WHERE id = ? AND last_notified_state = ?",
    )
    .bind(new.as_str())
    .bind(mr_id)
    .bind(expected.as_str())
    .execute(pool)
    .await
    .map_err(|e| AppError::database_with_op(e.to_string(), "compare_and_set_notified_state"))?;

    Ok(result.rows_affected() == 1)
}
