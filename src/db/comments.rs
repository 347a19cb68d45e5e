//! Review comment queries.

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::models::MrComment;

/// Insert or refresh a comment mirrored from GitLab.
pub async fn upsert_comment(pool: &DbPool, comment: &MrComment) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO mr_comments (id, mr_id, author_id, body, resolvable, resolved, resolved_by_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            body = excluded.body,
            resolvable = excluded.resolvable,
            resolved = excluded.resolved,
            resolved_by_id = excluded.resolved_by_id,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(comment.id)
    .bind(comment.mr_id)
    .bind(comment.author_id)
    .bind(&comment.body)
    .bind(comment.resolvable)
    .bind(comment.resolved)
    .bind(comment.resolved_by_id)
    .bind(comment.created_at)
    .bind(comment.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// All comments on an MR, oldest first.
pub async fn get_comments_for_mr(pool: &DbPool, mr_id: i64) -> Result<Vec<MrComment>, AppError> {
    let comments = sqlx::query_as::<_, MrComment>(
        r#"
        SELECT id, mr_id, author_id, body, resolvable, resolved, resolved_by_id, created_at, updated_at
        FROM mr_comments
        WHERE mr_id = ?
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(mr_id)
    .fetch_all(pool)
    .await?;

    Ok(comments)
}
