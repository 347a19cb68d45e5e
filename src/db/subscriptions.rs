//! Repositories and chat subscriptions.

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::models::{ChatSubscription, Repository};

/// Insert or refresh a repository row.
pub async fn upsert_repository(pool: &DbPool, repository: &Repository) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO repositories (id, path_with_namespace, web_url)
        VALUES (?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            path_with_namespace = excluded.path_with_namespace,
            web_url = excluded.web_url
        "#,
    )
    .bind(repository.id)
    .bind(&repository.path_with_namespace)
    .bind(&repository.web_url)
    .execute(pool)
    .await?;

    Ok(())
}

/// Subscribe a chat to a repository. Subscribing twice is a no-op.
pub async fn subscribe(pool: &DbPool, chat_id: &str, repository_id: i64) -> Result<(), AppError> {
    sqlx::query(
        "INSERT OR IGNORE INTO chat_subscriptions (chat_id, repository_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(chat_id)
    .bind(repository_id)
    .bind(crate::db::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove a chat's subscription to a repository.
pub async fn unsubscribe(pool: &DbPool, chat_id: &str, repository_id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM chat_subscriptions WHERE chat_id = ? AND repository_id = ?")
        .bind(chat_id)
        .bind(repository_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Chats subscribed to a repository, oldest subscription first.
pub async fn subscriptions_for_repository(
    pool: &DbPool,
    repository_id: i64,
) -> Result<Vec<ChatSubscription>, AppError> {
    let subscriptions = sqlx::query_as::<_, ChatSubscription>(
        r#"
        SELECT chat_id, repository_id, created_at
        FROM chat_subscriptions
        WHERE repository_id = ?
        ORDER BY created_at, chat_id
        "#,
    )
    .bind(repository_id)
    .fetch_all(pool)
    .await?;

    Ok(subscriptions)
}
