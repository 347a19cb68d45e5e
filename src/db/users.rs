//! User queries.

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::models::User;

const USER_COLUMNS: &str = "id, username, name, email, on_vacation";

/// Insert or refresh a user row.
pub async fn upsert_user(pool: &DbPool, user: &User) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO users (id, username, name, email, on_vacation)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            username = excluded.username,
            name = excluded.name,
            email = excluded.email,
            on_vacation = excluded.on_vacation
        "#,
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.name)
    .bind(&user.email)
    .bind(user.on_vacation)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a single user.
pub async fn get_user(pool: &DbPool, user_id: i64) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE id = ?",
        USER_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Get several users by ID, ordered by ID. Unknown IDs are skipped.
pub async fn get_users(pool: &DbPool, user_ids: &[i64]) -> Result<Vec<User>, AppError> {
    if user_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders: Vec<&str> = user_ids.iter().map(|_| "?").collect();
    let query = format!(
        "SELECT {} FROM users WHERE id IN ({}) ORDER BY id",
        USER_COLUMNS,
        placeholders.join(", ")
    );

    let mut query_builder = sqlx::query_as::<_, User>(&query);
    for id in user_ids {
        query_builder = query_builder.bind(*id);
    }

    Ok(query_builder.fetch_all(pool).await?)
}

/// Flip a user's vacation flag.
pub async fn set_on_vacation(pool: &DbPool, user_id: i64, on_vacation: bool) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE users SET on_vacation = ? WHERE id = ?")
        .bind(on_vacation)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found_with_id("User", user_id.to_string()));
    }

    Ok(())
}
