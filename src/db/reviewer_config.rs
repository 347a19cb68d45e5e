//! Static reviewer configuration: label reviewers, default pools and SLAs.

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::models::{RepositorySla, User};

/// A configured label reviewer joined with their user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMember {
    pub label: String,
    pub user: User,
}

type LabelMemberRow = (String, i64, String, String, Option<String>, bool);

/// Bind a user to a label in a repository.
pub async fn add_label_reviewer(
    pool: &DbPool,
    repository_id: i64,
    label: &str,
    user_id: i64,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT OR IGNORE INTO label_reviewers (repository_id, label, user_id) VALUES (?, ?, ?)",
    )
    .bind(repository_id)
    .bind(label)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Add a user to a repository's default pool.
pub async fn add_possible_reviewer(
    pool: &DbPool,
    repository_id: i64,
    user_id: i64,
) -> Result<(), AppError> {
    sqlx::query("INSERT OR IGNORE INTO possible_reviewers (repository_id, user_id) VALUES (?, ?)")
        .bind(repository_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Set how many reviewers MRs in a repository need.
pub async fn set_assign_count(
    pool: &DbPool,
    repository_id: i64,
    assign_count: usize,
) -> Result<(), AppError> {
    if assign_count == 0 {
        return Err(AppError::invalid_input_field(
            "assign_count must be at least 1",
            "assign_count",
        ));
    }

    sqlx::query(
        r#"
        INSERT INTO repository_slas (repository_id, assign_count) VALUES (?, ?)
        ON CONFLICT(repository_id) DO UPDATE SET assign_count = excluded.assign_count
        "#,
    )
    .bind(repository_id)
    .bind(assign_count as i64)
    .execute(pool)
    .await?;

    Ok(())
}

/// Reviewers configured for any of `labels` in the repository.
///
/// Labels match case-insensitively; the returned label is the configured
/// spelling. Ordered by label, then user ID.
pub async fn get_label_members(
    pool: &DbPool,
    repository_id: i64,
    labels: &[String],
) -> Result<Vec<LabelMember>, AppError> {
    if labels.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, LabelMemberRow>(
        r#"
        SELECT l.label, u.id, u.username, u.name, u.email, u.on_vacation
        FROM label_reviewers l
        JOIN users u ON u.id = l.user_id
        WHERE l.repository_id = ?
        ORDER BY l.label ASC, u.id ASC
        "#,
    )
    .bind(repository_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter(|(label, ..)| labels.iter().any(|l| l.eq_ignore_ascii_case(label)))
        .map(|(label, id, username, name, email, on_vacation)| LabelMember {
            label,
            user: User {
                id,
                username,
                name,
                email,
                on_vacation,
            },
        })
        .collect())
}

/// The repository's default reviewer pool, ordered by user ID.
pub async fn get_possible_reviewers(pool: &DbPool, repository_id: i64) -> Result<Vec<User>, AppError> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.username, u.name, u.email, u.on_vacation
        FROM possible_reviewers p
        JOIN users u ON u.id = p.user_id
        WHERE p.repository_id = ?
        ORDER BY u.id ASC
        "#,
    )
    .bind(repository_id)
    .fetch_all(pool)
    .await?;

    Ok(users)
}

/// Required reviewer count for a repository, defaulting to one.
pub async fn get_assign_count(pool: &DbPool, repository_id: i64) -> Result<usize, AppError> {
    let sla = sqlx::query_as::<_, RepositorySla>(
        "SELECT repository_id, assign_count FROM repository_slas WHERE repository_id = ?",
    )
    .bind(repository_id)
    .fetch_optional(pool)
    .await?;

    Ok(match sla {
        Some(sla) if sla.assign_count >= 1 => sla.assign_count as usize,
        _ => RepositorySla::DEFAULT_ASSIGN_COUNT,
    })
}
