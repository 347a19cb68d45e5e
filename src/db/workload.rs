//! Recent reviewer workload, read from assignment history.

use crate::db::pool::DbPool;
use crate::error::AppError;
use std::collections::HashMap;

/// Reviewer assignment counts per user over a trailing window.
///
/// Users without an entry count as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workload {
    counts: HashMap<i64, u32>,
}

impl Workload {
    pub fn new(counts: HashMap<i64, u32>) -> Self {
        Self { counts }
    }

    /// Recent assignments for a user.
    pub fn count(&self, user_id: i64) -> u32 {
        self.counts.get(&user_id).copied().unwrap_or(0)
    }
}

/// Count reviewer assignments on MRs created at or after `since` for each of
/// `user_ids`.
///
/// Every requested user gets an entry, zero when they have no assignments.
pub async fn recent_assignment_counts(
    pool: &DbPool,
    user_ids: &[i64],
    since: i64,
) -> Result<Workload, AppError> {
    let mut counts: HashMap<i64, u32> = user_ids.iter().map(|id| (*id, 0)).collect();
    if user_ids.is_empty() {
        return Ok(Workload::new(counts));
    }

    let placeholders: Vec<&str> = user_ids.iter().map(|_| "?").collect();
    let query = format!(
        r#"
        SELECT r.user_id, COUNT(*)
        FROM mr_reviewers r
        JOIN merge_requests m ON m.id = r.mr_id
        WHERE m.created_at >= ? AND r.user_id IN ({})
        GROUP BY r.user_id
        "#,
        placeholders.join(", ")
    );

    let mut query_builder = sqlx::query_as::<_, (i64, i64)>(&query).bind(since);
    for id in user_ids {
        query_builder = query_builder.bind(*id);
    }

    for (user_id, count) in query_builder.fetch_all(pool).await? {
        counts.insert(user_id, u32::try_from(count).unwrap_or(u32::MAX));
    }

    Ok(Workload::new(counts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_user_counts_as_zero() {
        let workload = Workload::new(HashMap::from([(1, 4)]));
        assert_eq!(workload.count(1), 4);
        assert_eq!(workload.count(2), 0);
    }

    #[tokio::test]
    async fn test_counts_only_recent_mrs() {
        let dir = tempdir().unwrap();
        let pool = crate::db::initialize(&dir.path().join("test.db")).await.unwrap();

        sqlx::query("INSERT INTO repositories (id, path_with_namespace) VALUES (1, 'team/api')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO users (id, username, name) VALUES (1, 'a', 'A'), (2, 'b', 'B'), (3, 'c', 'C')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            r#"
            INSERT INTO merge_requests (id, iid, repository_id, title, source_branch, target_branch, author_id, created_at, updated_at)
            VALUES (10, 1, 1, 'old', 'f', 'main', 1, 100, 100),
                   (11, 2, 1, 'new', 'f', 'main', 1, 1000, 1000),
                   (12, 3, 1, 'newer', 'f', 'main', 1, 2000, 2000)
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO mr_reviewers (mr_id, user_id, assigned_at) VALUES (10, 2, 0), (11, 2, 0), (12, 2, 0), (10, 3, 0)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let workload = recent_assignment_counts(&pool, &[2, 3], 500).await.unwrap();
        assert_eq!(workload.count(2), 2);
        assert_eq!(
            workload,
            Workload::new(HashMap::from([(2, 2), (3, 0)]))
        );

        let empty = recent_assignment_counts(&pool, &[], 0).await.unwrap();
        assert_eq!(empty, Workload::default());
    }
}
