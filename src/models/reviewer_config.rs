//! Static reviewer configuration per repository.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A reviewer bound to one label in one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LabelReviewer {
    pub repository_id: i64,
    pub label: String,
    pub user_id: i64,
}

/// A member of the repository's default pool (no label affinity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PossibleReviewer {
    pub repository_id: i64,
    pub user_id: i64,
}

/// How many reviewers an MR in the repository should have at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RepositorySla {
    pub repository_id: i64,
    pub assign_count: i64,
}

impl RepositorySla {
    /// Used when a repository has no SLA row.
    pub const DEFAULT_ASSIGN_COUNT: usize = 1;
}
