//! Review comment model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A note on a merge request, mirrored from GitLab.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MrComment {
    /// GitLab note ID.
    pub id: i64,

    pub mr_id: i64,

    pub author_id: i64,

    pub body: String,

    /// Can this comment be resolved.
    pub resolvable: bool,

    /// Thread resolution status.
    pub resolved: bool,

    pub resolved_by_id: Option<i64>,

    /// Creation timestamp (Unix).
    pub created_at: i64,

    /// Last update timestamp (Unix).
    pub updated_at: i64,
}

impl MrComment {
    /// A resolvable thread nobody has resolved yet.
    pub fn is_unresolved_thread(&self) -> bool {
        self.resolvable && !self.resolved
    }
}
