//! Repositories and the chats subscribed to them.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A GitLab project the bot knows about.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Repository {
    /// GitLab project ID.
    pub id: i64,

    /// Project path with namespace (e.g., "group/project").
    pub path_with_namespace: String,

    pub web_url: String,
}

/// A chat that receives assignment messages for a repository.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatSubscription {
    pub chat_id: String,
    pub repository_id: i64,
    pub created_at: i64,
}
