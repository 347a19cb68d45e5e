//! Capability traits for the remote services the bot talks to.
//!
//! Production uses the reqwest clients in [`gitlab_client`] and
//! [`chat_client`]; tests substitute hand-written doubles.
//!
//! [`gitlab_client`]: crate::services::gitlab_client
//! [`chat_client`]: crate::services::chat_client

use crate::error::AppError;
use crate::models::MergeRequestState;
use async_trait::async_trait;

/// The remote's current view of a merge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMergeRequest {
    pub id: i64,
    pub iid: i64,
    pub project_id: i64,
    pub state: MergeRequestState,
    pub draft: bool,
    /// Reviewer user IDs currently set on the remote.
    pub reviewer_ids: Vec<i64>,
}

impl RemoteMergeRequest {
    /// Whether reviewers may still be assigned.
    pub fn accepts_reviewers(&self) -> bool {
        self.state == MergeRequestState::Opened && !self.draft
    }
}

/// Code-review host operations used by the assignment pass.
#[async_trait]
pub trait CodeReviewService: Send + Sync {
    /// Fetch a merge request by project and project-scoped number.
    async fn get_merge_request(
        &self,
        project_id: i64,
        iid: i64,
    ) -> Result<RemoteMergeRequest, AppError>;

    /// Replace the reviewer set of a merge request.
    async fn update_reviewers(
        &self,
        project_id: i64,
        iid: i64,
        reviewer_ids: &[i64],
    ) -> Result<(), AppError>;
}

/// Chat-bot operations.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Send a text message to a group chat or a user's direct chat.
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), AppError>;
}
