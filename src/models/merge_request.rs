//! Merge request model.

use crate::models::review_state::ReviewState;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle state of a merge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeRequestState {
    Opened,
    Merged,
    Closed,
}

impl From<&str> for MergeRequestState {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "merged" => Self::Merged,
            "closed" | "locked" => Self::Closed,
            _ => Self::Opened,
        }
    }
}

impl std::fmt::Display for MergeRequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opened => write!(f, "opened"),
            Self::Merged => write!(f, "merged"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// A GitLab merge request as mirrored by the sync process.
///
/// `labels` is stored as a JSON array in SQLite.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MergeRequest {
    /// GitLab MR ID (global).
    pub id: i64,

    /// Project-scoped MR number.
    pub iid: i64,

    /// GitLab project ID of the owning repository.
    pub repository_id: i64,

    pub title: String,

    pub description: Option<String>,

    pub source_branch: String,

    pub target_branch: String,

    /// `opened`, `merged` or `closed`.
    pub state: String,

    pub draft: bool,

    /// GitLab user ID of the author.
    pub author_id: i64,

    /// JSON array of label names.
    pub labels: String,

    pub web_url: String,

    /// Last review state announced to people. Owned by the notification engine.
    pub last_notified_state: String,

    /// Creation timestamp (Unix).
    pub created_at: i64,

    /// Last update timestamp (Unix).
    pub updated_at: i64,
}

impl MergeRequest {
    /// Parse the state string into an enum.
    pub fn state_enum(&self) -> MergeRequestState {
        MergeRequestState::from(self.state.as_str())
    }

    /// Check if the MR is open.
    pub fn is_open(&self) -> bool {
        self.state_enum() == MergeRequestState::Opened
    }

    /// Parse labels from JSON string.
    pub fn labels_vec(&self) -> Vec<String> {
        serde_json::from_str(&self.labels).unwrap_or_default()
    }

    /// Whether the MR carries any of `labels` (case-insensitive).
    pub fn has_any_label(&self, labels: &[String]) -> bool {
        self.labels_vec()
            .iter()
            .any(|own| labels.iter().any(|l| l.eq_ignore_ascii_case(own)))
    }

    /// The review state last announced for this MR.
    pub fn notified_state(&self) -> ReviewState {
        ReviewState::from(self.last_notified_state.as_str())
    }
}

/// Fields written by the sync process when it mirrors an MR.
#[derive(Debug, Clone)]
pub struct NewMergeRequest {
    pub id: i64,
    pub iid: i64,
    pub repository_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub source_branch: String,
    pub target_branch: String,
    pub state: MergeRequestState,
    pub draft: bool,
    pub author_id: i64,
    pub labels: Vec<String>,
    pub web_url: String,
    pub created_at: i64,
}
