//! Action log entries produced by the sync process.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Kind of remote event recorded in `mr_actions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    CommentAdded,
    CommentResolved,
    ReviewerRemoved,
    FullyApproved,
    Merged,
    /// Any type this version does not act on. Only the staleness sweep touches it.
    Other,
}

impl ActionType {
    /// Types that feed the review/fix state machine.
    pub const REVIEW_CYCLE: [ActionType; 2] = [Self::CommentAdded, Self::CommentResolved];

    /// Types handled one at a time by the single-shot drain.
    pub const SINGLE_SHOT: [ActionType; 3] =
        [Self::ReviewerRemoved, Self::FullyApproved, Self::Merged];

    /// Column value for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommentAdded => "comment_added",
            Self::CommentResolved => "comment_resolved",
            Self::ReviewerRemoved => "reviewer_removed",
            Self::FullyApproved => "fully_approved",
            Self::Merged => "merged",
            Self::Other => "other",
        }
    }
}

impl From<&str> for ActionType {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "comment_added" => Self::CommentAdded,
            "comment_resolved" => Self::CommentResolved,
            "reviewer_removed" => Self::ReviewerRemoved,
            "fully_approved" => Self::FullyApproved,
            "merged" => Self::Merged,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in the append-only action log.
///
/// The bot's only write to this table is flipping `notified` to true.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MrAction {
    pub id: i64,

    pub mr_id: i64,

    pub action_type: String,

    /// User who caused the event.
    pub actor_id: Option<i64>,

    /// User the event is about (e.g. the removed reviewer).
    pub target_user_id: Option<i64>,

    /// When the event was recorded (Unix).
    pub created_at: i64,

    pub notified: bool,

    pub notified_at: Option<i64>,
}

impl MrAction {
    /// Parse the action type string into an enum.
    pub fn action_type_enum(&self) -> ActionType {
        ActionType::from(self.action_type.as_str())
    }
}

/// Input for appending an action.
#[derive(Debug, Clone)]
pub struct NewMrAction {
    pub mr_id: i64,
    pub action_type: ActionType,
    pub actor_id: Option<i64>,
    pub target_user_id: Option<i64>,
    pub created_at: i64,
}
