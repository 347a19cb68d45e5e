//! Review cycle state persisted in `merge_requests.last_notified_state`.

use serde::{Deserialize, Serialize};

/// Where an MR stands in the review/fix cycle.
///
/// `Unset` is the initial value before anything was announced and is never
/// produced by deriving a state from comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Unset,
    OnReview,
    OnFixes,
}

impl ReviewState {
    /// Column value for this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unset => "",
            Self::OnReview => "on_review",
            Self::OnFixes => "on_fixes",
        }
    }
}

impl From<&str> for ReviewState {
    fn from(s: &str) -> Self {
        match s.trim() {
            "on_review" => Self::OnReview,
            "on_fixes" => Self::OnFixes,
            _ => Self::Unset,
        }
    }
}

impl std::fmt::Display for ReviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
