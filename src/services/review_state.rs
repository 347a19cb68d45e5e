//! Review state derivation and the notification transition table.

use crate::models::{MrComment, ReviewState};

/// Current review state from an MR's comments.
///
/// Any unresolved resolvable thread puts the MR on fixes.
pub fn derive_state(comments: &[MrComment]) -> ReviewState {
    if comments.iter().any(MrComment::is_unresolved_thread) {
        ReviewState::OnFixes
    } else {
        ReviewState::OnReview
    }
}

/// What a change from the announced state to the current state calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Same state as last announced. Nothing to record or send.
    Unchanged,
    /// Record the new state without messaging anyone.
    Silent,
    /// Tell the author the MR needs fixes.
    NotifyAuthor,
    /// Tell reviewers who have not approved that the MR is ready again.
    NotifyReviewers,
}

impl Transition {
    /// Whether `last_notified_state` should move.
    pub fn records_state(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Transition table for `last_notified_state -> derived state`.
pub fn transition(announced: ReviewState, current: ReviewState) -> Transition {
    use ReviewState::*;

    match (announced, current) {
        (Unset, Unset) | (OnReview, OnReview) | (OnFixes, OnFixes) => Transition::Unchanged,
        // Reviewers already heard about the MR from the assignment message.
        (Unset, OnReview) => Transition::Silent,
        (Unset, OnFixes) | (OnReview, OnFixes) => Transition::NotifyAuthor,
        (OnFixes, OnReview) => Transition::NotifyReviewers,
        // Derivation never yields Unset.
        (OnReview, Unset) | (OnFixes, Unset) => Transition::Unchanged,
    }
}
