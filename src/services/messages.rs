//! Chat message text.

use crate::models::{MergeRequest, User};

/// `"{title} (!{iid}) {url}"`
pub fn mr_line(mr: &MergeRequest) -> String {
    format!("{} (!{}) {}", mr.title, mr.iid, mr.web_url)
}

/// Comma-separated mentions.
pub fn mention_list(users: &[User]) -> String {
    users
        .iter()
        .map(User::mention)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Announcement to the repository's chats.
///
/// `backfill` is true when the MR already had reviewers before this pass.
pub fn assignment_broadcast(mr: &MergeRequest, new_reviewers: &[User], backfill: bool) -> String {
    let prefix = if backfill {
        "additional reviewers"
    } else {
        "reviewer"
    };
    format!("{}\n{}: {}", mr_line(mr), prefix, mention_list(new_reviewers))
}

pub fn review_request(mr: &MergeRequest) -> String {
    format!("You were assigned to review {}", mr_line(mr))
}

pub fn needs_fixes(mr: &MergeRequest) -> String {
    format!("Your merge request needs fixes: {}", mr_line(mr))
}

pub fn ready_for_review(mr: &MergeRequest) -> String {
    format!("Threads resolved, ready for re-review: {}", mr_line(mr))
}

pub fn reviewer_removed(mr: &MergeRequest) -> String {
    format!("You were removed from the reviewers of {}", mr_line(mr))
}

pub fn fully_approved(mr: &MergeRequest) -> String {
    format!("Your merge request is fully approved: {}", mr_line(mr))
}

pub fn merged(mr: &MergeRequest) -> String {
    format!("Your merge request was merged: {}", mr_line(mr))
}
