//! Notification passes over the action log.
//!
//! The review-state pass groups pending `comment_added`/`comment_resolved`
//! actions by MR, derives the MR's review state and messages people only
//! when that state differs from the last one announced. The state is moved
//! with a compare-and-set before anything is sent, so two overlapping passes
//! can never both announce the same transition.
//!
//! The single-shot pass handles `reviewer_removed`, `fully_approved` and
//! `merged` one action at a time.
//!
//! Actions are only left unnotified when reading the store fails; the next
//! pass retries them, and the staleness sweep eventually closes them out.

use crate::config::NotificationConfig;
use crate::db::pool::DbPool;
use crate::db::{actions, comments, merge_requests, users};
use crate::error::AppError;
use crate::models::{ActionType, MergeRequest, MrAction, User};
use crate::services::messages;
use crate::services::remote::ChatService;
use crate::services::review_state::{self, Transition};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

/// Totals for one notification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationReport {
    /// Actions flipped to notified after evaluation.
    pub actions_notified: u64,
    /// Actions flipped by the staleness sweep.
    pub stale_swept: u64,
    /// MRs whose review state moved.
    pub transitions: usize,
    /// Actions on MRs that are no longer open.
    pub closed_skipped: usize,
    pub messages_sent: usize,
    pub send_failures: usize,
    /// Recipients without a chat identity.
    pub recipients_skipped: usize,
    pub errors: Vec<String>,
    pub duration_ms: i64,
}

impl NotificationReport {
    pub fn summary(&self) -> String {
        format!(
            "{} actions notified, {} stale, {} transitions, {} messages ({} failed), {} errors",
            self.actions_notified,
            self.stale_swept,
            self.transitions,
            self.messages_sent,
            self.send_failures,
            self.errors.len()
        )
    }
}

/// Runs notification passes.
pub struct NotificationEngine {
    pool: DbPool,
    chat: Arc<dyn ChatService>,
    config: NotificationConfig,
}

impl NotificationEngine {
    pub fn new(pool: DbPool, chat: Arc<dyn ChatService>, config: NotificationConfig) -> Self {
        Self { pool, chat, config }
    }

    /// Sweep stale actions, then evaluate the review/fix state of every MR
    /// with pending review-cycle actions.
    pub async fn run_review_state_pass(&self) -> Result<NotificationReport, AppError> {
        let start = Instant::now();
        let mut report = NotificationReport::default();

        let cutoff = crate::db::now() - self.config.stale_after.as_secs() as i64;
        report.stale_swept = actions::mark_stale(&self.pool, cutoff).await?;
        if report.stale_swept > 0 {
            log::info!("[notify] swept {} stale action(s)", report.stale_swept);
        }

        let pending = actions::get_pending_actions(&self.pool, &ActionType::REVIEW_CYCLE).await?;
        let mut by_mr: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        for action in &pending {
            by_mr.entry(action.mr_id).or_default().push(action.id);
        }

        for (mr_id, action_ids) in by_mr {
            if let Err(e) = self.process_review_cycle(mr_id, &action_ids, &mut report).await {
                log::warn!("[notify] MR {} left for next pass ({}): {}", mr_id, e.origin(), e);
                report.errors.push(format!("MR {}: {}", mr_id, e));
            }
        }

        report.duration_ms = start.elapsed().as_millis() as i64;
        Ok(report)
    }

    async fn process_review_cycle(
        &self,
        mr_id: i64,
        action_ids: &[i64],
        report: &mut NotificationReport,
    ) -> Result<(), AppError> {
        let mr = merge_requests::get_merge_request(&self.pool, mr_id).await?;

        if !mr.is_open() {
            report.closed_skipped += action_ids.len();
            report.actions_notified += actions::mark_notified(&self.pool, action_ids).await?;
            return Ok(());
        }

        let comments = comments::get_comments_for_mr(&self.pool, mr.id).await?;
        let announced = mr.notified_state();
        let current = review_state::derive_state(&comments);
        let transition = review_state::transition(announced, current);

        if transition.records_state() {
            // Load recipients before the state moves.
            let outgoing = self.recipients(&mr, transition).await?;
            let won = merge_requests::compare_and_set_notified_state(
                &self.pool, mr.id, announced, current,
            )
            .await?;

            if won {
                log::info!("[notify] !{}: {} -> {}", mr.iid, announced, current);
                report.transitions += 1;
                for (user, text) in &outgoing {
                    self.send_dm(user.as_ref(), text, report).await;
                }
            } else {
                log::debug!("[notify] !{}: state already moved by another pass", mr.iid);
            }
        }

        report.actions_notified += actions::mark_notified(&self.pool, action_ids).await?;
        Ok(())
    }

    /// Who hears about a transition, and what they are told.
    async fn recipients(
        &self,
        mr: &MergeRequest,
        transition: Transition,
    ) -> Result<Vec<(Option<User>, String)>, AppError> {
        match transition {
            Transition::Unchanged | Transition::Silent => Ok(Vec::new()),
            Transition::NotifyAuthor => {
                let author = users::get_user(&self.pool, mr.author_id).await?;
                Ok(vec![(author, messages::needs_fixes(mr))])
            }
            Transition::NotifyReviewers => {
                let approved: HashSet<i64> = merge_requests::get_approver_ids(&self.pool, mr.id)
                    .await?
                    .into_iter()
                    .collect();
                let text = messages::ready_for_review(mr);
                Ok(merge_requests::get_reviewers(&self.pool, mr.id)
                    .await?
                    .into_iter()
                    .filter(|r| !approved.contains(&r.id))
                    .map(|r| (Some(r), text.clone()))
                    .collect())
            }
        }
    }

    /// Handle pending `reviewer_removed`, `fully_approved` and `merged`
    /// actions. Each is marked notified once evaluated, whether or not a
    /// message went out.
    pub async fn run_single_shot_pass(&self) -> Result<NotificationReport, AppError> {
        let start = Instant::now();
        let mut report = NotificationReport::default();

        let pending = actions::get_pending_actions(&self.pool, &ActionType::SINGLE_SHOT).await?;
        for action in &pending {
            if let Err(e) = self.process_single_shot(action, &mut report).await {
                log::warn!(
                    "[notify] action {} left for next pass ({}): {}",
                    action.id,
                    e.origin(),
                    e
                );
                report.errors.push(format!("action {}: {}", action.id, e));
            }
        }

        report.duration_ms = start.elapsed().as_millis() as i64;
        Ok(report)
    }

    async fn process_single_shot(
        &self,
        action: &MrAction,
        report: &mut NotificationReport,
    ) -> Result<(), AppError> {
        let mr = merge_requests::get_merge_request(&self.pool, action.mr_id).await?;

        let (recipient_id, text) = match action.action_type_enum() {
            ActionType::ReviewerRemoved => (action.target_user_id, messages::reviewer_removed(&mr)),
            ActionType::FullyApproved => (Some(mr.author_id), messages::fully_approved(&mr)),
            ActionType::Merged => (Some(mr.author_id), messages::merged(&mr)),
            other => {
                log::debug!("[notify] action {} has type {}, nothing to send", action.id, other);
                report.actions_notified += actions::mark_notified(&self.pool, &[action.id]).await?;
                return Ok(());
            }
        };

        let recipient = match recipient_id {
            Some(id) => users::get_user(&self.pool, id).await?,
            None => None,
        };
        self.send_dm(recipient.as_ref(), &text, report).await;

        report.actions_notified += actions::mark_notified(&self.pool, &[action.id]).await?;
        Ok(())
    }

    /// DM a user if they have a chat identity. Failures are counted, not
    /// returned.
    async fn send_dm(&self, user: Option<&User>, text: &str, report: &mut NotificationReport) {
        let Some(target) = user.and_then(User::dm_target) else {
            report.recipients_skipped += 1;
            log::debug!(
                "[notify] no chat identity for {}, skipping",
                user.map(|u| u.username.as_str()).unwrap_or("unknown user")
            );
            return;
        };

        match self.chat.send_message(target, text).await {
            Ok(()) => report.messages_sent += 1,
            Err(e) => {
                report.send_failures += 1;
                log::warn!("[notify] DM to {} failed: {}", target, e);
            }
        }
    }
}
