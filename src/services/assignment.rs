//! Assignment pass.
//!
//! Finds MRs with fewer reviewers than their repository requires, selects the
//! missing ones, pushes the full reviewer set to GitLab, records the new
//! reviewers locally and tells the repository's chats and the reviewers.
//! Reviewers already set on GitLab count toward the requirement and are never
//! drawn again.
//!
//! Running the pass again without new MRs or SLA changes does nothing: every
//! MR is already satisfied and is skipped before any remote call.

use crate::config::AssignmentConfig;
use crate::db::pool::DbPool;
use crate::db::{merge_requests, reviewer_config, subscriptions};
use crate::error::AppError;
use crate::models::{MergeRequest, User};
use crate::services::messages;
use crate::services::remote::{ChatService, CodeReviewService};
use crate::services::reviewer_selection::ReviewerSelector;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Totals for one assignment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentReport {
    /// MRs returned by the candidate query.
    pub considered: usize,
    /// Skipped for a release or block label.
    pub skipped_labels: usize,
    /// Already had enough reviewers.
    pub satisfied: usize,
    /// Closed, merged or turned draft on GitLab since the last sync.
    pub skipped_remote: usize,
    /// MRs that received at least one new reviewer.
    pub assigned: usize,
    pub reviewers_added: usize,
    /// MRs left with fewer reviewers than required for lack of candidates.
    pub short_of_capacity: usize,
    pub messages_sent: usize,
    pub send_failures: usize,
    /// One entry per MR whose update failed.
    pub errors: Vec<String>,
    pub duration_ms: i64,
}

impl AssignmentReport {
    pub fn summary(&self) -> String {
        format!(
            "{} considered, {} assigned ({} reviewers), {} satisfied, {} skipped, {} short, {} errors",
            self.considered,
            self.assigned,
            self.reviewers_added,
            self.satisfied,
            self.skipped_labels + self.skipped_remote,
            self.short_of_capacity,
            self.errors.len()
        )
    }
}

enum MrOutcome {
    SkippedLabel,
    Satisfied,
    SkippedRemote,
    NoCandidates,
    Assigned {
        added: usize,
        short: bool,
        sent: usize,
        failed: usize,
    },
}

/// Runs assignment passes.
pub struct AssignmentEngine {
    pool: DbPool,
    code_review: Arc<dyn CodeReviewService>,
    chat: Arc<dyn ChatService>,
    selector: ReviewerSelector,
    config: AssignmentConfig,
    /// Only MRs created after this instant are considered.
    started_at: i64,
}

impl AssignmentEngine {
    pub fn new(
        pool: DbPool,
        code_review: Arc<dyn CodeReviewService>,
        chat: Arc<dyn ChatService>,
        selector: ReviewerSelector,
        config: AssignmentConfig,
        started_at: i64,
    ) -> Self {
        Self {
            pool,
            code_review,
            chat,
            selector,
            config,
            started_at,
        }
    }

    /// Run a single assignment pass.
    ///
    /// Fails only when the candidate MRs cannot be listed. Per-MR failures
    /// are logged, counted and retried on the next pass.
    pub async fn run_pass(&self) -> Result<AssignmentReport, AppError> {
        let start = Instant::now();
        let mut report = AssignmentReport::default();

        let mrs = merge_requests::list_assignment_candidates(&self.pool, self.started_at).await?;
        report.considered = mrs.len();
        let skip_labels = self.config.skip_labels();

        for mr in &mrs {
            match self.process_mr(mr, &skip_labels).await {
                Ok(MrOutcome::SkippedLabel) => report.skipped_labels += 1,
                Ok(MrOutcome::Satisfied) => report.satisfied += 1,
                Ok(MrOutcome::SkippedRemote) => report.skipped_remote += 1,
                Ok(MrOutcome::NoCandidates) => report.short_of_capacity += 1,
                Ok(MrOutcome::Assigned {
                    added,
                    short,
                    sent,
                    failed,
                }) => {
                    report.assigned += 1;
                    report.reviewers_added += added;
                    report.messages_sent += sent;
                    report.send_failures += failed;
                    if short {
                        report.short_of_capacity += 1;
                    }
                }
                Err(e) => {
                    log::warn!(
                        "[assign] !{} (MR {}) skipped, {} failure: {}",
                        mr.iid,
                        mr.id,
                        e.origin(),
                        e
                    );
                    report.errors.push(format!("MR {}: {}", mr.id, e));
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as i64;
        Ok(report)
    }

    async fn process_mr(
        &self,
        mr: &MergeRequest,
        skip_labels: &[String],
    ) -> Result<MrOutcome, AppError> {
        if mr.has_any_label(skip_labels) {
            log::debug!("[assign] !{} carries a release/block label", mr.iid);
            return Ok(MrOutcome::SkippedLabel);
        }

        let required = reviewer_config::get_assign_count(&self.pool, mr.repository_id).await?;
        let current = merge_requests::get_reviewers(&self.pool, mr.id).await?;
        if current.len() >= required {
            return Ok(MrOutcome::Satisfied);
        }

        let remote = self
            .code_review
            .get_merge_request(mr.repository_id, mr.iid)
            .await?;
        if !remote.accepts_reviewers() {
            log::info!(
                "[assign] !{} is {} on GitLab (draft={}), skipping",
                mr.iid,
                remote.state,
                remote.draft
            );
            return Ok(MrOutcome::SkippedRemote);
        }

        // Reviewers set directly in GitLab count toward the requirement.
        let current_ids: Vec<i64> = current.iter().map(|u| u.id).collect();
        let assigned_ids =
            merge_reviewer_ids(&[remote.reviewer_ids.as_slice(), current_ids.as_slice()]);
        if assigned_ids.len() >= required {
            log::debug!(
                "[assign] !{}: {} reviewer(s) already set on GitLab",
                mr.iid,
                assigned_ids.len()
            );
            return Ok(MrOutcome::Satisfied);
        }
        let needed = required - assigned_ids.len();

        let exclude: HashSet<i64> = assigned_ids.iter().copied().collect();
        let selection = self.selector.select(mr, needed, &exclude).await?;
        if selection.reviewers.is_empty() {
            log::info!(
                "[assign] !{}: no eligible reviewers ({} needed)",
                mr.iid,
                needed
            );
            return Ok(MrOutcome::NoCandidates);
        }

        let new_ids: Vec<i64> = selection.reviewers.iter().map(|u| u.id).collect();
        let push_ids = merge_reviewer_ids(&[assigned_ids.as_slice(), new_ids.as_slice()]);
        self.code_review
            .update_reviewers(mr.repository_id, mr.iid, &push_ids)
            .await?;

        merge_requests::add_reviewers(&self.pool, mr.id, &new_ids, crate::db::now()).await?;
        log::info!(
            "[assign] !{}: added {} reviewer(s), {} of {} required",
            mr.iid,
            new_ids.len(),
            push_ids.len(),
            required
        );

        let (sent, failed) = self
            .announce(mr, &selection.reviewers, !assigned_ids.is_empty())
            .await;

        Ok(MrOutcome::Assigned {
            added: new_ids.len(),
            short: selection.shortfall() > 0,
            sent,
            failed,
        })
    }

    /// Broadcast to subscribed chats and DM each new reviewer.
    ///
    /// Returns `(sent, failed)`. Send failures never undo the assignment.
    async fn announce(&self, mr: &MergeRequest, new_reviewers: &[User], backfill: bool) -> (usize, usize) {
        let mut sent = 0;
        let mut failed = 0;

        let broadcast = messages::assignment_broadcast(mr, new_reviewers, backfill);
        match subscriptions::subscriptions_for_repository(&self.pool, mr.repository_id).await {
            Ok(subs) => {
                for sub in subs {
                    match self.chat.send_message(&sub.chat_id, &broadcast).await {
                        Ok(()) => sent += 1,
                        Err(e) => {
                            failed += 1;
                            log::warn!("[assign] broadcast to {} failed: {}", sub.chat_id, e);
                        }
                    }
                }
            }
            Err(e) => {
                failed += 1;
                log::warn!("[assign] !{}: could not load chat subscriptions: {}", mr.iid, e);
            }
        }

        let dm = messages::review_request(mr);
        for reviewer in new_reviewers {
            let Some(target) = reviewer.dm_target() else {
                log::debug!("[assign] {} has no chat identity, no DM", reviewer.username);
                continue;
            };
            match self.chat.send_message(target, &dm).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    failed += 1;
                    log::warn!("[assign] DM to {} failed: {}", reviewer.username, e);
                }
            }
        }

        (sent, failed)
    }
}

/// Ordered union of reviewer ID lists.
fn merge_reviewer_ids(lists: &[&[i64]]) -> Vec<i64> {
    let mut seen = HashSet::new();
    lists
        .iter()
        .flat_map(|ids| ids.iter().copied())
        .filter(|id| seen.insert(*id))
        .collect()
}
