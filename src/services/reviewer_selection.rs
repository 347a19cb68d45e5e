//! Reviewer selection: label groups first, then everyone else.
//!
//! Phase 1 takes at most one reviewer per label group, walking labels in
//! lexicographic order and never reusing a user. It stops early once
//! `min_count` users are picked, so a selection never exceeds the request.
//! When an MR has more label groups than `min_count`, only the first
//! `min_count` labels in that order get a pick; later labels are covered
//! only through Phase 2 leftovers, which never run in that case.
//!
//! Phase 2 fills the remaining need from the leftover label members plus the
//! default pool. An MR without label groups draws straight from the default
//! pool.

use crate::db::pool::DbPool;
use crate::db::workload::{self, Workload};
use crate::error::AppError;
use crate::models::{MergeRequest, User};
use crate::services::candidate_pool::{self, CandidatePools};
use crate::services::selector::WeightedSelector;
use std::collections::HashSet;

const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Outcome of one selection call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Distinct users, in pick order.
    pub reviewers: Vec<User>,
    pub requested: usize,
}

impl Selection {
    /// How many reviewers could not be found.
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.reviewers.len())
    }
}

/// Reviewer selection over the store.
#[derive(Debug, Clone)]
pub struct ReviewerSelector {
    pool: DbPool,
    selector: WeightedSelector,
    workload_window_days: i64,
}

impl ReviewerSelector {
    pub fn new(pool: DbPool, selector: WeightedSelector, workload_window_days: i64) -> Self {
        Self {
            pool,
            selector,
            workload_window_days,
        }
    }

    /// Select up to `min_count` reviewers for `mr`, never picking anyone in
    /// `exclude`.
    pub async fn select(
        &self,
        mr: &MergeRequest,
        min_count: usize,
        exclude: &HashSet<i64>,
    ) -> Result<Selection, AppError> {
        if min_count == 0 {
            return Ok(Selection {
                reviewers: Vec::new(),
                requested: 0,
            });
        }

        let pools = candidate_pool::resolve(&self.pool, mr, exclude).await?;
        let since = crate::db::now()
            .saturating_sub(self.workload_window_days.saturating_mul(SECS_PER_DAY));
        let workload =
            workload::recent_assignment_counts(&self.pool, &pools.all_user_ids(), since).await?;

        let reviewers = select_from_pools(&self.selector, &pools, min_count, &workload);
        for (label, group) in &pools.label_groups {
            if !group.iter().any(|u| reviewers.contains(u)) {
                log::debug!("[assign] !{}: no pick from label '{}'", mr.iid, label);
            }
        }

        Ok(Selection {
            reviewers,
            requested: min_count,
        })
    }
}

/// Run both selection phases over resolved pools.
pub fn select_from_pools(
    selector: &WeightedSelector,
    pools: &CandidatePools,
    min_count: usize,
    workload: &Workload,
) -> Vec<User> {
    if pools.label_groups.is_empty() {
        return selector.pick_many(&pools.default_pool, min_count, workload);
    }

    let mut selected: Vec<User> = Vec::new();
    let is_selected = |selected: &[User], user: &User| selected.iter().any(|s| s.id == user.id);

    for group in pools.label_groups.values() {
        if selected.len() >= min_count {
            break;
        }
        let remaining: Vec<User> = group
            .iter()
            .filter(|u| !is_selected(&selected, u))
            .cloned()
            .collect();
        if let Some(user) = selector.pick_one(&remaining, workload) {
            selected.push(user);
        }
    }

    if selected.len() < min_count {
        let mut combined: Vec<User> = Vec::new();
        for user in pools
            .label_groups
            .values()
            .flatten()
            .chain(pools.default_pool.iter())
        {
            if !is_selected(&selected, user) && !is_selected(&combined, user) {
                combined.push(user.clone());
            }
        }

        let need = min_count - selected.len();
        selected.extend(selector.pick_many(&combined, need, workload));
    }

    selected
}
