//! Eligible reviewers for a merge request.
//!
//! Label groups come from `label_reviewers` for the labels on the MR; the
//! default pool comes from `possible_reviewers`. The author, anyone on
//! vacation and the caller's exclusion set are removed from both. A user may
//! sit in several label groups; deduplication happens during selection.

use crate::db::pool::DbPool;
use crate::db::reviewer_config::{self, LabelMember};
use crate::error::AppError;
use crate::models::{MergeRequest, User};
use std::collections::{BTreeMap, HashSet};

/// Candidate reviewers for one MR.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidatePools {
    /// Label name to eligible users. Labels with no eligible users are absent.
    pub label_groups: BTreeMap<String, Vec<User>>,
    pub default_pool: Vec<User>,
}

impl CandidatePools {
    /// Every distinct user across the label groups and the default pool.
    pub fn all_user_ids(&self) -> Vec<i64> {
        let mut seen = HashSet::new();
        self.label_groups
            .values()
            .flatten()
            .chain(self.default_pool.iter())
            .filter(|u| seen.insert(u.id))
            .map(|u| u.id)
            .collect()
    }
}

/// Load and filter the candidate pools for `mr`.
pub async fn resolve(
    pool: &DbPool,
    mr: &MergeRequest,
    exclude: &HashSet<i64>,
) -> Result<CandidatePools, AppError> {
    let labels = mr.labels_vec();
    let members = reviewer_config::get_label_members(pool, mr.repository_id, &labels).await?;
    let possible = reviewer_config::get_possible_reviewers(pool, mr.repository_id).await?;

    Ok(build_pools(mr.author_id, members, possible, exclude))
}

/// Apply the exclusion rules to configured reviewers.
pub fn build_pools(
    author_id: i64,
    label_members: Vec<LabelMember>,
    possible: Vec<User>,
    exclude: &HashSet<i64>,
) -> CandidatePools {
    let eligible = |u: &User| u.id != author_id && !u.on_vacation && !exclude.contains(&u.id);

    let mut label_groups: BTreeMap<String, Vec<User>> = BTreeMap::new();
    for LabelMember { label, user } in label_members {
        if eligible(&user) {
            let group = label_groups.entry(label).or_default();
            if !group.iter().any(|u| u.id == user.id) {
                group.push(user);
            }
        }
    }

    let mut default_pool: Vec<User> = Vec::new();
    for user in possible {
        if eligible(&user) && !default_pool.iter().any(|u| u.id == user.id) {
            default_pool.push(user);
        }
    }

    CandidatePools {
        label_groups,
        default_pool,
    }
}
