//! Shared setup for integration tests: a temporary database and seed helpers.

#![allow(dead_code)]

pub mod mock_services;

use mock_services::{MockChat, MockCodeReview};
use reviewbot::config::{AssignmentConfig, NotificationConfig};
use reviewbot::db::pool::DbPool;
use reviewbot::db::{merge_requests, reviewer_config, subscriptions, users};
use reviewbot::models::{MergeRequest, MergeRequestState, NewMergeRequest, Repository, User};
use reviewbot::services::{
    AssignmentEngine, NotificationEngine, ReviewerSelector, SharedRng, WeightedSelector,
};
use std::sync::Arc;
use tempfile::TempDir;

pub const REPO: i64 = 10;
pub const CHAT: &str = "team-chat";

/// Temporary database that lives as long as the value.
pub struct TestDb {
    pub pool: DbPool,
    _dir: TempDir,
}

pub async fn setup_db() -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let pool = reviewbot::db::initialize(&dir.path().join("test.db"))
        .await
        .unwrap();
    TestDb { pool, _dir: dir }
}

/// User with an email chat identity.
pub async fn add_user(pool: &DbPool, id: i64, username: &str) -> User {
    let address = email(username);
    add_user_with(pool, id, username, Some(address.as_str()), false).await
}

pub async fn add_user_with(
    pool: &DbPool,
    id: i64,
    username: &str,
    email: Option<&str>,
    on_vacation: bool,
) -> User {
    let user = User {
        id,
        username: username.to_string(),
        name: capitalize(username),
        email: email.map(String::from),
        on_vacation,
    };
    users::upsert_user(pool, &user).await.unwrap();
    user
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Repository, optionally subscribed to [`CHAT`].
pub async fn add_repository(pool: &DbPool, id: i64, subscribed: bool) {
    subscriptions::upsert_repository(
        pool,
        &Repository {
            id,
            path_with_namespace: format!("team/repo-{}", id),
            web_url: format!("https://gitlab.example.com/team/repo-{}", id),
        },
    )
    .await
    .unwrap();

    if subscribed {
        subscriptions::subscribe(pool, CHAT, id).await.unwrap();
    }
}

pub fn new_mr(id: i64, repository_id: i64, author_id: i64, labels: &[&str]) -> NewMergeRequest {
    NewMergeRequest {
        id,
        iid: id,
        repository_id,
        title: format!("Change {}", id),
        description: None,
        source_branch: format!("feature-{}", id),
        target_branch: "main".to_string(),
        state: MergeRequestState::Opened,
        draft: false,
        author_id,
        labels: labels.iter().map(|l| l.to_string()).collect(),
        web_url: format!("https://gitlab.example.com/team/repo-{}/-/merge_requests/{}", repository_id, id),
        created_at: reviewbot::db::now(),
    }
}

/// Open MR created now.
pub async fn add_mr(
    pool: &DbPool,
    id: i64,
    repository_id: i64,
    author_id: i64,
    labels: &[&str],
) -> MergeRequest {
    insert_mr(pool, new_mr(id, repository_id, author_id, labels)).await
}

pub async fn insert_mr(pool: &DbPool, mr: NewMergeRequest) -> MergeRequest {
    merge_requests::upsert_merge_request(pool, &mr).await.unwrap();
    merge_requests::get_merge_request(pool, mr.id).await.unwrap()
}

pub async fn set_state(pool: &DbPool, mr_id: i64, state: MergeRequestState) {
    let mr = merge_requests::get_merge_request(pool, mr_id).await.unwrap();
    let mut update = new_mr(mr.id, mr.repository_id, mr.author_id, &[]);
    update.labels = mr.labels_vec();
    update.created_at = mr.created_at;
    update.state = state;
    merge_requests::upsert_merge_request(pool, &update).await.unwrap();
}

/// Give `user_id` `count` recent reviews on throwaway MRs in an
/// unsubscribed repository.
pub async fn add_recent_reviews(pool: &DbPool, user_id: i64, author_id: i64, count: i64, first_id: i64) {
    add_repository(pool, 999, false).await;
    for i in 0..count {
        let mr = add_mr(pool, first_id + i, 999, author_id, &[]).await;
        merge_requests::add_reviewers(pool, mr.id, &[user_id], mr.created_at)
            .await
            .unwrap();
    }
}

pub async fn label_reviewers(pool: &DbPool, repository_id: i64, label: &str, user_ids: &[i64]) {
    for id in user_ids {
        reviewer_config::add_label_reviewer(pool, repository_id, label, *id)
            .await
            .unwrap();
    }
}

pub async fn default_pool(pool: &DbPool, repository_id: i64, user_ids: &[i64]) {
    for id in user_ids {
        reviewer_config::add_possible_reviewer(pool, repository_id, *id)
            .await
            .unwrap();
    }
}

pub fn reviewer_selector(pool: &DbPool, seed: u64) -> ReviewerSelector {
    ReviewerSelector::new(
        pool.clone(),
        WeightedSelector::new(SharedRng::seeded(seed)),
        AssignmentConfig::default().workload_window_days,
    )
}

/// Assignment engine that considers MRs created in the last hour.
pub fn assignment_engine(
    pool: &DbPool,
    code_review: &Arc<MockCodeReview>,
    chat: &Arc<MockChat>,
) -> AssignmentEngine {
    seeded_assignment_engine(pool, code_review, chat, 7)
}

pub fn seeded_assignment_engine(
    pool: &DbPool,
    code_review: &Arc<MockCodeReview>,
    chat: &Arc<MockChat>,
    seed: u64,
) -> AssignmentEngine {
    AssignmentEngine::new(
        pool.clone(),
        code_review.clone(),
        chat.clone(),
        reviewer_selector(pool, seed),
        AssignmentConfig::default(),
        reviewbot::db::now() - 3600,
    )
}

pub fn notification_engine(pool: &DbPool, chat: &Arc<MockChat>) -> NotificationEngine {
    NotificationEngine::new(pool.clone(), chat.clone(), NotificationConfig::default())
}

pub fn email(username: &str) -> String {
    format!("{}@example.com", username)
}
