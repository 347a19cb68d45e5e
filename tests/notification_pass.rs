//! Review-state and single-shot notification passes.

mod common;

use common::mock_services::MockChat;
use common::*;
use reviewbot::db::pool::DbPool;
use reviewbot::db::{actions, comments, merge_requests};
use reviewbot::models::{ActionType, MergeRequestState, MrComment, NewMrAction, ReviewState};
use std::sync::Arc;

const AUTHOR: i64 = 1;
const ALICE: i64 = 2;
const BOB: i64 = 3;
const MR: i64 = 100;

/// MR 100 by `author`, reviewed by alice and bob.
async fn seed(pool: &DbPool) {
    add_repository(pool, REPO, true).await;
    add_user(pool, AUTHOR, "author").await;
    add_user(pool, ALICE, "alice").await;
    add_user(pool, BOB, "bob").await;
    let mr = add_mr(pool, MR, REPO, AUTHOR, &[]).await;
    merge_requests::add_reviewers(pool, mr.id, &[ALICE, BOB], mr.created_at)
        .await
        .unwrap();
}

async fn comment(pool: &DbPool, id: i64, resolvable: bool, resolved: bool) {
    let now = reviewbot::db::now();
    comments::upsert_comment(
        pool,
        &MrComment {
            id,
            mr_id: MR,
            author_id: ALICE,
            body: format!("comment {}", id),
            resolvable,
            resolved,
            resolved_by_id: resolved.then_some(AUTHOR),
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .unwrap();
}

async fn action(pool: &DbPool, action_type: ActionType, target_user_id: Option<i64>) -> i64 {
    action_at(pool, action_type, target_user_id, reviewbot::db::now()).await
}

async fn action_at(
    pool: &DbPool,
    action_type: ActionType,
    target_user_id: Option<i64>,
    created_at: i64,
) -> i64 {
    actions::enqueue_action(
        pool,
        NewMrAction {
            mr_id: MR,
            action_type,
            actor_id: Some(ALICE),
            target_user_id,
            created_at,
        },
    )
    .await
    .unwrap()
    .id
}

async fn notified_state(pool: &DbPool) -> ReviewState {
    merge_requests::get_merge_request(pool, MR)
        .await
        .unwrap()
        .notified_state()
}

#[tokio::test]
async fn test_review_cycle_notifies_once_per_transition() {
    let db = setup_db().await;
    let pool = &db.pool;
    seed(pool).await;
    let chat = Arc::new(MockChat::new());
    let engine = notification_engine(pool, &chat);

    // Plain comment: first state is recorded without messages.
    comment(pool, 1, false, false).await;
    action(pool, ActionType::CommentAdded, None).await;
    let report = engine.run_review_state_pass().await.unwrap();
    assert_eq!(report.transitions, 1);
    assert_eq!(report.actions_notified, 1);
    assert!(chat.sent().is_empty());
    assert_eq!(notified_state(pool).await, ReviewState::OnReview);

    // Unresolved thread: the author hears about it.
    comment(pool, 2, true, false).await;
    action(pool, ActionType::CommentAdded, None).await;
    engine.run_review_state_pass().await.unwrap();
    let to_author = chat.messages_to(&email("author"));
    assert_eq!(to_author.len(), 1);
    assert!(to_author[0].starts_with("Your merge request needs fixes"));
    assert_eq!(notified_state(pool).await, ReviewState::OnFixes);

    // More comments while still on fixes: nothing new.
    comment(pool, 3, true, false).await;
    action(pool, ActionType::CommentAdded, None).await;
    let report = engine.run_review_state_pass().await.unwrap();
    assert_eq!(report.transitions, 0);
    assert_eq!(chat.sent().len(), 1);

    // Everything resolved; bob already approved, so only alice is told.
    merge_requests::add_approver(pool, MR, BOB, reviewbot::db::now())
        .await
        .unwrap();
    comment(pool, 2, true, true).await;
    comment(pool, 3, true, true).await;
    action(pool, ActionType::CommentResolved, None).await;
    action(pool, ActionType::CommentResolved, None).await;
    let report = engine.run_review_state_pass().await.unwrap();
    assert_eq!(report.transitions, 1);
    assert_eq!(report.actions_notified, 2);
    assert_eq!(report.messages_sent, 1);

    let to_alice = chat.messages_to(&email("alice"));
    assert_eq!(to_alice.len(), 1);
    assert!(to_alice[0].starts_with("Threads resolved, ready for re-review"));
    assert!(chat.messages_to(&email("bob")).is_empty());
    assert_eq!(notified_state(pool).await, ReviewState::OnReview);

    assert_eq!(actions::pending_count(pool).await.unwrap(), 0);

    // Nothing pending: a further pass is quiet.
    let report = engine.run_review_state_pass().await.unwrap();
    assert_eq!(report, reviewbot::services::NotificationReport {
        duration_ms: report.duration_ms,
        ..Default::default()
    });
}

#[tokio::test]
async fn test_batch_of_actions_yields_one_message() {
    let db = setup_db().await;
    let pool = &db.pool;
    seed(pool).await;
    let chat = Arc::new(MockChat::new());

    comment(pool, 1, true, false).await;
    comment(pool, 2, true, false).await;
    for _ in 0..3 {
        action(pool, ActionType::CommentAdded, None).await;
    }

    let report = notification_engine(pool, &chat)
        .run_review_state_pass()
        .await
        .unwrap();

    assert_eq!(report.actions_notified, 3);
    assert_eq!(report.transitions, 1);
    assert_eq!(chat.sent().len(), 1);
}

#[tokio::test]
async fn test_closed_mr_actions_are_closed_out_silently() {
    let db = setup_db().await;
    let pool = &db.pool;
    seed(pool).await;
    set_state(pool, MR, MergeRequestState::Merged).await;
    let chat = Arc::new(MockChat::new());

    comment(pool, 1, true, false).await;
    action(pool, ActionType::CommentAdded, None).await;

    let report = notification_engine(pool, &chat)
        .run_review_state_pass()
        .await
        .unwrap();

    assert_eq!(report.closed_skipped, 1);
    assert_eq!(report.actions_notified, 1);
    assert!(chat.sent().is_empty());
    assert_eq!(notified_state(pool).await, ReviewState::Unset);
    assert_eq!(actions::pending_count(pool).await.unwrap(), 0);
}

#[tokio::test]
async fn test_stale_actions_are_swept_without_evaluation() {
    let db = setup_db().await;
    let pool = &db.pool;
    seed(pool).await;
    let chat = Arc::new(MockChat::new());

    comment(pool, 1, true, false).await;
    let two_hours_ago = reviewbot::db::now() - 7200;
    action_at(pool, ActionType::CommentAdded, None, two_hours_ago).await;
    action_at(pool, ActionType::Merged, None, two_hours_ago).await;
    action_at(pool, ActionType::Other, None, two_hours_ago).await;

    let engine = notification_engine(pool, &chat);
    let report = engine.run_review_state_pass().await.unwrap();

    assert_eq!(report.stale_swept, 3);
    assert_eq!(report.transitions, 0);
    assert!(chat.sent().is_empty());
    assert_eq!(notified_state(pool).await, ReviewState::Unset);

    let single = engine.run_single_shot_pass().await.unwrap();
    assert_eq!(single.actions_notified, 0);
    assert!(chat.sent().is_empty());
}

#[tokio::test]
async fn test_author_without_chat_identity_still_moves_state() {
    let db = setup_db().await;
    let pool = &db.pool;
    seed(pool).await;
    add_user_with(pool, AUTHOR, "author", None, false).await;
    let chat = Arc::new(MockChat::new());

    comment(pool, 1, true, false).await;
    action(pool, ActionType::CommentAdded, None).await;

    let report = notification_engine(pool, &chat)
        .run_review_state_pass()
        .await
        .unwrap();

    assert_eq!(report.transitions, 1);
    assert_eq!(report.recipients_skipped, 1);
    assert!(chat.sent().is_empty());
    assert_eq!(notified_state(pool).await, ReviewState::OnFixes);
    assert_eq!(actions::pending_count(pool).await.unwrap(), 0);
}

#[tokio::test]
async fn test_state_already_moved_is_not_announced_again() {
    let db = setup_db().await;
    let pool = &db.pool;
    seed(pool).await;
    let chat = Arc::new(MockChat::new());
    let engine = notification_engine(pool, &chat);

    comment(pool, 1, true, false).await;
    action(pool, ActionType::CommentAdded, None).await;
    engine.run_review_state_pass().await.unwrap();
    assert_eq!(chat.sent().len(), 1);

    // A second engine sharing the store sees the recorded state.
    action(pool, ActionType::CommentAdded, None).await;
    let other = notification_engine(pool, &chat);
    let report = other.run_review_state_pass().await.unwrap();
    assert_eq!(report.transitions, 0);
    assert_eq!(chat.sent().len(), 1);
}

#[tokio::test]
async fn test_single_shot_actions_reach_their_recipient() {
    let db = setup_db().await;
    let pool = &db.pool;
    seed(pool).await;
    let chat = Arc::new(MockChat::new());

    action(pool, ActionType::ReviewerRemoved, Some(BOB)).await;
    action(pool, ActionType::FullyApproved, None).await;
    action(pool, ActionType::Merged, None).await;
    action(pool, ActionType::Other, None).await;
    action(pool, ActionType::CommentAdded, None).await;

    let engine = notification_engine(pool, &chat);
    let report = engine.run_single_shot_pass().await.unwrap();

    assert_eq!(report.actions_notified, 3);
    assert_eq!(report.messages_sent, 3);

    let to_bob = chat.messages_to(&email("bob"));
    assert_eq!(to_bob.len(), 1);
    assert!(to_bob[0].starts_with("You were removed from the reviewers"));

    let to_author = chat.messages_to(&email("author"));
    assert_eq!(to_author.len(), 2);
    assert!(to_author[0].starts_with("Your merge request is fully approved"));
    assert!(to_author[1].starts_with("Your merge request was merged"));

    // The comment action belongs to the review-state pass; `other` is left
    // for the staleness sweep.
    assert_eq!(actions::pending_count(pool).await.unwrap(), 2);

    let again = engine.run_single_shot_pass().await.unwrap();
    assert_eq!(again.actions_notified, 0);
    assert_eq!(chat.sent().len(), 3);
}

#[tokio::test]
async fn test_single_shot_without_recipient_is_still_closed_out() {
    let db = setup_db().await;
    let pool = &db.pool;
    seed(pool).await;
    add_user_with(pool, 9, "ghost", None, false).await;
    let chat = Arc::new(MockChat::new());

    action(pool, ActionType::ReviewerRemoved, Some(9)).await;
    action(pool, ActionType::ReviewerRemoved, None).await;
    action(pool, ActionType::ReviewerRemoved, Some(4242)).await;

    let report = notification_engine(pool, &chat)
        .run_single_shot_pass()
        .await
        .unwrap();

    assert_eq!(report.actions_notified, 3);
    assert_eq!(report.recipients_skipped, 3);
    assert!(chat.sent().is_empty());
    assert_eq!(actions::pending_count(pool).await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_send_is_not_retried() {
    let db = setup_db().await;
    let pool = &db.pool;
    seed(pool).await;
    let chat = Arc::new(MockChat::new());
    chat.fail_chat(&email("author"));

    action(pool, ActionType::Merged, None).await;

    let engine = notification_engine(pool, &chat);
    let report = engine.run_single_shot_pass().await.unwrap();
    assert_eq!(report.send_failures, 1);
    assert_eq!(report.actions_notified, 1);

    engine.run_single_shot_pass().await.unwrap();
    assert_eq!(chat.sent().len(), 1);
}
