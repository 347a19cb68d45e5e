//! GitLab review bot.
//!
//! Assigns reviewers to new merge requests by label and workload, and tells
//! people in chat when an MR moves between review and fixes.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

use config::Config;
use error::AppError;
use services::{
    AssignmentEngine, ChatClient, ChatClientConfig, GitLabClient, GitLabClientConfig,
    NotificationEngine, ReviewerSelector, Scheduler, SharedRng, WeightedSelector,
};
use std::sync::Arc;

/// Open the store, start the background passes and run until Ctrl-C.
pub async fn run(config: Config) -> Result<(), AppError> {
    let pool = db::initialize(&config.database_path).await?;
    log::info!("[reviewbot] database ready at {}", config.database_path.display());

    let timeout_secs = config.http_timeout.as_secs();
    let gitlab = Arc::new(GitLabClient::new(GitLabClientConfig {
        base_url: config.gitlab_url.clone(),
        token: config.gitlab_token.clone(),
        timeout_secs,
    })?);
    let chat = Arc::new(ChatClient::new(ChatClientConfig {
        base_url: config.chat_api_url.clone(),
        token: config.chat_bot_token.clone(),
        timeout_secs,
    })?);

    let selector = ReviewerSelector::new(
        pool.clone(),
        WeightedSelector::new(SharedRng::from_seed(config.rng_seed)),
        config.assignment.workload_window_days,
    );
    let assignment = Arc::new(AssignmentEngine::new(
        pool.clone(),
        gitlab,
        chat.clone(),
        selector,
        config.assignment.clone(),
        db::now(),
    ));
    let notification = Arc::new(NotificationEngine::new(
        pool.clone(),
        chat,
        config.notification.clone(),
    ));

    let handle = Scheduler::start(pool, assignment, notification, &config.scheduler);

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::internal(format!("Failed to listen for Ctrl-C: {}", e)))?;
    log::info!("[reviewbot] shutting down");

    handle.shutdown().await;
    Ok(())
}
