//! Test doubles for the remote services.

#![allow(dead_code)]

use async_trait::async_trait;
use reviewbot::error::AppError;
use reviewbot::models::MergeRequestState;
use reviewbot::services::{ChatService, CodeReviewService, RemoteMergeRequest};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Call record for `update_reviewers`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReviewersCall {
    pub project_id: i64,
    pub iid: i64,
    pub reviewer_ids: Vec<i64>,
}

/// In-memory code-review host.
///
/// Unknown MRs come back open, non-draft and without reviewers. A
/// successful `update_reviewers` is reflected by later `get_merge_request`
/// calls.
#[derive(Default)]
pub struct MockCodeReview {
    merge_requests: Mutex<HashMap<(i64, i64), RemoteMergeRequest>>,
    // Call tracking
    get_calls: Mutex<Vec<(i64, i64)>>,
    update_calls: Mutex<Vec<UpdateReviewersCall>>,
    // Error injection
    error_on_get: Mutex<Option<String>>,
    error_on_update: Mutex<Option<String>>,
}

impl MockCodeReview {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set what `get_merge_request` returns for an MR.
    pub fn set_merge_request(&self, mr: RemoteMergeRequest) {
        self.merge_requests
            .lock()
            .unwrap()
            .insert((mr.project_id, mr.iid), mr);
    }

    /// Shortcut for an MR with a given remote state and reviewers.
    pub fn set_remote_state(
        &self,
        project_id: i64,
        iid: i64,
        state: MergeRequestState,
        draft: bool,
        reviewer_ids: Vec<i64>,
    ) {
        self.set_merge_request(RemoteMergeRequest {
            id: iid,
            iid,
            project_id,
            state,
            draft,
            reviewer_ids,
        });
    }

    /// Make `get_merge_request` return an error
    pub fn fail_get(&self, msg: &str) {
        *self.error_on_get.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `update_reviewers` return an error
    pub fn fail_update(&self, msg: &str) {
        *self.error_on_update.lock().unwrap() = Some(msg.to_string());
    }

    pub fn clear_errors(&self) {
        *self.error_on_get.lock().unwrap() = None;
        *self.error_on_update.lock().unwrap() = None;
    }

    pub fn get_calls(&self) -> Vec<(i64, i64)> {
        self.get_calls.lock().unwrap().clone()
    }

    pub fn update_calls(&self) -> Vec<UpdateReviewersCall> {
        self.update_calls.lock().unwrap().clone()
    }

    /// Total remote calls of any kind.
    pub fn call_count(&self) -> usize {
        self.get_calls.lock().unwrap().len() + self.update_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CodeReviewService for MockCodeReview {
    async fn get_merge_request(
        &self,
        project_id: i64,
        iid: i64,
    ) -> Result<RemoteMergeRequest, AppError> {
        self.get_calls.lock().unwrap().push((project_id, iid));

        if let Some(msg) = self.error_on_get.lock().unwrap().as_ref() {
            return Err(AppError::gitlab_api(msg.clone()));
        }

        Ok(self
            .merge_requests
            .lock()
            .unwrap()
            .get(&(project_id, iid))
            .cloned()
            .unwrap_or(RemoteMergeRequest {
                id: iid,
                iid,
                project_id,
                state: MergeRequestState::Opened,
                draft: false,
                reviewer_ids: Vec::new(),
            }))
    }

    async fn update_reviewers(
        &self,
        project_id: i64,
        iid: i64,
        reviewer_ids: &[i64],
    ) -> Result<(), AppError> {
        self.update_calls.lock().unwrap().push(UpdateReviewersCall {
            project_id,
            iid,
            reviewer_ids: reviewer_ids.to_vec(),
        });

        if let Some(msg) = self.error_on_update.lock().unwrap().as_ref() {
            return Err(AppError::gitlab_api_full(
                msg.clone(),
                500,
                format!("/projects/{}/merge_requests/{}", project_id, iid),
            ));
        }

        let mut mrs = self.merge_requests.lock().unwrap();
        let entry = mrs.entry((project_id, iid)).or_insert(RemoteMergeRequest {
            id: iid,
            iid,
            project_id,
            state: MergeRequestState::Opened,
            draft: false,
            reviewer_ids: Vec::new(),
        });
        entry.reviewer_ids = reviewer_ids.to_vec();
        Ok(())
    }
}

/// A message that was handed to the chat service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: String,
    pub text: String,
}

/// Chat service that records every send.
///
/// Failed sends are recorded too, so tests can see what was attempted.
#[derive(Default)]
pub struct MockChat {
    sent: Mutex<Vec<SentMessage>>,
    failing_chats: Mutex<HashSet<String>>,
}

impl MockChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sends to `chat_id` fail.
    pub fn fail_chat(&self, chat_id: &str) {
        self.failing_chats.lock().unwrap().insert(chat_id.to_string());
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts sent to one chat, in order.
    pub fn messages_to(&self, chat_id: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .map(|m| m.text.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl ChatService for MockChat {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(SentMessage {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
        });

        if self.failing_chats.lock().unwrap().contains(chat_id) {
            return Err(AppError::chat_api("Chat not found", chat_id));
        }
        Ok(())
    }
}
