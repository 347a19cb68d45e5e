//! GitLab API client.
//!
//! Provides the HTTP client for GitLab API v4 used to read an MR's live state
//! and push its reviewer set.

use crate::error::AppError;
use crate::models::MergeRequestState;
use crate::services::remote::{CodeReviewService, RemoteMergeRequest};
use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// GitLab API client configuration.
#[derive(Debug, Clone)]
pub struct GitLabClientConfig {
    /// Base URL of the GitLab instance (e.g., `https://gitlab.com`).
    pub base_url: String,

    /// Personal or bot access token.
    pub token: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GitLabClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            timeout_secs: 30,
        }
    }
}

/// GitLab API client.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    client: Client,
    config: GitLabClientConfig,
}

/// GitLab merge request from API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabMergeRequest {
    pub id: i64,
    pub iid: i64,
    pub project_id: i64,
    pub title: String,
    pub state: String,
    pub web_url: String,
    /// Present on GitLab 14+.
    pub draft: Option<bool>,
    /// Pre-14 name of `draft`.
    pub work_in_progress: Option<bool>,
    pub labels: Vec<String>,
    pub reviewers: Option<Vec<GitLabUser>>,
}

/// GitLab user from API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabUser {
    pub id: i64,
    pub username: String,
    pub name: String,
}

/// Body of the reviewer update request.
#[derive(Debug, Serialize)]
struct UpdateReviewersBody<'a> {
    reviewer_ids: &'a [i64],
}

impl From<GitLabMergeRequest> for RemoteMergeRequest {
    fn from(mr: GitLabMergeRequest) -> Self {
        Self {
            id: mr.id,
            iid: mr.iid,
            project_id: mr.project_id,
            state: MergeRequestState::from(mr.state.as_str()),
            draft: mr.draft.or(mr.work_in_progress).unwrap_or(false),
            reviewer_ids: mr
                .reviewers
                .unwrap_or_default()
                .into_iter()
                .map(|u| u.id)
                .collect(),
        }
    }
}

impl GitLabClient {
    /// Create a new GitLab client.
    pub fn new(config: GitLabClientConfig) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();

        let token_value = header::HeaderValue::from_str(&config.token)
            .map_err(|_| AppError::authentication("Invalid token format"))?;
        headers.insert("PRIVATE-TOKEN", token_value);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the base URL for API requests.
    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/api/v4{}",
            self.config.base_url.trim_end_matches('/'),
            path
        )
    }

    /// Handle API response errors.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
        endpoint: &str,
    ) -> Result<T, AppError> {
        let status = response.status();

        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| AppError::internal(format!("Failed to parse response: {}", e)))
        } else if status == StatusCode::UNAUTHORIZED {
            Err(AppError::authentication(
                "GitLab token expired or revoked",
            ))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AppError::gitlab_api_full(
                error_message(status, &body),
                status.as_u16(),
                endpoint,
            ))
        }
    }

    /// Get a single merge request by project and IID.
    pub async fn get_merge_request(
        &self,
        project_id: i64,
        mr_iid: i64,
    ) -> Result<GitLabMergeRequest, AppError> {
        let endpoint = format!("/projects/{}/merge_requests/{}", project_id, mr_iid);
        let url = self.api_url(&endpoint);
        let response = self.client.get(&url).send().await?;
        self.handle_response(response, &endpoint).await
    }

    /// Replace the reviewers of a merge request.
    pub async fn set_reviewers(
        &self,
        project_id: i64,
        mr_iid: i64,
        reviewer_ids: &[i64],
    ) -> Result<GitLabMergeRequest, AppError> {
        let endpoint = format!("/projects/{}/merge_requests/{}", project_id, mr_iid);
        let url = self.api_url(&endpoint);
        let response = self
            .client
            .put(&url)
            .json(&UpdateReviewersBody { reviewer_ids })
            .send()
            .await?;
        self.handle_response(response, &endpoint).await
    }
}

/// Turn a failed response into a readable message.
///
/// GitLab returns errors as `{"message": ...}` or `{"error": ...}`, where
/// `message` is sometimes an object like `{"base": ["msg"]}`.
fn error_message(status: StatusCode, body: &str) -> String {
    let body_message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message").or_else(|| v.get("error")).map(|m| match m.as_str() {
                Some(s) => s.to_string(),
                None => m.to_string(),
            })
        });

    match (status, body_message) {
        (StatusCode::FORBIDDEN, _) => "Access denied".to_string(),
        (StatusCode::NOT_FOUND, _) => "Resource not found".to_string(),
        (StatusCode::TOO_MANY_REQUESTS, _) => "Rate limit exceeded".to_string(),
        (_, Some(msg)) => msg,
        _ => format!("Request failed ({}): {}", status.as_u16(), body),
    }
}

#[async_trait]
impl CodeReviewService for GitLabClient {
    async fn get_merge_request(
        &self,
        project_id: i64,
        iid: i64,
    ) -> Result<RemoteMergeRequest, AppError> {
        GitLabClient::get_merge_request(self, project_id, iid)
            .await
            .map(RemoteMergeRequest::from)
    }

    async fn update_reviewers(
        &self,
        project_id: i64,
        iid: i64,
        reviewer_ids: &[i64],
    ) -> Result<(), AppError> {
        self.set_reviewers(project_id, iid, reviewer_ids).await?;
        Ok(())
    }
}
