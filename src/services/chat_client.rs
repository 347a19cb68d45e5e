//! Chat-bot HTTP client.
//!
//! Talks to a bot API of the form `GET {base}/messages/sendText?token=..&chatId=..&text=..`
//! that answers `{"ok": true}` or `{"ok": false, "description": "..."}`.
//! Group chats and direct chats share the same endpoint; a user's direct chat
//! ID is their email.

use crate::error::AppError;
use crate::services::remote::ChatService;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

/// Chat client configuration.
#[derive(Debug, Clone)]
pub struct ChatClientConfig {
    /// Bot API base URL, without the method path.
    pub base_url: String,
    pub token: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    config: ChatClientConfig,
}

/// Envelope returned by every bot API method.
#[derive(Debug, Clone, Deserialize)]
struct ChatApiResponse {
    ok: bool,
    description: Option<String>,
}

impl ChatClient {
    pub fn new(config: ChatClientConfig) -> Result<Self, AppError> {
        if config.base_url.trim().is_empty() {
            return Err(AppError::invalid_input_field(
                "Chat API URL is empty",
                "CHAT_API_URL",
            ));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), method)
    }
}

/// Check a bot API reply for a chat-level failure.
fn check_reply(status: StatusCode, body: &str, chat_id: &str) -> Result<(), AppError> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(AppError::authentication("Chat bot token rejected"));
    }

    match serde_json::from_str::<ChatApiResponse>(body) {
        Ok(reply) if reply.ok && status.is_success() => Ok(()),
        Ok(reply) => Err(AppError::chat_api(
            reply
                .description
                .unwrap_or_else(|| format!("send failed ({})", status.as_u16())),
            chat_id,
        )),
        Err(_) if !status.is_success() => Err(AppError::chat_api(
            format!("send failed ({}): {}", status.as_u16(), body),
            chat_id,
        )),
        Err(e) => Err(AppError::chat_api(
            format!("unreadable reply: {}", e),
            chat_id,
        )),
    }
}

#[async_trait]
impl ChatService for ChatClient {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), AppError> {
        let response = self
            .client
            .get(self.method_url("messages/sendText"))
            .query(&[
                ("token", self.config.token.as_str()),
                ("chatId", chat_id),
                ("text", text),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::network(format!("Failed to read chat reply: {}", e)))?;

        check_reply(status, &body, chat_id)
    }
}
