use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Activation phrase, matched case-insensitively anywhere in a finalized entry
pub const TRIGGER_PHRASE: &str = "hey assistant";

/// Speaker label for assistant replies
pub const ASSISTANT_SPEAKER: &str = "AI Assistant";

/// Appended when the assistant collaborator cannot produce a reply
pub const FALLBACK_REPLY: &str = "I'm having trouble processing that request right now.";

/// Reply used by the canned responder
const CANNED_REPLY: &str = "Hello! How can I help you with this meeting?";

/// Delay before the canned responder answers
const CANNED_REPLY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("assistant request failed: {0}")]
    Request(String),

    #[error("assistant declined: {0}")]
    Declined(String),
}

/// Produces a reply when the activation phrase is spoken.
///
/// The engine appends whatever this returns as an "AI Assistant" entry; an
/// error is mapped to [`FALLBACK_REPLY`] so the trigger never goes silent.
#[async_trait::async_trait]
pub trait AssistantResponder: Send + Sync {
    async fn respond(&self, message: &str, context: &[String]) -> Result<String, AssistantError>;
}

/// Scripted responder: fixed reply after a short fixed delay.
pub struct CannedResponder;

#[async_trait::async_trait]
impl AssistantResponder for CannedResponder {
    async fn respond(&self, _message: &str, _context: &[String]) -> Result<String, AssistantError> {
        tokio::time::sleep(CANNED_REPLY_DELAY).await;
        Ok(CANNED_REPLY.to_string())
    }
}

#[derive(Debug, Serialize)]
struct AssistantRequest<'a> {
    message: &'a str,
    context: &'a [String],
}

#[derive(Debug, Deserialize)]
struct AssistantResponse {
    success: bool,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Responder backed by the assistant collaborator endpoint.
pub struct RemoteResponder {
    url: String,
    client: reqwest::Client,
}

impl RemoteResponder {
    pub fn new(url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { url, client }
    }
}

#[async_trait::async_trait]
impl AssistantResponder for RemoteResponder {
    async fn respond(&self, message: &str, context: &[String]) -> Result<String, AssistantError> {
        let response = self
            .client
            .post(&self.url)
            .json(&AssistantRequest { message, context })
            .send()
            .await
            .map_err(|e| AssistantError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AssistantError::Request(format!(
                "status {}",
                response.status()
            )));
        }

        let body: AssistantResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Request(e.to_string()))?;

        if !body.success {
            let reason = body.error.unwrap_or_else(|| "no reason given".to_string());
            warn!("Assistant declined request: {}", reason);
            return Err(AssistantError::Declined(reason));
        }

        body.response
            .ok_or_else(|| AssistantError::Declined("empty response".to_string()))
    }
}
