use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::call::{CallClient, CallError, ChatClient};
use crate::config::Config;

/// A minted credential, as returned by the issuer
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub user_id: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    token: String,
    user_id: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The issuer could not be reached. Fatal to the session.
    #[error("failed to fetch token: {0}")]
    TokenFetch(String),

    /// The issuer answered with an error. Fatal to the session.
    #[error("token request rejected: {0}")]
    TokenRejected(String),

    #[error(transparent)]
    Call(#[from] CallError),
}

/// The two live clients a joined session needs
pub struct SessionClients {
    pub call: CallClient,
    pub chat: ChatClient,
    pub credential: Credential,
}

impl SessionClients {
    /// Tear both clients down. Idempotent.
    pub async fn disconnect(&self) {
        self.call.disconnect().await;
        self.chat.disconnect().await;
    }
}

/// Turn a user identifier into live call and messaging clients.
///
/// Fetches a credential from the issuer, then connects both clients with it.
/// Any failure here is fatal to the session being bootstrapped.
pub async fn connect_clients(config: &Config, user_id: &str) -> Result<SessionClients, BootstrapError> {
    let credential = fetch_credential(&config.credentials.issuer_url, user_id).await?;

    info!("Credential minted for {}", credential.user_id);

    let call = CallClient::connect(&config.nats.url, &credential, user_id).await?;
    let chat = ChatClient::connect(&config.nats.url, &credential, user_id).await?;

    Ok(SessionClients {
        call,
        chat,
        credential,
    })
}

async fn fetch_credential(issuer_url: &str, user_id: &str) -> Result<Credential, BootstrapError> {
    let url = format!("{}/api/token", issuer_url.trim_end_matches('/'));

    let response = reqwest::Client::new()
        .post(&url)
        .json(&serde_json::json!({ "userId": user_id }))
        .send()
        .await
        .map_err(|e| BootstrapError::TokenFetch(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let reason = response
            .json::<TokenErrorResponse>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| format!("status {}", status));
        return Err(BootstrapError::TokenRejected(reason));
    }

    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| BootstrapError::TokenFetch(e.to_string()))?;

    Ok(Credential {
        token: body.token,
        user_id: body.user_id,
        api_key: body.api_key,
    })
}
