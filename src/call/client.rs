use async_nats::Client;
use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use super::messages::{CaptionEvent, ChatMessage, PresenceMessage};
use crate::auth::TokenClaims;
use crate::session::Credential;

#[derive(Debug, Error)]
pub enum CallError {
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("failed to connect to call server: {0}")]
    Connect(String),

    #[error("call server request failed: {0}")]
    Request(String),
}

/// Subject for a room's closed-caption events
fn captions_subject(room_id: &str) -> String {
    format!("call.{}.captions", room_id)
}

/// Subject for a room's chat messages
fn messages_subject(room_id: &str) -> String {
    format!("call.{}.messages", room_id)
}

fn presence_subject(room_id: &str) -> String {
    format!("call.{}.presence", room_id)
}

/// Client for the call/media side of a session.
///
/// Holds an authenticated bus connection; rooms are joined through it and
/// hand back a [`CallHandle`].
pub struct CallClient {
    client: Client,
    user_id: String,
}

impl CallClient {
    /// Connect with a minted credential.
    ///
    /// The credential is decoded and checked for expiry before any network
    /// traffic; a missing or stale token is fatal to the session.
    pub async fn connect(url: &str, credential: &Credential, user_id: &str) -> Result<Self, CallError> {
        let claims = TokenClaims::decode(&credential.token)
            .map_err(|e| CallError::InvalidCredential(e.to_string()))?;

        if claims.is_expired() {
            return Err(CallError::InvalidCredential("token expired".to_string()));
        }

        if claims.user_id != user_id {
            return Err(CallError::InvalidCredential(format!(
                "token minted for {}, not {}",
                claims.user_id, user_id
            )));
        }

        info!("Connecting call client to {}", url);

        let client = async_nats::connect(url)
            .await
            .map_err(|e| CallError::Connect(e.to_string()))?;

        Ok(Self {
            client,
            user_id: user_id.to_string(),
        })
    }

    /// Join a room, announcing presence and returning a handle for it.
    pub async fn join(&self, room_id: &str) -> Result<CallHandle, CallError> {
        info!("Joining room: {}", room_id);

        let handle = CallHandle {
            client: self.client.clone(),
            room_id: room_id.to_string(),
            user_id: self.user_id.clone(),
        };

        handle.announce("joined").await?;

        Ok(handle)
    }

    /// The underlying bus connection, for co-located subscribers
    pub fn bus(&self) -> Client {
        self.client.clone()
    }

    /// Close the connection
    pub async fn disconnect(&self) {
        // async-nats handles cleanup on drop
        info!("Call client for {} disconnected", self.user_id);
    }
}

/// A joined room: caption subscription plus publish rights.
pub struct CallHandle {
    client: Client,
    room_id: String,
    user_id: String,
}

impl CallHandle {
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Subscribe to the room's closed-caption events.
    pub async fn subscribe_captions(&self) -> Result<async_nats::Subscriber, CallError> {
        let subject = captions_subject(&self.room_id);
        info!("Subscribing to captions on {}", subject);

        self.client
            .subscribe(subject)
            .await
            .map_err(|e| CallError::Request(e.to_string()))
    }

    /// Decode a raw caption payload, ignoring malformed events.
    pub fn decode_caption(payload: &[u8]) -> Option<CaptionEvent> {
        match serde_json::from_slice::<CaptionEvent>(payload) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!("Failed to parse caption event: {}", e);
                None
            }
        }
    }

    /// Leave the room, announcing departure. Failures are logged, not
    /// surfaced: the local teardown proceeds regardless.
    pub async fn leave(&self) {
        if let Err(e) = self.announce("left").await {
            warn!("Failed to announce leave for {}: {}", self.room_id, e);
        }
        info!("Left room: {}", self.room_id);
    }

    async fn announce(&self, action: &str) -> Result<(), CallError> {
        let message = PresenceMessage {
            room_id: self.room_id.clone(),
            user_id: self.user_id.clone(),
            action: action.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        };

        let payload =
            serde_json::to_vec(&message).map_err(|e| CallError::Request(e.to_string()))?;

        self.client
            .publish(presence_subject(&self.room_id), payload.into())
            .await
            .map_err(|e| CallError::Request(e.to_string()))
    }
}

/// Client for the messaging side of a session.
pub struct ChatClient {
    client: Client,
    user_id: String,
}

impl ChatClient {
    pub async fn connect(url: &str, credential: &Credential, user_id: &str) -> Result<Self, CallError> {
        let claims = TokenClaims::decode(&credential.token)
            .map_err(|e| CallError::InvalidCredential(e.to_string()))?;

        if claims.is_expired() {
            return Err(CallError::InvalidCredential("token expired".to_string()));
        }

        info!("Connecting chat client to {}", url);

        let client = async_nats::connect(url)
            .await
            .map_err(|e| CallError::Connect(e.to_string()))?;

        Ok(Self {
            client,
            user_id: user_id.to_string(),
        })
    }

    /// Send a chat message to a room's messaging channel.
    pub async fn send(&self, room_id: &str, text: &str) -> Result<(), CallError> {
        let message = ChatMessage {
            room_id: room_id.to_string(),
            user_id: self.user_id.clone(),
            text: text.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        };

        let payload =
            serde_json::to_vec(&message).map_err(|e| CallError::Request(e.to_string()))?;

        self.client
            .publish(messages_subject(room_id), payload.into())
            .await
            .map_err(|e| CallError::Request(e.to_string()))
    }

    pub async fn disconnect(&self) {
        info!("Chat client for {} disconnected", self.user_id);
    }
}
