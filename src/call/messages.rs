use serde::{Deserialize, Serialize};

/// Closed-caption event received from a joined call
///
/// Only a non-empty `text` produces a transcript entry; the speaker label
/// falls back through name -> id -> "Unknown".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionEvent {
    pub closed_caption: ClosedCaption,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedCaption {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<CaptionUser>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptionUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl CaptionUser {
    /// Display label for this speaker: name, then id, then "Unknown"
    pub fn label(user: Option<&CaptionUser>) -> String {
        user.and_then(|u| u.name.clone().or_else(|| u.id.clone()))
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// Chat message published to a room's messaging channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub room_id: String,
    pub user_id: String,
    pub text: String,
    pub timestamp: String, // RFC3339 timestamp
}

/// Presence marker published when a participant joins or leaves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceMessage {
    pub room_id: String,
    pub user_id: String,
    pub action: String, // "joined" | "left"
    pub timestamp: String,
}

/// Streaming recognizer output received from the STT service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttMessage {
    pub session_id: String,
    pub text: String,
    pub partial: bool,
    pub timestamp: String,
    #[serde(default)]
    pub confidence: Option<f32>,
}
