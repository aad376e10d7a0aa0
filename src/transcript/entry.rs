use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single line of the transcript feed
///
/// Entries are immutable once appended; insertion order is display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Who said it ("You", a remote participant's label, or "AI Assistant")
    pub speaker: String,

    /// Finalized text
    pub text: String,

    /// When the entry was appended
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn now(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}
