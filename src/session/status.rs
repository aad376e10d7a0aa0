use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::transcript::RecognitionState;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Joining,
    Active,
    Errored,
    Left,
}

/// Snapshot of a session's observable state
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub room_id: String,
    pub user_id: String,
    pub phase: SessionPhase,

    pub mic_enabled: bool,
    pub camera_enabled: bool,

    /// Whether the transcript engine is currently listening
    pub listening: bool,
    pub recognition: RecognitionState,
    pub last_warning: Option<String>,

    pub entry_count: usize,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
}
