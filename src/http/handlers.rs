use super::state::{AppState, UserRecord};
use crate::auth;
use crate::session::{MeetingSession, SessionStatus};
use crate::transcript::TranscriptEntry;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub user_id: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub user_id: String,

    /// Optional room ID (if not provided, generate one)
    pub room_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JoinRoomResponse {
    pub session_id: String,
    pub room_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LeaveRoomResponse {
    pub session_id: String,
    pub status: String,
    pub stats: SessionStatus,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub session_id: String,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ListeningResponse {
    pub session_id: String,
    pub listening: bool,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/token
/// Mint a time-bounded access token and upsert the user record
pub async fn mint_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> impl IntoResponse {
    let user_id = match req.user_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("userId is required")),
            )
                .into_response();
        }
    };

    let credentials = &state.config.credentials;
    if credentials.api_key.is_empty() || credentials.api_secret.is_empty() {
        error!("Missing issuer credentials");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Credentials not configured")),
        )
            .into_response();
    }

    let token = auth::mint_token(&credentials.api_secret, &user_id);

    // Upsert the user record; a problem here must never fail the mint
    {
        let mut users = state.users.write().await;
        users.insert(
            user_id.clone(),
            UserRecord {
                id: user_id.clone(),
                name: user_id.clone(),
                role: "admin".to_string(),
            },
        );
    }

    info!("Token minted for user: {}", user_id);

    (
        StatusCode::OK,
        Json(TokenResponse {
            token,
            user_id,
            api_key: credentials.api_key.clone(),
        }),
    )
        .into_response()
}

/// POST /rooms/join
/// Bootstrap a new session and join a room
pub async fn join_room(
    State(state): State<AppState>,
    Json(req): Json<JoinRoomRequest>,
) -> impl IntoResponse {
    // Generate or use provided room ID
    let room_id = req
        .room_id
        .unwrap_or_else(|| format!("room-{}", uuid::Uuid::new_v4()));

    let session_id = format!("{}-{}", room_id, req.user_id);
    info!("Join requested: {}", session_id);

    // Check if this user is already in the room
    {
        let sessions = state.sessions.read().await;
        if sessions.contains_key(&session_id) {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse::new(format!(
                    "{} has already joined {}",
                    req.user_id, room_id
                ))),
            )
                .into_response();
        }
    }

    let session = match MeetingSession::join(&state.config, &req.user_id, &room_id).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to join room: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            )
                .into_response();
        }
    };

    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(session_id.clone(), session);
    }

    info!("Joined room {} as {}", room_id, req.user_id);

    (
        StatusCode::OK,
        Json(JoinRoomResponse {
            session_id,
            room_id: room_id.clone(),
            status: "active".to_string(),
            message: format!("Joined room {}", room_id),
        }),
    )
        .into_response()
}

/// POST /rooms/:session_id/leave
/// Leave a room and tear the session down
pub async fn leave_room(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    // Find and remove session
    let session = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&session_id)
    };

    match session {
        Some(session) => {
            session.leave().await;
            let stats = session.status();

            (
                StatusCode::OK,
                Json(LeaveRoomResponse {
                    session_id,
                    status: "left".to_string(),
                    stats,
                }),
            )
                .into_response()
        }
        None => session_not_found(&session_id),
    }
}

/// POST /rooms/:session_id/mic
/// Toggle the microphone track
pub async fn toggle_mic(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match find_session(&state, &session_id).await {
        Some(session) => {
            let enabled = session.toggle_mic();
            (
                StatusCode::OK,
                Json(ToggleResponse {
                    session_id,
                    enabled,
                }),
            )
                .into_response()
        }
        None => session_not_found(&session_id),
    }
}

/// POST /rooms/:session_id/camera
/// Toggle the camera track
pub async fn toggle_camera(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match find_session(&state, &session_id).await {
        Some(session) => {
            let enabled = session.toggle_camera();
            (
                StatusCode::OK,
                Json(ToggleResponse {
                    session_id,
                    enabled,
                }),
            )
                .into_response()
        }
        None => session_not_found(&session_id),
    }
}

/// POST /rooms/:session_id/listening
/// Toggle transcription
pub async fn toggle_listening(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match find_session(&state, &session_id).await {
        Some(session) => match session.toggle_listening().await {
            Ok(listening) => (
                StatusCode::OK,
                Json(ListeningResponse {
                    session_id,
                    listening,
                }),
            )
                .into_response(),
            Err(e) => {
                warn!("Could not toggle transcription: {}", e);
                (StatusCode::CONFLICT, Json(ErrorResponse::new(e.to_string()))).into_response()
            }
        },
        None => session_not_found(&session_id),
    }
}

/// POST /rooms/:session_id/message
/// Send a chat message to the room
pub async fn send_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> impl IntoResponse {
    match find_session(&state, &session_id).await {
        Some(session) => match session.send_message(&req.text).await {
            Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "sent": true }))).into_response(),
            Err(e) => {
                error!("Failed to send message: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new(format!("Failed to send message: {}", e))),
                )
                    .into_response()
            }
        },
        None => session_not_found(&session_id),
    }
}

/// GET /rooms/:session_id/status
/// Get the observable state of a session
pub async fn get_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match find_session(&state, &session_id).await {
        Some(session) => (StatusCode::OK, Json(session.status())).into_response(),
        None => session_not_found(&session_id),
    }
}

/// GET /rooms/:session_id/transcript
/// Get the transcript accumulated so far
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match find_session(&state, &session_id).await {
        Some(session) => {
            let transcript: Vec<TranscriptEntry> = session.transcript();
            (StatusCode::OK, Json(transcript)).into_response()
        }
        None => session_not_found(&session_id),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn find_session(state: &AppState, session_id: &str) -> Option<Arc<MeetingSession>> {
    let sessions = state.sessions.read().await;
    sessions.get(session_id).cloned()
}

fn session_not_found(session_id: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(format!(
            "Session {} not found",
            session_id
        ))),
    )
        .into_response()
}
