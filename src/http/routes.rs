use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Credential issuer
        .route("/api/token", post(handlers::mint_token))
        // Session lifecycle
        .route("/rooms/join", post(handlers::join_room))
        .route("/rooms/:session_id/leave", post(handlers::leave_room))
        // In-call controls
        .route("/rooms/:session_id/mic", post(handlers::toggle_mic))
        .route("/rooms/:session_id/camera", post(handlers::toggle_camera))
        .route(
            "/rooms/:session_id/listening",
            post(handlers::toggle_listening),
        )
        .route("/rooms/:session_id/message", post(handlers::send_message))
        // Session queries
        .route("/rooms/:session_id/status", get(handlers::get_status))
        .route(
            "/rooms/:session_id/transcript",
            get(handlers::get_transcript),
        )
        // Browser clients fetch tokens cross-origin
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
