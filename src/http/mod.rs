//! HTTP API server: the session control surface
//!
//! This module provides a REST API for driving meeting sessions:
//! - POST /api/token - Mint an access token
//! - POST /rooms/join - Join a room
//! - POST /rooms/:id/leave - Leave a room
//! - POST /rooms/:id/mic | /camera | /listening - Toggle controls
//! - POST /rooms/:id/message - Send a chat message
//! - GET /rooms/:id/status - Query session state
//! - GET /rooms/:id/transcript - Get accumulated transcript
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::{AppState, UserRecord};
