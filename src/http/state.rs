use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::session::MeetingSession;

/// A user known to the credential issuer
#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub role: String,
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Active sessions (session_id → session)
    pub sessions: Arc<RwLock<HashMap<String, Arc<MeetingSession>>>>,

    /// Users the issuer has minted tokens for
    pub users: Arc<RwLock<HashMap<String, UserRecord>>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}
