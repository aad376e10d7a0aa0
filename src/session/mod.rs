//! Meeting session lifecycle
//!
//! This module provides the `MeetingSession` abstraction that manages:
//! - Credential fetch and client bootstrap
//! - Media track acquisition and toggle state
//! - Room join/leave and chat
//! - The live transcript engine and its event pumps

mod bootstrap;
mod session;
mod status;

pub use bootstrap::{connect_clients, BootstrapError, Credential, SessionClients};
pub use session::{MeetingSession, SessionError};
pub use status::{SessionPhase, SessionStatus};
