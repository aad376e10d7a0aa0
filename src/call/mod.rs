//! Call and messaging clients
//!
//! The call server's eventing plane is NATS: closed captions, chat messages,
//! and presence markers travel as JSON on per-room subjects. This module
//! provides the authenticated clients and the wire message types.

pub mod client;
pub mod messages;

pub use client::{CallClient, CallError, CallHandle, ChatClient};
pub use messages::{CaptionEvent, CaptionUser, ChatMessage, ClosedCaption, PresenceMessage, SttMessage};
