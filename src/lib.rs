pub mod auth;
pub mod call;
pub mod config;
pub mod http;
pub mod media;
pub mod session;
pub mod transcript;

pub use call::{CallClient, CallHandle, CaptionEvent, CaptionUser, ChatClient, ChatMessage};
pub use config::Config;
pub use http::{create_router, AppState};
pub use media::{DeviceBackend, DeviceBackendFactory, DeviceRequest, MediaTracks, TrackHandle};
pub use session::{MeetingSession, SessionPhase, SessionStatus};
pub use transcript::{
    AssistantResponder, RecognitionState, SpeechCapture, TranscriptEngine, TranscriptEntry,
};
