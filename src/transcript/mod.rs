//! Live transcript capture and assistant trigger
//!
//! The engine keeps an ordered, append-only transcript fed by exactly one of
//! two sources per session: a streaming speech recognizer (partial and final
//! results) or the remote call's closed captions. Finalized local speech
//! containing the activation phrase produces an "AI Assistant" reply.

mod assistant;
mod capture;
mod engine;
mod entry;

pub use assistant::{
    AssistantError, AssistantResponder, CannedResponder, RemoteResponder, ASSISTANT_SPEAKER,
    FALLBACK_REPLY, TRIGGER_PHRASE,
};
pub use capture::{
    BusRecognizer, CaptureError, RecognitionErrorKind, RecognitionEvent, SpeechCapture,
};
pub use engine::{EngineError, RecognitionState, TranscriptEngine};
pub use entry::TranscriptEntry;
