use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::assistant::{AssistantResponder, ASSISTANT_SPEAKER, FALLBACK_REPLY, TRIGGER_PHRASE};
use super::capture::{CaptureError, RecognitionErrorKind, RecognitionEvent, SpeechCapture};
use super::entry::TranscriptEntry;
use crate::call::CaptionUser;

/// Delay before the single restart attempt after an unexpected end
const RESTART_DELAY: Duration = Duration::from_millis(100);

/// Delay before restarting after a no-speech timeout
const NO_SPEECH_RESTART_DELAY: Duration = Duration::from_millis(1000);

/// How many prior entries accompany an assistant request as context
const ASSISTANT_CONTEXT_ENTRIES: usize = 10;

/// Recognition session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionState {
    Idle,
    Starting,
    Listening,
    Stopping,
    Errored,
}

/// Which feed produces transcript entries for this engine instance.
///
/// Exactly one source is active per instance; events from the other source
/// are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TranscriptSource {
    Recognizer,
    Captions,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("speech capture is not supported in this environment")]
    Unsupported,

    #[error("microphone access denied")]
    PermissionDenied,

    #[error("failed to start listening: {0}")]
    Start(String),
}

/// Live transcript feed with an assistant side channel.
///
/// Maintains an ordered, append-only transcript fed either by a streaming
/// recognizer (partial/final events) or by remote captions, detects the
/// activation phrase on finalized local speech, and appends the assistant's
/// reply. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct TranscriptEngine {
    inner: Arc<Inner>,
}

struct Inner {
    speaker: String,
    source: TranscriptSource,
    capture: Option<Arc<dyn SpeechCapture>>,
    assistant: Arc<dyn AssistantResponder>,

    state: Mutex<RecognitionState>,

    /// Bumped on every start, restart, and stop. Recognition events carry the
    /// generation of the run that produced them; a mismatch means the run was
    /// stopped and the event must be discarded, not appended.
    generation: AtomicU64,

    entries: Mutex<Vec<TranscriptEntry>>,

    /// At most one pending, not-yet-final utterance
    interim: Mutex<Option<String>>,

    /// Surfaced message for degraded-but-running and terminal states
    last_warning: Mutex<Option<String>>,
}

impl TranscriptEngine {
    /// Engine fed by a streaming recognizer.
    pub fn with_recognizer(
        capture: Arc<dyn SpeechCapture>,
        assistant: Arc<dyn AssistantResponder>,
        speaker: impl Into<String>,
    ) -> Self {
        Self::new(
            TranscriptSource::Recognizer,
            Some(capture),
            assistant,
            speaker.into(),
        )
    }

    /// Engine fed by remote closed-caption events.
    pub fn with_captions(assistant: Arc<dyn AssistantResponder>) -> Self {
        Self::new(TranscriptSource::Captions, None, assistant, "You".to_string())
    }

    fn new(
        source: TranscriptSource,
        capture: Option<Arc<dyn SpeechCapture>>,
        assistant: Arc<dyn AssistantResponder>,
        speaker: String,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                speaker,
                source,
                capture,
                assistant,
                state: Mutex::new(RecognitionState::Idle),
                generation: AtomicU64::new(0),
                entries: Mutex::new(Vec::new()),
                interim: Mutex::new(None),
                last_warning: Mutex::new(None),
            }),
        }
    }

    /// Start listening.
    ///
    /// `Unsupported` and `PermissionDenied` are terminal: they are surfaced
    /// to the user and never retried automatically.
    pub async fn start(&self) -> Result<(), EngineError> {
        {
            let mut state = self.inner.state.lock().unwrap();
            match *state {
                RecognitionState::Starting | RecognitionState::Listening => {
                    warn!("Transcription already running");
                    return Ok(());
                }
                RecognitionState::Stopping => {
                    warn!("Transcription still stopping; ignoring start");
                    return Ok(());
                }
                RecognitionState::Idle | RecognitionState::Errored => {}
            }
            *state = RecognitionState::Starting;
        }

        self.inner.last_warning.lock().unwrap().take();

        let capture = match &self.inner.capture {
            // Caption-sourced engines have no local device to start
            None => {
                self.inner.generation.fetch_add(1, Ordering::SeqCst);
                *self.inner.state.lock().unwrap() = RecognitionState::Listening;
                return Ok(());
            }
            Some(capture) => Arc::clone(capture),
        };

        if !capture.is_supported() {
            self.fail_start("Speech capture is not supported in this environment");
            return Err(EngineError::Unsupported);
        }

        match capture.start().await {
            Ok(rx) => {
                let gen = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
                *self.inner.state.lock().unwrap() = RecognitionState::Listening;
                self.spawn_pump(gen, rx);
                info!("Listening via {}", capture.name());
                Ok(())
            }
            Err(CaptureError::PermissionDenied) => {
                self.fail_start("Microphone access denied - please allow microphone permissions");
                Err(EngineError::PermissionDenied)
            }
            Err(CaptureError::Unsupported) => {
                self.fail_start("Speech capture is not supported in this environment");
                Err(EngineError::Unsupported)
            }
            Err(CaptureError::Failed(reason)) => {
                self.fail_start("Failed to start speech capture");
                Err(EngineError::Start(reason))
            }
        }
    }

    /// Stop listening and clear the interim buffer.
    ///
    /// Safe to call in any state. After this returns, no in-flight
    /// recognition callback can append to the transcript.
    pub async fn stop(&self) {
        *self.inner.state.lock().unwrap() = RecognitionState::Stopping;

        // Invalidate every event issued under the old generation before the
        // capture is asked to stop: a callback already in flight fails the
        // generation check instead of appending.
        self.inner.generation.fetch_add(1, Ordering::SeqCst);

        if let Some(capture) = &self.inner.capture {
            capture.stop().await;
        }

        self.inner.interim.lock().unwrap().take();
        *self.inner.state.lock().unwrap() = RecognitionState::Idle;
        info!("Transcription stopped");
    }

    pub fn state(&self) -> RecognitionState {
        *self.inner.state.lock().unwrap()
    }

    pub fn is_listening(&self) -> bool {
        self.state() == RecognitionState::Listening
    }

    /// Snapshot of the transcript so far, in append order
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.inner.entries.lock().unwrap().clone()
    }

    pub fn entry_count(&self) -> usize {
        self.inner.entries.lock().unwrap().len()
    }

    /// The pending, not-yet-final utterance, if any
    pub fn interim(&self) -> Option<String> {
        self.inner.interim.lock().unwrap().clone()
    }

    pub fn last_warning(&self) -> Option<String> {
        self.inner.last_warning.lock().unwrap().clone()
    }

    /// Feed a partial recognition result for the current run.
    pub async fn handle_partial(&self, text: &str) {
        let gen = self.inner.generation.load(Ordering::SeqCst);
        self.dispatch(gen, RecognitionEvent::Partial(text.to_string()))
            .await;
    }

    /// Feed a final recognition result for the current run.
    pub async fn handle_final(&self, text: &str) {
        let gen = self.inner.generation.load(Ordering::SeqCst);
        self.dispatch(gen, RecognitionEvent::Final(text.to_string()))
            .await;
    }

    /// Feed an end-of-capture notification for the current run.
    pub async fn handle_ended(&self) {
        let gen = self.inner.generation.load(Ordering::SeqCst);
        self.dispatch(gen, RecognitionEvent::Ended).await;
    }

    /// Feed a recognizer error for the current run.
    pub async fn handle_error(&self, kind: RecognitionErrorKind) {
        let gen = self.inner.generation.load(Ordering::SeqCst);
        self.dispatch(gen, RecognitionEvent::Error(kind)).await;
    }

    /// Feed a remote caption event.
    ///
    /// Captions are always final; empty text appends nothing. Dropped with a
    /// warning on a recognizer-sourced engine.
    pub fn handle_caption(&self, user: Option<&CaptionUser>, text: &str) {
        if self.inner.source != TranscriptSource::Captions {
            warn!("Ignoring caption event on a recognizer-sourced transcript");
            return;
        }

        if *self.inner.state.lock().unwrap() != RecognitionState::Listening {
            return;
        }

        if text.trim().is_empty() {
            return;
        }

        self.inner
            .append(TranscriptEntry::now(CaptionUser::label(user), text));
    }

    fn fail_start(&self, message: &str) {
        *self.inner.last_warning.lock().unwrap() = Some(message.to_string());
        *self.inner.state.lock().unwrap() = RecognitionState::Errored;
    }

    fn spawn_pump(&self, gen: u64, mut rx: mpsc::Receiver<RecognitionEvent>) {
        let engine = self.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                engine.dispatch(gen, event).await;
            }
        });
    }

    async fn dispatch(&self, gen: u64, event: RecognitionEvent) {
        if gen != self.inner.generation.load(Ordering::SeqCst) {
            debug!("Discarding recognition event from a stopped run");
            return;
        }

        match event {
            RecognitionEvent::Partial(text) => self.on_partial(text),
            RecognitionEvent::Final(text) => self.on_final(text),
            RecognitionEvent::Ended => self.on_ended(gen),
            RecognitionEvent::Error(kind) => self.on_error(gen, kind).await,
        }
    }

    fn on_partial(&self, text: String) {
        if *self.inner.state.lock().unwrap() != RecognitionState::Listening {
            return;
        }
        *self.inner.interim.lock().unwrap() = Some(text);
    }

    fn on_final(&self, text: String) {
        if *self.inner.state.lock().unwrap() != RecognitionState::Listening {
            return;
        }

        self.inner.interim.lock().unwrap().take();
        self.inner
            .append(TranscriptEntry::now(self.inner.speaker.clone(), text.clone()));

        if text.to_lowercase().contains(TRIGGER_PHRASE) {
            self.spawn_assistant_reply(text);
        }
    }

    fn on_ended(&self, gen: u64) {
        if *self.inner.state.lock().unwrap() != RecognitionState::Listening {
            return;
        }

        debug!("Recognition ended unexpectedly; scheduling restart");
        self.schedule_restart(gen, RESTART_DELAY);
    }

    async fn on_error(&self, gen: u64, kind: RecognitionErrorKind) {
        match kind {
            RecognitionErrorKind::PermissionDenied => {
                *self.inner.last_warning.lock().unwrap() = Some(
                    "Microphone access denied - please allow microphone permissions".to_string(),
                );
                *self.inner.state.lock().unwrap() = RecognitionState::Errored;
                if let Some(capture) = &self.inner.capture {
                    capture.stop().await;
                }
            }
            RecognitionErrorKind::Network => {
                warn!("Recognizer reported a network error");
                *self.inner.last_warning.lock().unwrap() = Some(
                    "Network error - speech recognition requires an internet connection"
                        .to_string(),
                );
                // Still eligible for automatic restart; stay listening
            }
            RecognitionErrorKind::NoSpeechTimeout => {
                debug!("No speech detected; restarting silently");
                self.schedule_restart(gen, NO_SPEECH_RESTART_DELAY);
            }
            RecognitionErrorKind::Aborted => {
                // Expected during an intentional stop; never an error
                debug!("Recognition aborted");
            }
            RecognitionErrorKind::Other => {
                // Unclassified errors stop the session without a user-visible
                // message
                warn!("Recognizer reported an unclassified error");
                *self.inner.state.lock().unwrap() = RecognitionState::Errored;
                if let Some(capture) = &self.inner.capture {
                    capture.stop().await;
                }
            }
        }
    }

    /// One bounded restart attempt for the run identified by `gen`.
    ///
    /// If a stop (or a newer run) supersedes `gen` while waiting or starting,
    /// the attempt is abandoned. A failed start is swallowed: the recognizer's
    /// own subsequent events determine where the session lands.
    fn schedule_restart(&self, gen: u64, delay: Duration) {
        let engine = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            if engine.inner.generation.load(Ordering::SeqCst) != gen
                || *engine.inner.state.lock().unwrap() != RecognitionState::Listening
            {
                return;
            }

            let capture = match &engine.inner.capture {
                Some(capture) => Arc::clone(capture),
                None => return,
            };

            match capture.start().await {
                Ok(rx) => {
                    let next = gen + 1;
                    if engine
                        .inner
                        .generation
                        .compare_exchange(gen, next, Ordering::SeqCst, Ordering::SeqCst)
                        .is_ok()
                    {
                        engine.spawn_pump(next, rx);
                        debug!("Recognition restarted");
                    } else {
                        // A stop won the race; undo the stray capture
                        capture.stop().await;
                    }
                }
                Err(e) => {
                    debug!("Recognition restart failed: {}", e);
                }
            }
        });
    }

    /// Ask the responder for a reply and append it. The reply is appended
    /// even if listening stops in the meantime: the trigger contract is that
    /// the user always sees a response.
    fn spawn_assistant_reply(&self, message: String) {
        let engine = self.clone();
        tokio::spawn(async move {
            let context: Vec<String> = {
                let entries = engine.inner.entries.lock().unwrap();
                entries
                    .iter()
                    .rev()
                    .take(ASSISTANT_CONTEXT_ENTRIES)
                    .rev()
                    .map(|e| format!("{}: {}", e.speaker, e.text))
                    .collect()
            };

            let text = match engine.inner.assistant.respond(&message, &context).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("Assistant request failed: {}", e);
                    FALLBACK_REPLY.to_string()
                }
            };

            engine
                .inner
                .append(TranscriptEntry::now(ASSISTANT_SPEAKER, text));
        });
    }
}

impl Inner {
    fn append(&self, entry: TranscriptEntry) {
        self.entries.lock().unwrap().push(entry);
    }
}
