use futures::stream::StreamExt;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::call::SttMessage;

/// Event emitted by a running speech capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Tentative, mutable, in-progress recognition output
    Partial(String),
    /// Output the recognizer will not revise further
    Final(String),
    /// The capture stream ended without an explicit stop
    Ended,
    /// The recognizer reported an error
    Error(RecognitionErrorKind),
}

/// Classification of recognizer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    /// Microphone access denied. Terminal; requires explicit user retry.
    PermissionDenied,
    /// Transient connectivity problem. Surfaced as a warning only.
    Network,
    /// No speech detected within the recognizer's window. Restarted silently.
    NoSpeechTimeout,
    /// Capture was aborted, expected during an intentional stop.
    Aborted,
    /// Anything else. Terminal.
    Other,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("speech capture is not supported in this environment")]
    Unsupported,

    #[error("microphone access denied")]
    PermissionDenied,

    #[error("failed to start speech capture: {0}")]
    Failed(String),
}

/// A continuous speech-capture capability.
///
/// Injected into the transcript engine at construction so the engine can be
/// driven by a scripted implementation in tests. `is_supported` is the
/// capability probe: engines must not attempt `start` when it reports false.
#[async_trait::async_trait]
pub trait SpeechCapture: Send + Sync {
    /// Whether this environment can capture speech at all
    fn is_supported(&self) -> bool;

    /// Start capturing; returns the event stream for this run.
    ///
    /// Each successful call yields a fresh receiver. The receiver closes
    /// when the capture ends or is stopped.
    async fn start(&self) -> Result<mpsc::Receiver<RecognitionEvent>, CaptureError>;

    /// Stop capturing. Idempotent; safe to call when not running.
    async fn stop(&self);

    /// Capture name for logging
    fn name(&self) -> &str;
}

/// Speech capture backed by the streaming STT service on the bus.
///
/// Subscribes to the recognizer's text subjects and maps partial/final
/// messages for this session onto recognition events.
pub struct BusRecognizer {
    client: async_nats::Client,
    session_id: String,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl BusRecognizer {
    /// Subjects the STT service publishes partial and final text on
    const STT_SUBJECT: &'static str = "stt.text.>";

    pub fn new(client: async_nats::Client, session_id: String) -> Self {
        Self {
            client,
            session_id,
            task: Mutex::new(None),
        }
    }
}

#[async_trait::async_trait]
impl SpeechCapture for BusRecognizer {
    fn is_supported(&self) -> bool {
        true
    }

    async fn start(&self) -> Result<mpsc::Receiver<RecognitionEvent>, CaptureError> {
        let mut subscriber = self
            .client
            .subscribe(Self::STT_SUBJECT)
            .await
            .map_err(|e| CaptureError::Failed(e.to_string()))?;

        info!("Recognizer subscribed to {}", Self::STT_SUBJECT);

        let (tx, rx) = mpsc::channel(100);
        let session_id = self.session_id.clone();

        let task = tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                let stt = match serde_json::from_slice::<SttMessage>(&msg.payload) {
                    Ok(stt) => stt,
                    Err(e) => {
                        warn!("Failed to parse STT message: {}", e);
                        continue;
                    }
                };

                // The STT service publishes for every session on shared subjects
                if stt.session_id != session_id {
                    continue;
                }

                let event = if stt.partial {
                    RecognitionEvent::Partial(stt.text)
                } else {
                    RecognitionEvent::Final(stt.text)
                };

                if tx.send(event).await.is_err() {
                    break;
                }
            }

            // Subscription closed from the far side: report as ended so the
            // engine can run its restart step
            let _ = tx.send(RecognitionEvent::Ended).await;
        });

        let mut slot = self.task.lock().await;
        if let Some(old) = slot.replace(task) {
            old.abort();
        }

        Ok(rx)
    }

    async fn stop(&self) {
        if let Some(task) = self.task.lock().await.take() {
            task.abort();
        }
    }

    fn name(&self) -> &str {
        "bus-recognizer"
    }
}
