use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::stream::StreamExt;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::bootstrap::{self, BootstrapError, SessionClients};
use super::status::{SessionPhase, SessionStatus};
use crate::call::{CallError, CallHandle};
use crate::config::{AssistantMode, Config, TranscriptSourceConfig};
use crate::media::{DeviceBackendFactory, DeviceRequest, MediaError, MediaTracks};
use crate::transcript::{
    AssistantResponder, BusRecognizer, CannedResponder, EngineError, RemoteResponder,
    TranscriptEngine, TranscriptEntry,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Call(#[from] CallError),

    #[error("assistant mode is \"remote\" but no assistant url is configured")]
    AssistantUrlMissing,
}

/// A joined meeting: media toggle state, call and chat clients, and the live
/// transcript engine, torn down together on leave.
pub struct MeetingSession {
    session_id: String,
    room_id: String,
    user_id: String,
    started_at: DateTime<Utc>,

    phase: Mutex<SessionPhase>,

    clients: SessionClients,
    call: CallHandle,
    media: MediaTracks,
    engine: TranscriptEngine,

    /// Pump task feeding remote captions into the engine, if that source is
    /// configured
    caption_task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl MeetingSession {
    /// Bootstrap clients, acquire media, join the room, and start listening.
    ///
    /// Bootstrap and acquisition failures abort the join and are surfaced
    /// with a retry-able message. A transcription start failure does not: the
    /// session comes up with the engine in its errored state instead.
    pub async fn join(config: &Config, user_id: &str, room_id: &str) -> Result<Arc<Self>, SessionError> {
        let session_id = format!("{}-{}", room_id, user_id);
        info!("Joining room {} as {}", room_id, user_id);

        let clients = bootstrap::connect_clients(config, user_id).await?;

        let backend = DeviceBackendFactory::create(&config.media.backend)?;
        let media = backend.acquire(DeviceRequest::default()).await?;
        info!("Media acquired via {} backend", backend.name());

        let call = clients.call.join(room_id).await?;

        let assistant: Arc<dyn AssistantResponder> = match config.assistant.mode {
            AssistantMode::Canned => Arc::new(CannedResponder),
            AssistantMode::Remote => {
                let url = config
                    .assistant
                    .url
                    .clone()
                    .ok_or(SessionError::AssistantUrlMissing)?;
                Arc::new(RemoteResponder::new(url))
            }
        };

        let engine = match config.transcript.source {
            TranscriptSourceConfig::Recognizer => TranscriptEngine::with_recognizer(
                Arc::new(BusRecognizer::new(clients.call.bus(), session_id.clone())),
                assistant,
                config.transcript.speaker_label.clone(),
            ),
            TranscriptSourceConfig::Captions => TranscriptEngine::with_captions(assistant),
        };

        let session = Arc::new(Self {
            session_id,
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            started_at: Utc::now(),
            phase: Mutex::new(SessionPhase::Active),
            clients,
            call,
            media,
            engine,
            caption_task: tokio::sync::Mutex::new(None),
        });

        if let Err(e) = session.engine.start().await {
            // The meeting is usable without transcription; the engine holds
            // the errored state for the status endpoint
            warn!("Transcription unavailable: {}", e);
        }

        if config.transcript.source == TranscriptSourceConfig::Captions {
            session.start_caption_pump().await?;
        }

        info!("Session {} active", session.session_id);
        Ok(session)
    }

    /// Stop everything this session owns. Safe to call once per session.
    pub async fn leave(&self) {
        info!("Leaving session {}", self.session_id);

        self.engine.stop().await;

        if let Some(task) = self.caption_task.lock().await.take() {
            task.abort();
        }

        self.media.stop_all();
        self.call.leave().await;
        self.clients.disconnect().await;

        *self.phase.lock().unwrap() = SessionPhase::Left;
        info!("Session {} left", self.session_id);
    }

    /// Toggle the microphone track, returning the new state.
    pub fn toggle_mic(&self) -> bool {
        self.media.mic().toggle()
    }

    /// Toggle the camera track, returning the new state. The device is not
    /// released; turning the camera back on is cheap.
    pub fn toggle_camera(&self) -> bool {
        self.media.camera().toggle()
    }

    /// Toggle transcription, returning whether it is now listening.
    pub async fn toggle_listening(&self) -> Result<bool, EngineError> {
        if self.engine.is_listening() {
            self.engine.stop().await;
            Ok(false)
        } else {
            self.engine.start().await?;
            Ok(true)
        }
    }

    /// Send a chat message to the room.
    pub async fn send_message(&self, text: &str) -> Result<(), CallError> {
        self.clients.chat.send(&self.room_id, text).await
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.engine.transcript()
    }

    pub fn engine(&self) -> &TranscriptEngine {
        &self.engine
    }

    pub fn status(&self) -> SessionStatus {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStatus {
            session_id: self.session_id.clone(),
            room_id: self.room_id.clone(),
            user_id: self.user_id.clone(),
            phase: *self.phase.lock().unwrap(),
            mic_enabled: self.media.mic().is_enabled(),
            camera_enabled: self.media.camera().is_enabled(),
            listening: self.engine.is_listening(),
            recognition: self.engine.state(),
            last_warning: self.engine.last_warning(),
            entry_count: self.engine.entry_count(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
        }
    }

    async fn start_caption_pump(&self) -> Result<(), SessionError> {
        let mut subscriber = self.call.subscribe_captions().await?;
        let engine = self.engine.clone();

        let task = tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                if let Some(event) = CallHandle::decode_caption(&msg.payload) {
                    engine.handle_caption(
                        event.closed_caption.user.as_ref(),
                        &event.closed_caption.text,
                    );
                }
            }
        });

        *self.caption_task.lock().await = Some(task);
        Ok(())
    }
}
