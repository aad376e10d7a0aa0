use thiserror::Error;

use super::tracks::{MediaTracks, TrackHandle, TrackKind};

/// What a session asks the backend for
#[derive(Debug, Clone, Copy)]
pub struct DeviceRequest {
    pub audio: bool,
    pub video: bool,
}

impl Default for DeviceRequest {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// Classified device acquisition failure.
///
/// Each variant maps to a distinct user-facing message; none is retried
/// automatically.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Please allow camera and microphone access to join the meeting.")]
    PermissionDenied,

    #[error("No camera or microphone found. Please connect a device.")]
    DeviceNotFound,

    #[error("Failed to access media: {0}")]
    Other(String),
}

/// Device acquisition backend
///
/// Turns a device request into a pair of track handles in one async
/// operation. Implementations own how (and whether) real hardware is
/// reserved; track transport itself belongs to the joined call.
#[async_trait::async_trait]
pub trait DeviceBackend: Send + Sync + std::fmt::Debug {
    /// Acquire mic and camera tracks
    async fn acquire(&self, request: DeviceRequest) -> Result<MediaTracks, MediaError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Backend for call-owned tracks: the remote session transports media, so
/// acquisition always succeeds and the handles only carry toggle state.
#[derive(Debug)]
pub struct VirtualBackend;

#[async_trait::async_trait]
impl DeviceBackend for VirtualBackend {
    async fn acquire(&self, request: DeviceRequest) -> Result<MediaTracks, MediaError> {
        let mic = TrackHandle::new(TrackKind::Audio, "virtual-mic");
        let camera = TrackHandle::new(TrackKind::Video, "virtual-camera");

        if !request.audio {
            mic.set_enabled(false);
        }
        if !request.video {
            camera.set_enabled(false);
        }

        Ok(MediaTracks::new(mic, camera))
    }

    fn name(&self) -> &str {
        "virtual"
    }
}

/// Device backend factory
pub struct DeviceBackendFactory;

impl DeviceBackendFactory {
    /// Create a backend by its configured name.
    pub fn create(backend: &str) -> Result<Box<dyn DeviceBackend>, MediaError> {
        match backend {
            "virtual" => Ok(Box::new(VirtualBackend)),
            other => Err(MediaError::Other(format!(
                "unknown media backend: {}",
                other
            ))),
        }
    }
}
