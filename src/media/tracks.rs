use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

/// Kind of media a track carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Handle to an acquired device track.
///
/// Disabling a track mutes/blanks it without releasing the device, so
/// re-enabling is cheap. `stop` releases the device for good and is
/// idempotent; a stopped track cannot be re-enabled.
#[derive(Clone)]
pub struct TrackHandle {
    kind: TrackKind,
    label: String,
    enabled: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
}

impl TrackHandle {
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            enabled: Arc::new(AtomicBool::new(true)),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_enabled(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst) && self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Flip enablement, returning the new value.
    pub fn toggle(&self) -> bool {
        if self.stopped.load(Ordering::SeqCst) {
            return false;
        }
        let enabled = !self.enabled.load(Ordering::SeqCst);
        self.enabled.store(enabled, Ordering::SeqCst);
        enabled
    }

    /// Release the underlying device.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.enabled.store(false, Ordering::SeqCst);
            info!("Stopped {} track: {}", kind_name(self.kind), self.label);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

fn kind_name(kind: TrackKind) -> &'static str {
    match kind {
        TrackKind::Audio => "audio",
        TrackKind::Video => "video",
    }
}

/// The pair of tracks a joined participant publishes
#[derive(Clone)]
pub struct MediaTracks {
    mic: TrackHandle,
    camera: TrackHandle,
}

impl MediaTracks {
    pub fn new(mic: TrackHandle, camera: TrackHandle) -> Self {
        Self { mic, camera }
    }

    pub fn mic(&self) -> &TrackHandle {
        &self.mic
    }

    pub fn camera(&self) -> &TrackHandle {
        &self.camera
    }

    /// Release every track. Idempotent.
    pub fn stop_all(&self) {
        self.mic.stop();
        self.camera.stop();
    }
}
