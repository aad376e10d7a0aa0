//! Media acquisition and track toggle state

mod backend;
mod tracks;

pub use backend::{DeviceBackend, DeviceBackendFactory, DeviceRequest, MediaError, VirtualBackend};
pub use tracks::{MediaTracks, TrackHandle, TrackKind};
