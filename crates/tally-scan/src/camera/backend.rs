//! Platform camera seam.
//!
//! The host implements [`CameraBackend`] over its media API (a browser's
//! `getUserMedia`, V4L2, AVFoundation). The session only talks to these
//! traits.

use async_trait::async_trait;

use super::device::VideoDevice;
use crate::config::CameraSettings;
use crate::error::ScanResult;

/// Result of asking the platform for camera access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    Granted,
    Denied,
    /// The platform reported that no camera exists.
    NoDevice,
}

/// Readiness of a media track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Live,
    Ended,
}

/// Capture hints passed to [`CameraBackend::open_stream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub ideal_frame_rate: u32,
}

impl StreamConstraints {
    pub fn from_settings(settings: &CameraSettings) -> Self {
        StreamConstraints {
            ideal_width: settings.ideal_width,
            ideal_height: settings.ideal_height,
            ideal_frame_rate: settings.ideal_frame_rate,
        }
    }
}

/// One captured video frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub device_id: String,
    /// Monotonic per-stream counter starting at 1.
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    /// 8-bit grayscale, row-major, `width * height` bytes.
    pub data: Vec<u8>,
}

/// Access to the platform's cameras.
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Prompts for (or checks) camera permission.
    async fn request_permission(&self) -> PermissionOutcome;

    /// Lists the video inputs. Called after permission is granted so labels
    /// are populated.
    async fn enumerate_devices(&self) -> ScanResult<Vec<VideoDevice>>;

    /// Opens a live stream on `device_id`.
    ///
    /// Fails with `StreamInitFailed` when the device is busy or gone.
    async fn open_stream(
        &self,
        device_id: &str,
        constraints: &StreamConstraints,
    ) -> ScanResult<Box<dyn MediaStream>>;
}

/// A live stream and its tracks.
///
/// Implementations must end every track when dropped, not only on
/// [`MediaStream::stop`].
#[async_trait]
pub trait MediaStream: Send {
    fn device_id(&self) -> &str;

    /// Waits for the next frame. An error is fatal for the stream.
    async fn next_frame(&mut self) -> ScanResult<Frame>;

    fn track_states(&self) -> Vec<TrackState>;

    /// Ends every track. Idempotent.
    fn stop(&mut self);
}
