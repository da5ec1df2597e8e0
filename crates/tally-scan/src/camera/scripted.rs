//! In-memory camera backend and decoder.
//!
//! Used by tests to drive every session transition without hardware.
//! Streams emit a blank (white) grayscale frame every
//! [`FRAME_INTERVAL`] on the Tokio clock, so paused-time tests are
//! deterministic.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tally_core::Symbology;

use super::backend::{
    CameraBackend, Frame, MediaStream, PermissionOutcome, StreamConstraints, TrackState,
};
use super::decoder::{DecodedCode, FrameDecoder};
use super::device::VideoDevice;
use crate::error::{ScanError, ScanResult};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Scripted Camera
// =============================================================================

/// A stream the scripted camera handed out.
#[derive(Debug, Clone)]
pub struct OpenedStream {
    pub device_id: String,
    pub constraints: StreamConstraints,
    track: Arc<Mutex<TrackState>>,
}

impl OpenedStream {
    pub fn track_state(&self) -> TrackState {
        *lock(&self.track)
    }
}

/// Time between scripted frames (~30 fps).
pub const FRAME_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Debug)]
struct Script {
    permission: PermissionOutcome,
    permission_delay: Duration,
    devices: Vec<VideoDevice>,
    unavailable: HashSet<String>,
    fail_after: HashMap<String, u64>,
    opened: Vec<OpenedStream>,
}

/// Camera backend whose behavior is set up front.
///
/// Clones share state, so a test keeps one clone to inspect streams after
/// handing another to the session.
#[derive(Debug, Clone)]
pub struct ScriptedCamera {
    script: Arc<Mutex<Script>>,
}

impl ScriptedCamera {
    /// Permission granted, the given devices, ~30 fps.
    pub fn new(devices: Vec<VideoDevice>) -> Self {
        ScriptedCamera {
            script: Arc::new(Mutex::new(Script {
                permission: PermissionOutcome::Granted,
                permission_delay: Duration::ZERO,
                devices,
                unavailable: HashSet::new(),
                fail_after: HashMap::new(),
                opened: Vec::new(),
            })),
        }
    }

    pub fn with_permission(self, outcome: PermissionOutcome) -> Self {
        lock(&self.script).permission = outcome;
        self
    }

    /// Keeps the permission prompt up for `delay`.
    pub fn with_permission_delay(self, delay: Duration) -> Self {
        lock(&self.script).permission_delay = delay;
        self
    }

    /// `open_stream` on this device fails (busy or unplugged).
    pub fn with_unavailable_device(self, device_id: &str) -> Self {
        lock(&self.script).unavailable.insert(device_id.to_string());
        self
    }

    /// Streams on this device die after `frames` frames.
    pub fn with_stream_failure_after(self, device_id: &str, frames: u64) -> Self {
        lock(&self.script).fail_after.insert(device_id.to_string(), frames);
        self
    }

    /// Every stream opened so far, oldest first.
    pub fn opened_streams(&self) -> Vec<OpenedStream> {
        lock(&self.script).opened.clone()
    }

    /// Number of tracks still live across all streams.
    pub fn live_tracks(&self) -> usize {
        lock(&self.script)
            .opened
            .iter()
            .filter(|s| s.track_state() == TrackState::Live)
            .count()
    }
}

#[async_trait]
impl CameraBackend for ScriptedCamera {
    async fn request_permission(&self) -> PermissionOutcome {
        let (outcome, delay) = {
            let script = lock(&self.script);
            (script.permission, script.permission_delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        outcome
    }

    async fn enumerate_devices(&self) -> ScanResult<Vec<VideoDevice>> {
        Ok(lock(&self.script).devices.clone())
    }

    async fn open_stream(
        &self,
        device_id: &str,
        constraints: &StreamConstraints,
    ) -> ScanResult<Box<dyn MediaStream>> {
        let mut script = lock(&self.script);

        if script.unavailable.contains(device_id) {
            return Err(ScanError::StreamInitFailed(format!(
                "device {} could not start",
                device_id
            )));
        }
        if !script.devices.iter().any(|d| d.device_id == device_id) {
            return Err(ScanError::StreamInitFailed(format!(
                "device {} not connected",
                device_id
            )));
        }

        let track = Arc::new(Mutex::new(TrackState::Live));
        script.opened.push(OpenedStream {
            device_id: device_id.to_string(),
            constraints: *constraints,
            track: Arc::clone(&track),
        });

        Ok(Box::new(ScriptedStream {
            device_id: device_id.to_string(),
            track,
            fail_after: script.fail_after.get(device_id).copied(),
            sequence: 0,
            width: constraints.ideal_width,
            height: constraints.ideal_height,
        }))
    }
}

// =============================================================================
// Scripted Stream
// =============================================================================

struct ScriptedStream {
    device_id: String,
    track: Arc<Mutex<TrackState>>,
    fail_after: Option<u64>,
    sequence: u64,
    width: u32,
    height: u32,
}

#[async_trait]
impl MediaStream for ScriptedStream {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    async fn next_frame(&mut self) -> ScanResult<Frame> {
        if *lock(&self.track) == TrackState::Ended {
            return Err(ScanError::StreamFailed("track ended".into()));
        }

        if self.fail_after == Some(self.sequence) {
            self.stop();
            return Err(ScanError::StreamFailed(format!(
                "device {} disconnected",
                self.device_id
            )));
        }

        tokio::time::sleep(FRAME_INTERVAL).await;
        self.sequence += 1;

        Ok(Frame {
            device_id: self.device_id.clone(),
            sequence: self.sequence,
            width: self.width,
            height: self.height,
            data: vec![255; self.width as usize * self.height as usize],
        })
    }

    fn track_states(&self) -> Vec<TrackState> {
        vec![*lock(&self.track)]
    }

    fn stop(&mut self) {
        *lock(&self.track) = TrackState::Ended;
    }
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Scripted Decoder
// =============================================================================

/// Decoder that "sees" a code on chosen frame numbers and nothing else.
#[derive(Debug, Default)]
pub struct ScriptedDecoder {
    reads: Mutex<HashMap<u64, DecodedCode>>,
    attempts: Mutex<u64>,
}

impl ScriptedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame `sequence` of any stream carries `text`.
    pub fn with_read(self, sequence: u64, text: &str, symbology: Symbology) -> Self {
        lock(&self.reads).insert(sequence, DecodedCode::new(text, symbology));
        self
    }

    /// Number of `decode` calls so far.
    pub fn attempts(&self) -> u64 {
        *lock(&self.attempts)
    }
}

impl FrameDecoder for ScriptedDecoder {
    fn decode(&self, frame: &Frame, formats: &[Symbology]) -> ScanResult<DecodedCode> {
        *lock(&self.attempts) += 1;

        match lock(&self.reads).get(&frame.sequence) {
            Some(read) if formats.contains(&read.symbology) => Ok(read.clone()),
            _ => Err(ScanError::DecodeTransientMiss),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::MultiFormatDecoder;

    #[tokio::test(start_paused = true)]
    async fn test_frames_are_blank_luma_at_requested_size() {
        let camera = ScriptedCamera::new(vec![VideoDevice::new("cam-1", "Integrated Webcam")]);
        let constraints = StreamConstraints {
            ideal_width: 64,
            ideal_height: 48,
            ideal_frame_rate: 30,
        };

        let mut stream = camera.open_stream("cam-1", &constraints).await.unwrap();
        let frame = stream.next_frame().await.unwrap();

        assert_eq!(frame.sequence, 1);
        assert_eq!((frame.width, frame.height), (64, 48));
        assert_eq!(frame.data.len(), 64 * 48);
        assert!(frame.data.iter().all(|&luma| luma == 255));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_frame_has_no_code_for_real_decoder() {
        let camera = ScriptedCamera::new(vec![VideoDevice::new("cam-1", "Integrated Webcam")]);
        let constraints = StreamConstraints {
            ideal_width: 64,
            ideal_height: 48,
            ideal_frame_rate: 30,
        };

        let mut stream = camera.open_stream("cam-1", &constraints).await.unwrap();
        let frame = stream.next_frame().await.unwrap();

        let result = MultiFormatDecoder::new().decode(&frame, &Symbology::ALL);
        assert!(matches!(result, Err(ScanError::DecodeTransientMiss)));
    }
}
