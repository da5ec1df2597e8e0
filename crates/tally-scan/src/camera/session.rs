//! # Camera Session
//!
//! One modal-scoped camera capture: permission, device choice, a live
//! stream and the decode loop reading it.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CameraSession                                    │
//! │                                                                         │
//! │  lifecycle token ◄──────── SessionCloser::close() (modal hidden)        │
//! │       │                                                                 │
//! │       └─ child token ──► decode task ──owns──► Box<dyn MediaStream>     │
//! │                              │                                          │
//! │                              ├─ next_frame ─► DecodeFilter ─► decoder   │
//! │                              ├─ read ──────► DispatcherHandle::submit   │
//! │                              └─ exit ──────► stream.stop()              │
//! │                                                                         │
//! │  stop() / switch_device() cancel the child token and await the task,   │
//! │  so no frame is forwarded once they return.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A session is single-use: once it reaches `Stopped` or a terminal `Error`
//! the host opens a new one.

use std::sync::Arc;

use chrono::Utc;
use tally_core::{ScanSource, ScannedCode, Symbology};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::backend::{CameraBackend, MediaStream, PermissionOutcome, StreamConstraints};
use super::decoder::{DecodeFilter, FrameDecoder, ReadVerdict};
use super::device::{select_default, VideoDevice};
use super::state::{CameraFault, CameraState};
use crate::config::CameraSettings;
use crate::dispatcher::DispatcherHandle;
use crate::error::{ScanError, ScanResult};
use crate::feedback::{ScanFeedback, TracingFeedback};

// =============================================================================
// Session Closer
// =============================================================================

/// Cloneable handle that ends a session from outside, including while
/// `open()` is still waiting on the permission prompt.
#[derive(Debug, Clone)]
pub struct SessionCloser {
    token: CancellationToken,
}

impl SessionCloser {
    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

// =============================================================================
// Session
// =============================================================================

struct DecodeTask {
    device_id: String,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Everything the decode task needs besides the stream.
#[derive(Clone)]
struct DecodeContext {
    session_id: Uuid,
    decoder: Arc<dyn FrameDecoder>,
    formats: Arc<[Symbology]>,
    settings: CameraSettings,
    dispatcher: DispatcherHandle,
    feedback: Arc<dyn ScanFeedback>,
    state: Arc<watch::Sender<CameraState>>,
    lifecycle: CancellationToken,
}

/// Camera decoder session.
pub struct CameraSession {
    id: Uuid,
    backend: Arc<dyn CameraBackend>,
    decoder: Arc<dyn FrameDecoder>,
    settings: CameraSettings,
    dispatcher: DispatcherHandle,
    feedback: Arc<dyn ScanFeedback>,
    state: Arc<watch::Sender<CameraState>>,
    lifecycle: CancellationToken,
    devices: Vec<VideoDevice>,
    decode: Option<DecodeTask>,
}

impl CameraSession {
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        decoder: Arc<dyn FrameDecoder>,
        settings: CameraSettings,
        dispatcher: DispatcherHandle,
    ) -> Self {
        let (state, _rx) = watch::channel(CameraState::Idle);

        CameraSession {
            id: Uuid::new_v4(),
            backend,
            decoder,
            settings,
            dispatcher,
            feedback: Arc::new(TracingFeedback),
            state: Arc::new(state),
            lifecycle: CancellationToken::new(),
            devices: Vec::new(),
            decode: None,
        }
    }

    pub fn with_feedback(mut self, feedback: Arc<dyn ScanFeedback>) -> Self {
        self.feedback = feedback;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> CameraState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<CameraState> {
        self.state.subscribe()
    }

    /// Devices enumerated by `open()`, for the device picker.
    pub fn devices(&self) -> &[VideoDevice] {
        &self.devices
    }

    /// Device currently streaming, if any.
    pub fn active_device(&self) -> Option<&str> {
        self.decode.as_ref().map(|task| task.device_id.as_str())
    }

    pub fn closer(&self) -> SessionCloser {
        SessionCloser {
            token: self.lifecycle.clone(),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Requests permission, enumerates devices and starts streaming from the
    /// default device.
    pub async fn open(&mut self) -> ScanResult<()> {
        let current = self.state();
        if current != CameraState::Idle {
            return Err(ScanError::InvalidTransition {
                action: "open".into(),
                state: current.name().into(),
            });
        }

        info!(session_id = %self.id, "Camera session opening");
        self.set_state(CameraState::RequestingPermission);

        let backend = Arc::clone(&self.backend);
        let permission = tokio::select! {
            biased;
            _ = self.lifecycle.cancelled() => return Err(self.abort_open()),
            outcome = backend.request_permission() => outcome,
        };

        match permission {
            PermissionOutcome::Granted => {}
            PermissionOutcome::Denied => return Err(self.fail(CameraFault::PermissionDenied)),
            PermissionOutcome::NoDevice => return Err(self.fail(CameraFault::NoDevice)),
        }

        self.set_state(CameraState::DeviceEnumeration);

        let enumerated = tokio::select! {
            biased;
            _ = self.lifecycle.cancelled() => return Err(self.abort_open()),
            devices = backend.enumerate_devices() => devices,
        };

        let devices = match enumerated {
            Ok(devices) => devices,
            Err(e) => {
                return Err(self.fail(CameraFault::StreamInitFailed {
                    reason: e.to_string(),
                }))
            }
        };

        let device_id = match select_default(&devices, self.settings.preferred_device_id.as_deref()) {
            Some(device) => device.device_id.clone(),
            None => return Err(self.fail(CameraFault::NoDevice)),
        };

        debug!(session_id = %self.id, count = devices.len(), device_id = %device_id, "Video inputs enumerated");
        self.devices = devices;

        self.start_stream(&device_id).await
    }

    /// Tears down the current stream and streams from `device_id` instead.
    ///
    /// Allowed while streaming, and after a stream fault as the retry path.
    pub async fn switch_device(&mut self, device_id: &str) -> ScanResult<()> {
        let current = self.state();
        let allowed = match &current {
            CameraState::Streaming { .. } => true,
            CameraState::Error(fault) => fault.allows_device_switch() && !self.devices.is_empty(),
            _ => false,
        };
        if !allowed || self.lifecycle.is_cancelled() {
            return Err(ScanError::InvalidTransition {
                action: "switch device".into(),
                state: current.name().into(),
            });
        }

        if !self.devices.iter().any(|d| d.device_id == device_id) {
            return Err(ScanError::DeviceNotFound(device_id.to_string()));
        }

        info!(session_id = %self.id, device_id = %device_id, "Switching camera device");
        self.teardown_stream().await;
        self.start_stream(device_id).await
    }

    /// Stops the session: cancels decoding and ends every track.
    ///
    /// Idempotent. A session that ended in `Error` keeps its fault.
    pub async fn stop(&mut self) {
        self.lifecycle.cancel();
        self.teardown_stream().await;
        mark_stopped(&self.state);
        info!(session_id = %self.id, state = %self.state(), "Camera session stopped");
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn start_stream(&mut self, device_id: &str) -> ScanResult<()> {
        let constraints = StreamConstraints::from_settings(&self.settings);
        let backend = Arc::clone(&self.backend);

        let opened = tokio::select! {
            biased;
            _ = self.lifecycle.cancelled() => return Err(self.abort_open()),
            stream = backend.open_stream(device_id, &constraints) => stream,
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                return Err(self.fail(CameraFault::StreamInitFailed {
                    reason: e.to_string(),
                }))
            }
        };

        if self.lifecycle.is_cancelled() {
            stream.stop();
            return Err(self.abort_open());
        }

        let cancel = self.lifecycle.child_token();
        let context = DecodeContext {
            session_id: self.id,
            decoder: Arc::clone(&self.decoder),
            formats: self.settings.formats.clone().into(),
            settings: self.settings.clone(),
            dispatcher: self.dispatcher.clone(),
            feedback: Arc::clone(&self.feedback),
            state: Arc::clone(&self.state),
            lifecycle: self.lifecycle.clone(),
        };

        let handle = tokio::spawn(decode_loop(context, stream, cancel.clone()));
        self.decode = Some(DecodeTask {
            device_id: device_id.to_string(),
            cancel,
            handle,
        });

        self.set_state(CameraState::Streaming {
            device_id: device_id.to_string(),
        });
        info!(session_id = %self.id, device_id = %device_id, "Camera streaming");
        Ok(())
    }

    async fn teardown_stream(&mut self) {
        if let Some(task) = self.decode.take() {
            task.cancel.cancel();
            if let Err(e) = task.handle.await {
                warn!(session_id = %self.id, error = %e, "Decode task ended abnormally");
            }
            debug!(session_id = %self.id, device_id = %task.device_id, "Camera stream released");
        }
    }

    fn set_state(&self, state: CameraState) {
        self.state.send_replace(state);
    }

    fn fail(&self, fault: CameraFault) -> ScanError {
        warn!(session_id = %self.id, ?fault, "Camera session failed");
        self.feedback.camera_fault(&fault, &fault.user_message());
        self.set_state(CameraState::Error(fault.clone()));
        fault.into()
    }

    fn abort_open(&self) -> ScanError {
        debug!(session_id = %self.id, "Camera session closed while opening");
        mark_stopped(&self.state);
        ScanError::SessionClosed
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.lifecycle.cancel();
        if let Some(task) = self.decode.take() {
            // The task stops its stream on its way out
            task.cancel.cancel();
        }
    }
}

fn mark_stopped(state: &watch::Sender<CameraState>) {
    state.send_if_modified(|current| {
        if matches!(current, CameraState::Error(_) | CameraState::Stopped) {
            false
        } else {
            *current = CameraState::Stopped;
            true
        }
    });
}

// =============================================================================
// Decode Loop
// =============================================================================

async fn decode_loop(
    ctx: DecodeContext,
    mut stream: Box<dyn MediaStream>,
    cancel: CancellationToken,
) {
    let mut filter = DecodeFilter::new(ctx.settings.decode_interval(), ctx.settings.repeat_cooldown());

    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            frame = stream.next_frame() => frame,
        };

        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                stream.stop();
                let fault = CameraFault::StreamFailed {
                    reason: e.to_string(),
                };
                warn!(session_id = %ctx.session_id, device_id = %stream.device_id(), ?fault, "Camera stream failed");
                ctx.feedback.camera_fault(&fault, &fault.user_message());
                ctx.state.send_replace(CameraState::Error(fault));
                return;
            }
        };

        let now = tokio::time::Instant::now().into_std();
        if !filter.should_attempt(now) {
            continue;
        }

        let read = match ctx.decoder.decode(&frame, &ctx.formats) {
            Ok(read) => read,
            Err(e) if e.is_recoverable() => continue,
            Err(e) => {
                stream.stop();
                let fault = CameraFault::StreamFailed {
                    reason: e.to_string(),
                };
                warn!(session_id = %ctx.session_id, ?fault, "Decoder failed");
                ctx.feedback.camera_fault(&fault, &fault.user_message());
                ctx.state.send_replace(CameraState::Error(fault));
                return;
            }
        };

        match filter.check(&read, now) {
            ReadVerdict::Forward => {}
            ReadVerdict::BadChecksum => {
                debug!(session_id = %ctx.session_id, symbology = %read.symbology, "Discarding read with bad check digit");
                continue;
            }
            ReadVerdict::Repeat => continue,
        }

        if cancel.is_cancelled() {
            break;
        }

        debug!(session_id = %ctx.session_id, code = %read.text, symbology = %read.symbology, "Camera read");
        let scanned = ScannedCode::new(read.text, ScanSource::Camera, Utc::now()).with_symbology(read.symbology);
        if let Err(e) = ctx.dispatcher.submit(scanned).await {
            warn!(session_id = %ctx.session_id, error = %e, "Dropping camera scan");
        }

        if ctx.settings.close_on_detect {
            stream.stop();
            mark_stopped(&ctx.state);
            info!(session_id = %ctx.session_id, "Camera session closed after detection");
            return;
        }
    }

    stream.stop();
    if ctx.lifecycle.is_cancelled() {
        mark_stopped(&ctx.state);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::backend::TrackState;
    use crate::camera::scripted::{ScriptedCamera, ScriptedDecoder};
    use crate::catalog::CatalogFeed;
    use crate::config::DispatchSettings;
    use crate::dispatcher::ScanDispatcher;
    use std::time::Duration;
    use tally_core::{ScanOutcome, ScannableProduct};
    use tokio::sync::mpsc;

    struct Harness {
        _feed: CatalogFeed,
        camera: ScriptedCamera,
        session: CameraSession,
        outcomes: mpsc::Receiver<ScanOutcome>,
    }

    fn devices() -> Vec<VideoDevice> {
        vec![
            VideoDevice::new("rear-1", "Back Camera"),
            VideoDevice::new("front-1", "FaceTime HD Camera"),
        ]
    }

    fn settings() -> CameraSettings {
        CameraSettings {
            decode_interval_ms: 0,
            ..CameraSettings::default()
        }
    }

    fn harness(camera: ScriptedCamera, decoder: ScriptedDecoder, settings: CameraSettings) -> Harness {
        let feed = CatalogFeed::with_products(&[
            ScannableProduct::new("p-1", "Widget", 499).with_barcode("0123456789012")
        ]);
        let (dispatcher, outcomes) =
            ScanDispatcher::new(feed.subscribe(), &DispatchSettings::default()).start();
        let session = CameraSession::new(
            Arc::new(camera.clone()),
            Arc::new(decoder),
            settings,
            dispatcher,
        );

        Harness {
            _feed: feed,
            camera,
            session,
            outcomes,
        }
    }

    async fn frames(n: u64) {
        tokio::time::sleep(Duration::from_millis(33 * n + 5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_streams_from_front_camera() {
        let mut h = harness(ScriptedCamera::new(devices()), ScriptedDecoder::new(), settings());
        let mut states = h.session.subscribe();

        h.session.open().await.unwrap();

        assert_eq!(
            h.session.state(),
            CameraState::Streaming {
                device_id: "front-1".into()
            }
        );
        assert_eq!(h.session.active_device(), Some("front-1"));
        assert_eq!(h.session.devices().len(), 2);
        assert!(states.has_changed().unwrap());
        assert!(states.borrow_and_update().is_streaming());

        h.session.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_remembered_device_is_used() {
        let settings = CameraSettings {
            preferred_device_id: Some("rear-1".into()),
            ..settings()
        };
        let mut h = harness(ScriptedCamera::new(devices()), ScriptedDecoder::new(), settings);

        h.session.open().await.unwrap();
        assert_eq!(h.session.active_device(), Some("rear-1"));
        h.session.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_denied_is_terminal() {
        let camera = ScriptedCamera::new(devices()).with_permission(PermissionOutcome::Denied);
        let mut h = harness(camera, ScriptedDecoder::new(), settings());

        let err = h.session.open().await.unwrap_err();
        assert!(matches!(err, ScanError::PermissionDenied));
        assert_eq!(h.session.state(), CameraState::Error(CameraFault::PermissionDenied));
        assert!(h.camera.opened_streams().is_empty());

        // No retry within the session
        assert!(matches!(
            h.session.open().await,
            Err(ScanError::InvalidTransition { .. })
        ));
        assert!(matches!(
            h.session.switch_device("rear-1").await,
            Err(ScanError::InvalidTransition { .. })
        ));

        // stop() keeps the fault visible
        h.session.stop().await;
        assert_eq!(h.session.state(), CameraState::Error(CameraFault::PermissionDenied));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_devices_is_terminal() {
        let mut h = harness(ScriptedCamera::new(Vec::new()), ScriptedDecoder::new(), settings());

        assert!(matches!(h.session.open().await, Err(ScanError::NoDeviceFound)));
        assert_eq!(h.session.state(), CameraState::Error(CameraFault::NoDevice));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_every_track_and_forwards_nothing_after() {
        // Code appears on frame 10, well after stop()
        let decoder = ScriptedDecoder::new().with_read(10, "0123456789012", Symbology::Ean13);
        let mut h = harness(ScriptedCamera::new(devices()), decoder, settings());

        h.session.open().await.unwrap();
        frames(2).await;
        h.session.stop().await;

        assert_eq!(h.session.state(), CameraState::Stopped);
        assert_eq!(h.camera.live_tracks(), 0);
        assert!(h
            .camera
            .opened_streams()
            .iter()
            .all(|s| s.track_state() == TrackState::Ended));

        frames(20).await;
        assert!(h.outcomes.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_detection_forwards_and_closes() {
        let decoder = ScriptedDecoder::new().with_read(3, "0123456789012", Symbology::Ean13);
        let mut h = harness(ScriptedCamera::new(devices()), decoder, settings());

        h.session.open().await.unwrap();

        let outcome = h.outcomes.recv().await.unwrap();
        assert_eq!(outcome.source(), ScanSource::Camera);
        assert_eq!(outcome.product().map(|p| p.name.as_str()), Some("Widget"));

        let mut states = h.session.subscribe();
        states
            .wait_for(|s| *s == CameraState::Stopped)
            .await
            .unwrap();
        assert_eq!(h.camera.live_tracks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_continuous_mode_keeps_streaming() {
        let decoder = ScriptedDecoder::new().with_read(2, "9999999999999", Symbology::QrCode);
        let settings = CameraSettings {
            close_on_detect: false,
            ..settings()
        };
        let mut h = harness(ScriptedCamera::new(devices()), decoder, settings);

        h.session.open().await.unwrap();

        let outcome = h.outcomes.recv().await.unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::NotFound {
                code: "9999999999999".into(),
                source: ScanSource::Camera,
            }
        );
        frames(3).await;
        assert!(h.session.state().is_streaming());

        h.session.stop().await;
        assert_eq!(h.camera.live_tracks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_checksum_read_is_ignored() {
        let decoder = ScriptedDecoder::new()
            .with_read(1, "9999999999999", Symbology::Ean13)
            .with_read(2, "0123456789012", Symbology::Ean13);
        let mut h = harness(ScriptedCamera::new(devices()), decoder, settings());

        h.session.open().await.unwrap();

        let outcome = h.outcomes.recv().await.unwrap();
        assert_eq!(outcome.code(), "0123456789012");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfigured_format_is_not_read() {
        let decoder = ScriptedDecoder::new().with_read(1, "0123456789012", Symbology::Ean13);
        let settings = CameraSettings {
            formats: vec![Symbology::QrCode],
            ..settings()
        };
        let mut h = harness(ScriptedCamera::new(devices()), decoder, settings);

        h.session.open().await.unwrap();
        frames(5).await;
        assert!(h.outcomes.try_recv().is_err());
        h.session.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_device_releases_previous_tracks() {
        let mut h = harness(ScriptedCamera::new(devices()), ScriptedDecoder::new(), settings());

        h.session.open().await.unwrap();
        h.session.switch_device("rear-1").await.unwrap();

        let streams = h.camera.opened_streams();
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].device_id, "front-1");
        assert_eq!(streams[0].track_state(), TrackState::Ended);
        assert_eq!(streams[1].device_id, "rear-1");
        assert_eq!(streams[1].track_state(), TrackState::Live);
        assert_eq!(
            h.session.state(),
            CameraState::Streaming {
                device_id: "rear-1".into()
            }
        );

        assert!(matches!(
            h.session.switch_device("usb-9").await,
            Err(ScanError::DeviceNotFound(_))
        ));

        h.session.stop().await;
        assert_eq!(h.camera.live_tracks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_init_failure_allows_switching() {
        let camera = ScriptedCamera::new(devices()).with_unavailable_device("front-1");
        let mut h = harness(camera, ScriptedDecoder::new(), settings());

        assert!(matches!(
            h.session.open().await,
            Err(ScanError::StreamInitFailed(_))
        ));
        assert!(matches!(
            h.session.state(),
            CameraState::Error(CameraFault::StreamInitFailed { .. })
        ));

        h.session.switch_device("rear-1").await.unwrap();
        assert!(h.session.state().is_streaming());
        h.session.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_failure_releases_tracks() {
        let camera = ScriptedCamera::new(devices()).with_stream_failure_after("front-1", 3);
        let mut h = harness(camera, ScriptedDecoder::new(), settings());

        h.session.open().await.unwrap();

        let mut states = h.session.subscribe();
        let state = states
            .wait_for(|s| matches!(s, CameraState::Error(_)))
            .await
            .unwrap()
            .clone();
        assert!(matches!(state, CameraState::Error(CameraFault::StreamFailed { .. })));
        assert_eq!(h.camera.live_tracks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closer_cancels_pending_open() {
        let camera = ScriptedCamera::new(devices()).with_permission_delay(Duration::from_secs(5));
        let mut h = harness(camera, ScriptedDecoder::new(), settings());

        let closer = h.session.closer();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            closer.close();
        });

        assert!(matches!(h.session.open().await, Err(ScanError::SessionClosed)));
        assert_eq!(h.session.state(), CameraState::Stopped);
        assert!(h.camera.opened_streams().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_closer_stops_running_stream() {
        let mut h = harness(ScriptedCamera::new(devices()), ScriptedDecoder::new(), settings());
        h.session.open().await.unwrap();

        h.session.closer().close();

        let mut states = h.session.subscribe();
        states.wait_for(|s| *s == CameraState::Stopped).await.unwrap();
        assert_eq!(h.camera.live_tracks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_tracks() {
        let h = harness(ScriptedCamera::new(devices()), ScriptedDecoder::new(), settings());
        let camera = h.camera.clone();
        let mut session = h.session;

        session.open().await.unwrap();
        assert_eq!(camera.live_tracks(), 1);

        drop(session);
        frames(1).await;
        assert_eq!(camera.live_tracks(), 0);
    }
}
