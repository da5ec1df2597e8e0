//! # Scan Dispatcher
//!
//! The single funnel every recognizer feeds into.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Scan Dispatcher                                  │
//! │                                                                         │
//! │  KeyboardListener ──┐                                                   │
//! │  CameraSession ─────┼──► DispatcherHandle::submit(ScannedCode)          │
//! │  Manual entry ──────┘              │                                    │
//! │                                    ▼                                    │
//! │                    ┌───────────────────────────────┐                   │
//! │                    │  1. normalize_scan_code       │                   │
//! │                    │  2. debounce (per code)       │──► Suppressed      │
//! │                    │  3. CatalogIndex::resolve     │                   │
//! │                    └───────────────┬───────────────┘                   │
//! │                                    │                                    │
//! │                     Found / NotFound + user feedback                    │
//! │                                    │                                    │
//! │                                    ▼                                    │
//! │                  mpsc::Receiver<ScanOutcome> (cart consumer)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keyboard and camera run independently; the debounce window is the only
//! ordering guarantee between them. Commands are processed in arrival order
//! by one task, so each physical scan yields at most one outcome.

use std::sync::Arc;
use std::time::Instant;

use tally_core::validation::normalize_scan_code;
use tally_core::{CatalogIndex, DebounceWindow, ScanOutcome, ScannedCode, ValidationError};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::DispatchSettings;
use crate::error::{ScanError, ScanResult};
use crate::feedback::{ScanFeedback, TracingFeedback};

// =============================================================================
// Dispatch Result
// =============================================================================

/// What the dispatcher did with one submitted code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// An outcome was produced.
    Emitted(ScanOutcome),
    /// Same code already emitted inside the debounce window.
    Suppressed,
    /// The code was empty or malformed after normalization.
    Rejected(ValidationError),
}

// =============================================================================
// Handle
// =============================================================================

/// Handle for submitting codes to the dispatcher.
#[derive(Clone)]
pub struct DispatcherHandle {
    cmd_tx: mpsc::Sender<DispatcherCommand>,
}

/// Commands for the dispatcher.
#[derive(Debug)]
enum DispatcherCommand {
    Submit(ScannedCode),
    Shutdown,
}

impl DispatcherHandle {
    /// Submits a completed code.
    pub async fn submit(&self, scanned: ScannedCode) -> ScanResult<()> {
        self.cmd_tx
            .send(DispatcherCommand::Submit(scanned))
            .await
            .map_err(|_| ScanError::ShuttingDown)
    }

    /// Processes everything submitted so far, then stops the dispatcher.
    pub async fn shutdown(&self) -> ScanResult<()> {
        self.cmd_tx
            .send(DispatcherCommand::Shutdown)
            .await
            .map_err(|_| ScanError::ChannelError("Dispatcher channel closed".into()))
    }

    /// Returns true once the dispatcher task has exited.
    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Resolves codes against the latest catalog index.
pub struct ScanDispatcher {
    catalog: watch::Receiver<Arc<CatalogIndex>>,
    debounce: DebounceWindow,
    feedback: Arc<dyn ScanFeedback>,
    channel_capacity: usize,
}

impl ScanDispatcher {
    /// Creates a dispatcher whose feedback only goes to the log.
    pub fn new(catalog: watch::Receiver<Arc<CatalogIndex>>, settings: &DispatchSettings) -> Self {
        Self::with_feedback(catalog, settings, Arc::new(TracingFeedback))
    }

    /// Creates a dispatcher reporting to `feedback`.
    pub fn with_feedback(
        catalog: watch::Receiver<Arc<CatalogIndex>>,
        settings: &DispatchSettings,
        feedback: Arc<dyn ScanFeedback>,
    ) -> Self {
        ScanDispatcher {
            catalog,
            debounce: DebounceWindow::new(settings.debounce_window()),
            feedback,
            channel_capacity: settings.channel_capacity.max(1),
        }
    }

    /// Runs one code through normalization, debounce and lookup at `now`.
    pub fn dispatch_at(&mut self, scanned: ScannedCode, now: Instant) -> Dispatch {
        let code = match normalize_scan_code(&scanned.code) {
            Ok(code) => code,
            Err(e) => {
                debug!(source = %scanned.source, error = %e, "Rejected scan code");
                return Dispatch::Rejected(e);
            }
        };

        if !self.debounce.admit(&code, now) {
            debug!(code = %code, source = %scanned.source, "Duplicate scan suppressed");
            return Dispatch::Suppressed;
        }

        let index = Arc::clone(&self.catalog.borrow());
        let source = scanned.source;

        let outcome = match index.resolve(&code) {
            Some(product) => {
                info!(code = %code, source = %source, product_id = %product.id, "Scan resolved");
                self.feedback.found(product, source);
                ScanOutcome::Found {
                    product: product.clone(),
                    code,
                    source,
                }
            }
            None => {
                let message = ScanError::CodeNotFound {
                    code: code.clone(),
                    scan_source: source,
                }
                .user_message();
                info!(code = %code, source = %source, "Scan not found in catalog");
                self.feedback.not_found(&code, source, &message);
                ScanOutcome::NotFound { code, source }
            }
        };

        Dispatch::Emitted(outcome)
    }

    /// Starts the dispatcher task.
    ///
    /// Returns the submission handle and the receiver the consumer reads
    /// outcomes from. The receiver closes when the dispatcher stops.
    pub fn start(self) -> (DispatcherHandle, mpsc::Receiver<ScanOutcome>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(self.channel_capacity);
        let (outcome_tx, outcome_rx) = mpsc::channel(self.channel_capacity);

        tokio::spawn(async move {
            self.run(cmd_rx, outcome_tx).await;
        });

        (DispatcherHandle { cmd_tx }, outcome_rx)
    }

    /// Main dispatcher loop.
    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<DispatcherCommand>,
        outcome_tx: mpsc::Sender<ScanOutcome>,
    ) {
        info!(debounce_ms = self.debounce.window().as_millis() as u64, "Scan dispatcher started");

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                DispatcherCommand::Submit(scanned) => {
                    let now = tokio::time::Instant::now().into_std();
                    if let Dispatch::Emitted(outcome) = self.dispatch_at(scanned, now) {
                        if outcome_tx.send(outcome).await.is_err() {
                            warn!("Outcome receiver dropped, stopping dispatcher");
                            break;
                        }
                    }
                }
                DispatcherCommand::Shutdown => {
                    info!("Scan dispatcher shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogFeed;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::time::Duration;
    use tally_core::{ScanSource, ScannableProduct};

    use crate::camera::CameraFault;

    fn feed() -> CatalogFeed {
        CatalogFeed::with_products(&[
            ScannableProduct::new("p-1", "Widget", 499).with_barcode("0123456789012")
        ])
    }

    fn keyboard(code: &str) -> ScannedCode {
        ScannedCode::new(code, ScanSource::Keyboard, Utc::now())
    }

    fn camera(code: &str) -> ScannedCode {
        ScannedCode::new(code, ScanSource::Camera, Utc::now())
    }

    #[derive(Default)]
    struct RecordingFeedback {
        messages: Mutex<Vec<String>>,
    }

    impl ScanFeedback for RecordingFeedback {
        fn found(&self, product: &ScannableProduct, _source: ScanSource) {
            self.messages.lock().unwrap().push(format!("found {}", product.name));
        }
        fn not_found(&self, _code: &str, _source: ScanSource, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
        fn camera_fault(&self, _fault: &CameraFault, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn test_found_and_not_found() {
        let feed = feed();
        let mut dispatcher = ScanDispatcher::new(feed.subscribe(), &DispatchSettings::default());
        let t0 = Instant::now();

        match dispatcher.dispatch_at(keyboard("0123456789012"), t0) {
            Dispatch::Emitted(ScanOutcome::Found { product, source, .. }) => {
                assert_eq!(product.name, "Widget");
                assert_eq!(source, ScanSource::Keyboard);
            }
            other => panic!("expected Found, got {:?}", other),
        }

        assert_eq!(
            dispatcher.dispatch_at(camera("9999999999999"), t0),
            Dispatch::Emitted(ScanOutcome::NotFound {
                code: "9999999999999".into(),
                source: ScanSource::Camera,
            })
        );
    }

    #[test]
    fn test_duplicate_within_window_is_suppressed_across_sources() {
        let feed = feed();
        let mut dispatcher = ScanDispatcher::new(feed.subscribe(), &DispatchSettings::default());
        let t0 = Instant::now();

        assert!(matches!(
            dispatcher.dispatch_at(keyboard("0123456789012"), t0),
            Dispatch::Emitted(_)
        ));
        assert_eq!(
            dispatcher.dispatch_at(camera("0123456789012"), t0 + Duration::from_millis(50)),
            Dispatch::Suppressed
        );
        assert!(matches!(
            dispatcher.dispatch_at(keyboard("0123456789012"), t0 + Duration::from_millis(400)),
            Dispatch::Emitted(_)
        ));
    }

    #[test]
    fn test_code_is_normalized_before_lookup() {
        let feed = feed();
        let mut dispatcher = ScanDispatcher::new(feed.subscribe(), &DispatchSettings::default());

        let outcome = dispatcher.dispatch_at(keyboard(" 0123456789012\r"), Instant::now());
        assert!(matches!(outcome, Dispatch::Emitted(ScanOutcome::Found { .. })));

        assert!(matches!(
            dispatcher.dispatch_at(keyboard("   "), Instant::now()),
            Dispatch::Rejected(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_rejection_can_be_kept_for_display() {
        let feed = feed();
        let mut dispatcher = ScanDispatcher::new(feed.subscribe(), &DispatchSettings::default());

        let rejected = dispatcher.dispatch_at(keyboard("\x1d\x1d"), Instant::now());
        let kept = rejected.clone();

        assert_eq!(kept, rejected);
        assert!(matches!(kept, Dispatch::Rejected(ValidationError::Required { .. })));
    }

    #[test]
    fn test_catalog_replacement_is_observed() {
        let feed = feed();
        let mut dispatcher = ScanDispatcher::new(feed.subscribe(), &DispatchSettings::default());
        let t0 = Instant::now();

        feed.replace_products(&[ScannableProduct::new("p-7", "Stapler", 1299).with_barcode("96385074")]);

        let outcome = dispatcher.dispatch_at(keyboard("96385074"), t0);
        assert!(matches!(outcome, Dispatch::Emitted(ScanOutcome::Found { .. })));
    }

    #[test]
    fn test_feedback_messages_differ_per_source() {
        let feed = feed();
        let recorder = Arc::new(RecordingFeedback::default());
        let mut dispatcher = ScanDispatcher::with_feedback(
            feed.subscribe(),
            &DispatchSettings::default(),
            recorder.clone(),
        );
        let t0 = Instant::now();

        dispatcher.dispatch_at(keyboard("11111111"), t0);
        dispatcher.dispatch_at(camera("22222222"), t0);
        dispatcher.dispatch_at(keyboard("0123456789012"), t0);

        let messages = recorder.messages.lock().unwrap();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].contains("11111111"));
        assert!(messages[1].contains("22222222"));
        assert_ne!(
            messages[0].replace("11111111", "X"),
            messages[1].replace("22222222", "X")
        );
        assert_eq!(messages[2], "found Widget");
    }

    #[tokio::test(start_paused = true)]
    async fn test_actor_emits_one_outcome_per_physical_scan() {
        let feed = feed();
        let (handle, mut outcomes) =
            ScanDispatcher::new(feed.subscribe(), &DispatchSettings::default()).start();

        handle.submit(keyboard("0123456789012")).await.unwrap();
        tokio::time::advance(Duration::from_millis(50)).await;
        handle.submit(camera("0123456789012")).await.unwrap();
        handle.submit(keyboard("9999999999999")).await.unwrap();
        handle.shutdown().await.unwrap();

        let first = outcomes.recv().await.unwrap();
        assert!(first.is_found());
        let second = outcomes.recv().await.unwrap();
        assert_eq!(second.code(), "9999999999999");
        assert!(!second.is_found());

        // Shutdown closes the outcome stream
        assert!(outcomes.recv().await.is_none());
        assert!(handle.submit(keyboard("0123456789012")).await.is_err());
    }
}
