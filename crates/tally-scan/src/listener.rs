//! # Keyboard Listener
//!
//! Owned attachment of the keystroke-wedge detector to the host's key events.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Keyboard Scan Listener                             │
//! │                                                                         │
//! │   host keydown ──► KeyboardBus::publish ──► (at most one listener)      │
//! │                                                 │                       │
//! │                                                 ▼                       │
//! │                              ┌──────────────────────────────────┐      │
//! │                              │  listener task                   │      │
//! │                              │  WedgeDetector::on_key           │      │
//! │                              │  fallback timer (sleep_until)    │      │
//! │                              └───────────────┬──────────────────┘      │
//! │                                              │ completed code           │
//! │                                              ▼                          │
//! │                                     DispatcherHandle::submit            │
//! │                                                                         │
//! │   KeyboardListener::detach() / Drop ──► slot freed, task cancelled      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The screen owns the [`KeyboardListener`] for its lifetime. Attaching a
//! second listener while one is live fails, so listeners never accumulate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tally_core::wedge::{Key, KeyTarget, Modifiers};
use tally_core::{KeyEvent, ScanSource, ScannedCode, WedgeAction, WedgeConfig, WedgeDetector};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatcher::DispatcherHandle;
use crate::error::{ScanError, ScanResult};

// =============================================================================
// Keyboard Bus
// =============================================================================

struct Attached {
    id: u64,
    tx: mpsc::UnboundedSender<KeyEvent>,
}

/// Process-wide source of raw key events.
#[derive(Clone, Default)]
pub struct KeyboardBus {
    slot: Arc<Mutex<Option<Attached>>>,
    next_id: Arc<AtomicU64>,
}

impl KeyboardBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Attached>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes a keydown, stamping it with the current time.
    ///
    /// Returns false when no listener is attached.
    pub fn publish(&self, key: Key, target: KeyTarget, modifiers: Modifiers) -> bool {
        let event = KeyEvent {
            key,
            target,
            modifiers,
            at: Instant::now().into_std(),
        };
        self.publish_event(event)
    }

    /// Publishes a pre-stamped event.
    pub fn publish_event(&self, event: KeyEvent) -> bool {
        let mut slot = self.slot();
        match slot.as_ref() {
            Some(attached) => {
                if attached.tx.send(event).is_ok() {
                    true
                } else {
                    // Listener task is gone without detaching
                    *slot = None;
                    false
                }
            }
            None => false,
        }
    }

    /// Returns true while a listener is attached.
    pub fn has_listener(&self) -> bool {
        self.slot().is_some()
    }

    fn attach(&self) -> ScanResult<(u64, mpsc::UnboundedReceiver<KeyEvent>)> {
        let mut slot = self.slot();
        if let Some(attached) = slot.as_ref() {
            if !attached.tx.is_closed() {
                return Err(ScanError::ListenerAlreadyAttached);
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        *slot = Some(Attached { id, tx });
        Ok((id, rx))
    }

    fn release(&self, id: u64) {
        let mut slot = self.slot();
        if slot.as_ref().map(|a| a.id) == Some(id) {
            *slot = None;
        }
    }
}

// =============================================================================
// Keyboard Listener
// =============================================================================

/// Owned handle to the running keyboard scan listener.
pub struct KeyboardListener {
    bus: KeyboardBus,
    id: u64,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl KeyboardListener {
    /// Attaches a detector to `bus`, forwarding completed scans to
    /// `dispatcher`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn attach(
        bus: &KeyboardBus,
        config: WedgeConfig,
        dispatcher: DispatcherHandle,
    ) -> ScanResult<Self> {
        let (id, rx) = bus.attach()?;
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run(
            WedgeDetector::new(config),
            rx,
            dispatcher,
            cancel.clone(),
        ));

        info!(listener_id = id, "Keyboard scan listener attached");

        Ok(KeyboardListener {
            bus: bus.clone(),
            id,
            cancel,
            task: Some(task),
        })
    }

    /// Detaches from the bus and waits for the listener task to finish.
    pub async fn detach(mut self) {
        self.bus.release(self.id);
        self.cancel.cancel();

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Keyboard listener task ended abnormally");
            }
        }

        info!(listener_id = self.id, "Keyboard scan listener detached");
    }

    /// Returns true while the listener still owns the bus.
    pub fn is_attached(&self) -> bool {
        !self.cancel.is_cancelled() && self.task.as_ref().map_or(false, |t| !t.is_finished())
    }
}

impl Drop for KeyboardListener {
    fn drop(&mut self) {
        self.bus.release(self.id);
        self.cancel.cancel();
    }
}

/// Listener task: feeds events to the detector and runs the fallback timer.
async fn run(
    mut detector: WedgeDetector,
    mut rx: mpsc::UnboundedReceiver<KeyEvent>,
    dispatcher: DispatcherHandle,
    cancel: CancellationToken,
) {
    let mut fallback: Option<(Instant, u64)> = None;

    loop {
        let deadline = fallback.map(|(at, _)| at);

        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            event = rx.recv() => {
                let Some(event) = event else { break };

                // A deadline that passed before this key was pressed fires first
                if let Some((at, generation)) = fallback {
                    if Instant::from_std(event.at) >= at {
                        fallback = None;
                        if !complete_fallback(&mut detector, generation, &dispatcher).await {
                            break;
                        }
                    }
                }

                match detector.on_key(&event) {
                    WedgeAction::Ignored => {}
                    WedgeAction::Buffered { restarted } => {
                        if restarted {
                            debug!("Stale keystroke buffer discarded");
                        }
                        fallback = None;
                    }
                    WedgeAction::ScheduleCompletion { at, generation } => {
                        fallback = Some((Instant::from_std(at), generation));
                    }
                    WedgeAction::Completed(code) => {
                        fallback = None;
                        if !forward(&dispatcher, code).await {
                            break;
                        }
                    }
                    WedgeAction::Discarded => {
                        debug!("Pending keystroke buffer discarded");
                        fallback = None;
                    }
                }
            }

            _ = wait_until(deadline) => {
                if let Some((_, generation)) = fallback.take() {
                    if !complete_fallback(&mut detector, generation, &dispatcher).await {
                        break;
                    }
                }
            }
        }
    }

    detector.discard();
}

/// Returns false when the dispatcher is gone.
async fn complete_fallback(
    detector: &mut WedgeDetector,
    generation: u64,
    dispatcher: &DispatcherHandle,
) -> bool {
    match detector.complete_pending(generation) {
        Some(code) => {
            debug!("Scan completed without terminator");
            forward(dispatcher, code).await
        }
        None => true,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Returns false when the dispatcher is gone.
async fn forward(dispatcher: &DispatcherHandle, code: String) -> bool {
    debug!(code = %code, "Keyboard scan completed");
    let scanned = ScannedCode::new(code, ScanSource::Keyboard, Utc::now());

    match dispatcher.submit(scanned).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Dropping keyboard scan");
            false
        }
    }
}
