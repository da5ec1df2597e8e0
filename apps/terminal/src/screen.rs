//! # POS Screen
//!
//! Mounts the capture pipeline for the lifetime of the point-of-sale screen.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         PosScreen::mount                                │
//! │                                                                         │
//! │  CatalogFeed ──watch──► ScanDispatcher task ──outcomes──► consumer task │
//! │                              ▲        ▲                        │        │
//! │  KeyboardBus ─► KeyboardListener      │                        ▼        │
//! │                                       │                   CartState     │
//! │  open_camera_modal ─► CameraSession ──┘                                 │
//! │  submit_manual_code ──────────────────┘   feedback ─► NotificationCenter│
//! │                                                                         │
//! │                         PosScreen::teardown                             │
//! │  detach listener → stop camera → shutdown dispatcher → join consumer    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dropping the screen without `teardown` still releases the keyboard bus
//! and every camera track; only the queued outcomes are lost.

use std::sync::Arc;

use chrono::Utc;
use tally_core::{ScanOutcome, ScanSource, ScannableProduct, ScannedCode};
use tally_scan::camera::{CameraBackend, FrameDecoder};
use tally_scan::{
    CameraSession, CameraState, CatalogFeed, DispatcherHandle, KeyboardBus, KeyboardListener,
    ScanDispatcher, ScanError, ScanFeedback, ScannerConfig, SessionCloser, VideoDevice,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{TerminalError, TerminalResult};
use crate::state::{CartState, CartTotals, NotificationCenter, NotificationLevel};

/// Platform camera pieces the screen opens sessions with.
#[derive(Clone)]
pub struct CameraRig {
    pub backend: Arc<dyn CameraBackend>,
    pub decoder: Arc<dyn FrameDecoder>,
}

/// The mounted point-of-sale screen.
pub struct PosScreen {
    config: ScannerConfig,
    catalog: CatalogFeed,
    dispatcher: DispatcherHandle,
    listener: Option<KeyboardListener>,
    rig: Option<CameraRig>,
    camera: Option<CameraSession>,
    cart: CartState,
    notifications: NotificationCenter,
    consumer: Option<JoinHandle<()>>,
}

impl PosScreen {
    /// Wires the catalog, dispatcher, keyboard listener and outcome consumer.
    ///
    /// Fails with `ListenerAlreadyAttached` if another screen still owns
    /// `bus`. Must be called from within a Tokio runtime.
    pub fn mount(
        config: ScannerConfig,
        products: &[ScannableProduct],
        bus: &KeyboardBus,
    ) -> TerminalResult<Self> {
        let catalog = CatalogFeed::with_products(products);
        let cart = CartState::new();
        let notifications = NotificationCenter::new();
        let feedback: Arc<dyn ScanFeedback> = Arc::new(notifications.clone());

        let (dispatcher, outcomes) =
            ScanDispatcher::with_feedback(catalog.subscribe(), &config.dispatch, feedback).start();

        // On failure the dispatcher task ends once its last handle drops.
        let listener = KeyboardListener::attach(bus, config.wedge.to_wedge_config(), dispatcher.clone())?;

        let consumer = tokio::spawn(consume_outcomes(outcomes, cart.clone(), notifications.clone()));

        info!(products = products.len(), "POS screen mounted");

        Ok(PosScreen {
            config,
            catalog,
            dispatcher,
            listener: Some(listener),
            rig: None,
            camera: None,
            cart,
            notifications,
            consumer: Some(consumer),
        })
    }

    /// Enables the camera modal with the given backend and decoder.
    pub fn with_camera(mut self, backend: Arc<dyn CameraBackend>, decoder: Arc<dyn FrameDecoder>) -> Self {
        self.rig = Some(CameraRig { backend, decoder });
        self
    }

    pub fn cart(&self) -> &CartState {
        &self.cart
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn catalog(&self) -> &CatalogFeed {
        &self.catalog
    }

    /// Rebuilds the catalog index; the next scan resolves against it.
    pub fn replace_products(&self, products: &[ScannableProduct]) {
        self.catalog.replace_products(products);
    }

    /// Sends a code typed into the scanner modal through the dispatcher.
    pub async fn submit_manual_code(&self, code: &str) -> TerminalResult<()> {
        self.dispatcher
            .submit(ScannedCode::new(code, ScanSource::Manual, Utc::now()))
            .await?;
        Ok(())
    }

    // =========================================================================
    // Camera Modal
    // =========================================================================

    /// Opens the scanner modal's camera session.
    ///
    /// Any previous session is stopped first so at most one stream is live.
    /// Session faults (permission, no device, stream) are reported through
    /// notifications and the returned state rather than as errors.
    pub async fn open_camera_modal(&mut self) -> TerminalResult<CameraState> {
        let rig = self.rig.clone().ok_or(TerminalError::CameraUnavailable)?;
        self.close_camera_modal().await;

        let session = CameraSession::new(
            rig.backend,
            rig.decoder,
            self.config.camera.clone(),
            self.dispatcher.clone(),
        )
        .with_feedback(Arc::new(self.notifications.clone()));
        let session = self.camera.insert(session);

        match session.open().await {
            Ok(()) => {}
            Err(ScanError::SessionClosed) => debug!("Camera modal closed while opening"),
            Err(e) if e.is_terminal_for_session() => {
                debug!(error = %e, "Camera modal opened in error state")
            }
            Err(e) => return Err(e.into()),
        }

        Ok(session.state())
    }

    /// Handle that closes the open modal from another task.
    pub fn camera_closer(&self) -> Option<SessionCloser> {
        self.camera.as_ref().map(CameraSession::closer)
    }

    pub fn camera_state(&self) -> Option<CameraState> {
        self.camera.as_ref().map(CameraSession::state)
    }

    pub fn camera_devices(&self) -> &[VideoDevice] {
        self.camera.as_ref().map(CameraSession::devices).unwrap_or(&[])
    }

    /// Switches the open modal to another camera.
    pub async fn switch_camera(&mut self, device_id: &str) -> TerminalResult<CameraState> {
        let session = self
            .camera
            .as_mut()
            .ok_or(TerminalError::Scan(ScanError::SessionClosed))?;

        match session.switch_device(device_id).await {
            Ok(()) => {}
            Err(e) if e.is_terminal_for_session() => {
                debug!(error = %e, device_id = %device_id, "Camera switch failed")
            }
            Err(e) => return Err(e.into()),
        }
        Ok(session.state())
    }

    /// Closes the scanner modal, ending every camera track.
    ///
    /// Returns the session's final state, or `None` if no modal was open.
    pub async fn close_camera_modal(&mut self) -> Option<CameraState> {
        let mut session = self.camera.take()?;
        session.stop().await;
        Some(session.state())
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Unmounts the screen and returns the final cart totals.
    ///
    /// Outcomes already queued are applied to the cart before this returns.
    pub async fn teardown(mut self) -> CartTotals {
        if let Some(listener) = self.listener.take() {
            listener.detach().await;
        }
        self.close_camera_modal().await;

        if let Err(e) = self.dispatcher.shutdown().await {
            debug!(error = %e, "Dispatcher already stopped");
        }
        if let Some(consumer) = self.consumer.take() {
            if let Err(e) = consumer.await {
                warn!(error = %e, "Outcome consumer ended abnormally");
            }
        }

        let totals = self.cart.totals();
        info!(
            items = totals.item_count,
            quantity = totals.total_quantity,
            subtotal_cents = totals.subtotal_cents,
            "POS screen unmounted"
        );
        totals
    }
}

// =============================================================================
// Outcome Consumer
// =============================================================================

async fn consume_outcomes(
    mut outcomes: mpsc::Receiver<ScanOutcome>,
    cart: CartState,
    notifications: NotificationCenter,
) {
    while let Some(outcome) = outcomes.recv().await {
        apply_outcome(&cart, &notifications, &outcome);
    }
    debug!("Outcome stream closed");
}

/// Applies one outcome to the cart.
///
/// Not-found toasts are raised by the dispatcher's feedback, so only cart
/// refusals are added here.
pub fn apply_outcome(cart: &CartState, notifications: &NotificationCenter, outcome: &ScanOutcome) {
    match outcome {
        ScanOutcome::Found { product, code, source } => {
            match cart.with_cart_mut(|c| c.add_scanned(product, *source)) {
                Ok(quantity) => {
                    info!(product_id = %product.id, code = %code, source = %source, quantity, "Added to cart")
                }
                Err(e) => {
                    warn!(product_id = %product.id, code = %code, error = %e, "Cart refused scan");
                    notifications.push(NotificationLevel::Warning, e.to_string(), Some(code));
                }
            }
        }
        ScanOutcome::NotFound { code, source } => {
            debug!(code = %code, source = %source, "Scan left cart unchanged");
        }
    }
}
