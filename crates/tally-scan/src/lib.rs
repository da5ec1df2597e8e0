//! # tally-scan: Capture Runtime for Tally POS
//!
//! This crate runs the barcode capture pipeline: it turns hardware scanner
//! keystrokes and camera frames into exactly one catalog outcome per
//! physical scan.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Capture Pipeline                                 │
//! │                                                                         │
//! │  ┌────────────────────┐          ┌────────────────────────────────┐    │
//! │  │ KeyboardListener   │          │ CameraSession                  │    │
//! │  │                    │          │                                │    │
//! │  │ KeyboardBus events │          │ permission → devices → stream  │    │
//! │  │ WedgeDetector      │          │ decode loop (cancellable)      │    │
//! │  │ fallback timer     │          │ device switching               │    │
//! │  └─────────┬──────────┘          └───────────────┬────────────────┘    │
//! │            │        ScannedCode                  │                      │
//! │            └──────────────────┬──────────────────┘                      │
//! │                               ▼                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                  ScanDispatcher (actor task)                     │  │
//! │  │  normalize → debounce → CatalogIndex (from CatalogFeed) → outcome │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │                               ▼                                         │
//! │                 ScanOutcome receiver + ScanFeedback                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`camera`] - Camera decoder session, platform seams, rxing frame decoder
//! - [`catalog`] - `CatalogFeed` publishing rebuilt indexes
//! - [`config`] - Scanner configuration (TOML + environment)
//! - [`dispatcher`] - `ScanDispatcher` actor and handle
//! - [`error`] - Capture error types
//! - [`feedback`] - User notification trait
//! - [`listener`] - Keyboard bus and owned listener handle
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_scan::{CatalogFeed, KeyboardBus, KeyboardListener, ScanDispatcher, ScannerConfig};
//!
//! let config = ScannerConfig::load_or_default(None);
//! let feed = CatalogFeed::with_products(&products);
//!
//! let (dispatcher, mut outcomes) =
//!     ScanDispatcher::new(feed.subscribe(), &config.dispatch).start();
//!
//! let bus = KeyboardBus::new();
//! let listener = KeyboardListener::attach(&bus, config.wedge.to_wedge_config(), dispatcher)?;
//!
//! while let Some(outcome) = outcomes.recv().await {
//!     println!("{:?}", outcome);
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod camera;
pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod feedback;
pub mod listener;

// =============================================================================
// Re-exports
// =============================================================================

pub use camera::{
    CameraFault, CameraSession, CameraState, MultiFormatDecoder, SessionCloser, VideoDevice,
};
pub use catalog::CatalogFeed;
pub use config::{CameraSettings, DispatchSettings, ScannerConfig, WedgeSettings};
pub use dispatcher::{Dispatch, DispatcherHandle, ScanDispatcher};
pub use error::{ScanError, ScanResult};
pub use feedback::{NoOpFeedback, ScanFeedback, TracingFeedback};
pub use listener::{KeyboardBus, KeyboardListener};
