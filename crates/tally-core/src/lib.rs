//! # tally-core: Pure Barcode Capture Logic
//!
//! This crate is the **heart** of the Tally scan pipeline. It contains the
//! decisions of the pipeline as pure functions and state machines with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Scan Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Browser Console (POS screen)                 │   │
//! │  │     Key events ──┐        Scanner modal ──┐     Cart view       │   │
//! │  └──────────────────┼────────────────────────┼─────────▲───────────┘   │
//! │                     │                        │         │ ScanOutcome   │
//! │  ┌──────────────────▼────────────────────────▼─────────┴───────────┐   │
//! │  │                 tally-scan (async runtime)                      │   │
//! │  │   KeyboardListener      CameraSession       ScanDispatcher      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  catalog  │  │   wedge   │  │  debounce │  │   │
//! │  │   │  Product  │  │  code →   │  │ key-timing│  │  window   │  │   │
//! │  │   │  Outcome  │  │  product  │  │  buffer   │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CLOCK READS • NO TASKS • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (ScannableProduct, ScanOutcome, Symbology, ...)
//! - [`catalog`] - Catalog Index: scan code → product
//! - [`wedge`] - Keystroke-wedge detector state machine
//! - [`debounce`] - Suppression window for rapid duplicate scans
//! - [`validation`] - Scan-code normalization and GTIN check digits
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Injected time**: every timing decision receives `now: Instant`
//! 2. **No I/O**: devices, tasks, timers and logging live in `tally-scan`
//! 3. **Rebuild, don't patch**: the catalog index is rebuilt on every change
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::catalog::CatalogIndex;
//! use tally_core::types::ScannableProduct;
//!
//! let widget = ScannableProduct::new("p-1", "Widget", 499)
//!     .with_barcode("0123456789012");
//!
//! let index = CatalogIndex::build(&[widget]);
//! assert_eq!(index.resolve("0123456789012").map(|p| p.name.as_str()), Some("Widget"));
//! assert!(index.resolve("9999999999999").is_none());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod debounce;
pub mod error;
pub mod types;
pub mod validation;
pub mod wedge;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::CatalogIndex;
pub use debounce::DebounceWindow;
pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;
pub use wedge::{KeyEvent, WedgeAction, WedgeConfig, WedgeDetector};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Longest scan code accepted from any source.
///
/// PDF417 and Data Matrix payloads can be long, but anything past this is a
/// stuck key or a pasted document, not a product code.
pub const MAX_SCAN_CODE_LEN: usize = 128;

/// Hard cap on the wedge buffer before it is discarded as runaway input.
pub const MAX_WEDGE_BUFFER_LEN: usize = 256;
