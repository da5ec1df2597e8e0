//! # Tally Terminal Library
//!
//! The point-of-sale screen that hosts the barcode capture pipeline.
//!
//! ## Module Organization
//! ```text
//! tally_terminal/
//! ├── lib.rs          ◄─── You are here (logging, product file)
//! ├── screen.rs       ◄─── PosScreen: mount / camera modal / teardown
//! ├── headless.rs     ◄─── stdin replay driving the keyboard bus
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── cart.rs     ◄─── Cart fed by scan outcomes
//! │   └── notifications.rs ◄─── Toast queue (ScanFeedback)
//! └── error.rs        ◄─── TerminalError
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load `ScannerConfig` (TOML + environment)
//! 3. Load the product file (`TALLY_CATALOG_PATH` or the app data directory)
//! 4. Mount `PosScreen` on a `KeyboardBus`
//! 5. Feed key events; outcomes flow into the cart
//! 6. `teardown()` and report cart totals

pub mod error;
pub mod headless;
pub mod screen;
pub mod state;

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tally_core::ScannableProduct;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

pub use error::{CartError, ErrorCode, TerminalError, TerminalResult};
pub use screen::{apply_outcome, CameraRig, PosScreen};

/// Environment variable pointing at the JSON product file.
pub const CATALOG_PATH_ENV: &str = "TALLY_CATALOG_PATH";

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tally_scan=trace` - Trace the capture runtime only
/// - Default: INFO, with DEBUG for the tally crates
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .init();
}

/// Determines the product file path.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.tally.pos/catalog.json`
/// - **Windows**: `%APPDATA%\tally\pos\data\catalog.json`
/// - **Linux**: `~/.local/share/pos/catalog.json`
///
/// `TALLY_CATALOG_PATH` overrides; without a home directory the file is
/// looked up in the working directory.
pub fn catalog_path() -> PathBuf {
    if let Ok(path) = std::env::var(CATALOG_PATH_ENV) {
        return PathBuf::from(path);
    }

    ProjectDirs::from("com", "tally", "pos")
        .map(|dirs| dirs.data_dir().join("catalog.json"))
        .unwrap_or_else(|| PathBuf::from("catalog.json"))
}

/// Reads a JSON array of products.
pub fn load_products(path: &Path) -> TerminalResult<Vec<ScannableProduct>> {
    if !path.exists() {
        return Err(TerminalError::CatalogNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let products: Vec<ScannableProduct> = serde_json::from_str(&content)?;
    debug!(path = %path.display(), count = products.len(), "Product file loaded");
    Ok(products)
}
