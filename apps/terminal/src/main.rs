//! # Tally Terminal (headless)
//!
//! Replays scans from stdin through the full capture pipeline.
//!
//! ```text
//! $ TALLY_CATALOG_PATH=catalog.json tally-terminal < scans.txt
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load scanner config (writing defaults on first run) and the product file
//! 3. Replay each stdin line as a keyboard-wedge burst plus Enter
//! 4. Log cart totals and exit

use std::process::ExitCode;

use tally_scan::ScannerConfig;
use tally_terminal::state::CartTotals;
use tally_terminal::{catalog_path, headless, init_tracing, load_products, TerminalResult};
use tokio::io::BufReader;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(totals) => {
            info!(
                items = totals.item_count,
                quantity = totals.total_quantity,
                subtotal_cents = totals.subtotal_cents,
                "Cart totals"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(code = ?e.code(), error = %e, "Terminal failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> TerminalResult<CartTotals> {
    write_default_config();
    let config = ScannerConfig::load_or_default(None);

    let path = catalog_path();
    info!(path = %path.display(), "Loading product file");
    let products = load_products(&path)?;

    headless::replay(config, &products, BufReader::new(tokio::io::stdin())).await
}

/// Leaves an editable `scanner.toml` in the platform config dir on first run.
fn write_default_config() {
    let Some(path) = ScannerConfig::default_config_path() else {
        return;
    };
    if path.exists() {
        return;
    }
    if let Err(e) = ScannerConfig::default().save(Some(path)) {
        warn!(error = %e, "Could not write default scanner config");
    }
}
