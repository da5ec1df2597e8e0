//! # Headless Replay
//!
//! Drives a mounted [`PosScreen`] from text input, one scan per line.
//!
//! Each non-empty line is typed onto the keyboard bus at hardware speed and
//! terminated with Enter, exactly as a wedge scanner would. Lines starting
//! with `#` are comments.

use std::time::Duration;

use tally_core::wedge::{Key, KeyTarget, Modifiers};
use tally_core::ScannableProduct;
use tally_scan::{KeyboardBus, ScannerConfig};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use crate::error::TerminalResult;
use crate::screen::PosScreen;
use crate::state::CartTotals;

/// Gap between replayed keystrokes, well inside any hardware threshold.
const REPLAY_KEY_GAP: Duration = Duration::from_millis(5);

/// Extra settle time after each line.
const REPLAY_SETTLE_MARGIN: Duration = Duration::from_millis(50);

/// Replays `input` against a freshly mounted screen and returns the final
/// cart totals.
///
/// Lines are spaced past both the stale-key gap and the debounce window, so
/// a repeated line counts as a second scan.
pub async fn replay<R>(
    config: ScannerConfig,
    products: &[ScannableProduct],
    input: R,
) -> TerminalResult<CartTotals>
where
    R: AsyncBufRead + Unpin,
{
    let bus = KeyboardBus::new();
    let settle = Duration::from_millis(config.wedge.max_inter_key_gap_ms.max(config.dispatch.debounce_ms))
        + REPLAY_SETTLE_MARGIN;

    let screen = PosScreen::mount(config, products, &bus)?;

    let mut lines = input.lines();
    let mut replayed = 0usize;

    while let Some(line) = lines.next_line().await? {
        let code = line.trim();
        if code.is_empty() || code.starts_with('#') {
            continue;
        }

        debug!(code = %code, "Replaying scan");
        for c in code.chars() {
            bus.publish(Key::Char(c), KeyTarget::Document, Modifiers::default());
            tokio::time::sleep(REPLAY_KEY_GAP).await;
        }
        bus.publish(Key::Enter, KeyTarget::Document, Modifiers::default());
        tokio::time::sleep(settle).await;

        replayed += 1;
    }

    info!(scans = replayed, "Input exhausted");
    Ok(screen.teardown().await)
}
