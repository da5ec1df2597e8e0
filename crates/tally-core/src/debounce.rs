//! # Debounce Window
//!
//! Collapses identical rapid-fire scans into one.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  t=0ms    "0123456789012" (keyboard, Enter)      ──► admitted          │
//! │  t=4ms    "0123456789012" (keyboard, 2nd Enter)  ──► suppressed        │
//! │  t=50ms   "0123456789012" (camera, same item)    ──► suppressed        │
//! │  t=310ms  "0123456789012" (second can scanned)   ──► admitted          │
//! │                         └─ window (300ms) measured from last admission │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The window runs from the last *admitted* scan of a code, not from the last
//! suppressed one: a code held in front of the camera is re-admitted once per
//! window instead of being suppressed forever.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default suppression window.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(300);

/// Tracks recently admitted codes.
#[derive(Debug, Clone)]
pub struct DebounceWindow {
    window: Duration,
    admitted: HashMap<String, Instant>,
}

impl DebounceWindow {
    pub fn new(window: Duration) -> Self {
        DebounceWindow {
            window,
            admitted: HashMap::new(),
        }
    }

    /// Returns true if `key` should be emitted at `now`, recording the
    /// admission. Returns false when the same key was admitted within the
    /// window.
    pub fn admit(&mut self, key: &str, now: Instant) -> bool {
        self.prune(now);

        if let Some(last) = self.admitted.get(key) {
            if now.saturating_duration_since(*last) < self.window {
                return false;
            }
        }

        self.admitted.insert(key.to_string(), now);
        true
    }

    /// Drops entries whose window has fully elapsed.
    fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.admitted
            .retain(|_, last| now.saturating_duration_since(*last) < window);
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of codes currently inside their window.
    pub fn tracked(&self) -> usize {
        self.admitted.len()
    }

    pub fn clear(&mut self) {
        self.admitted.clear();
    }
}

impl Default for DebounceWindow {
    fn default() -> Self {
        DebounceWindow::new(DEFAULT_DEBOUNCE_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_same_code_within_window_collapses() {
        let mut window = DebounceWindow::new(ms(300));
        let t0 = Instant::now();

        assert!(window.admit("0123456789012", t0));
        assert!(!window.admit("0123456789012", t0 + ms(50)));
        assert!(!window.admit("0123456789012", t0 + ms(299)));
    }

    #[test]
    fn test_same_code_after_window_is_admitted() {
        let mut window = DebounceWindow::new(ms(300));
        let t0 = Instant::now();

        assert!(window.admit("12345678", t0));
        assert!(window.admit("12345678", t0 + ms(300)));
    }

    #[test]
    fn test_window_measured_from_last_admission() {
        let mut window = DebounceWindow::new(ms(300));
        let t0 = Instant::now();

        assert!(window.admit("12345678", t0));
        assert!(!window.admit("12345678", t0 + ms(200)));
        // Suppressed scans do not extend the window
        assert!(window.admit("12345678", t0 + ms(310)));
    }

    #[test]
    fn test_different_codes_are_independent() {
        let mut window = DebounceWindow::new(ms(300));
        let t0 = Instant::now();

        assert!(window.admit("12345678", t0));
        assert!(window.admit("87654321", t0 + ms(1)));
    }

    #[test]
    fn test_expired_entries_are_pruned() {
        let mut window = DebounceWindow::new(ms(100));
        let t0 = Instant::now();

        window.admit("a", t0);
        window.admit("b", t0);
        assert_eq!(window.tracked(), 2);

        window.admit("c", t0 + ms(150));
        assert_eq!(window.tracked(), 1);
    }
}
