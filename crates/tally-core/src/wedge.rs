//! # Keystroke-Wedge Detector
//!
//! Reconstructs hardware scanner input from raw key events using inter-key
//! timing, telling scanner bursts apart from human typing.
//!
//! ## Why Timing?
//! A keyboard-wedge scanner is indistinguishable from a keyboard at the OS
//! level, except that it "types" a whole barcode in a few milliseconds.
//! Humans rarely sustain less than ~100ms between keys.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Wedge Detector Transitions                           │
//! │                                                                         │
//! │  event target is a text input ──────────────────────────► Ignored      │
//! │  Ctrl/Alt/Meta chord, navigation key ───────────────────► Ignored      │
//! │                                                                         │
//! │  printable char                                                         │
//! │     │                                                                   │
//! │     ├── gap > max_inter_key_gap && buffer non-empty                     │
//! │     │        └─► discard stale buffer, start new burst                  │
//! │     ├── append char, record timestamp                                   │
//! │     └── len >= min_fallback_length && burst at hardware speed           │
//! │              └─► ScheduleCompletion { at: now + fallback_delay }        │
//! │                                                                         │
//! │  Enter (or Tab when configured)                                         │
//! │     ├── empty buffer ──────────────────────────────────► Ignored       │
//! │     └── otherwise (however late) ──────────────────────► Completed     │
//! │                                                                         │
//! │  complete_pending(generation) after the fallback delay                  │
//! │     └── no key since scheduling ───────────────────────► Some(code)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation bumps a generation counter. A fallback check carries the
//! generation it was scheduled at, so a timer that fires after an Enter (or
//! after more keys) finds a newer generation and completes nothing. Terminator
//! and fallback can therefore never both complete the same burst.
//!
//! ## Known Limitation
//! Manual typing interleaved with a scan is not defended against; this is a
//! best-effort heuristic.

use std::time::{Duration, Instant};

use crate::MAX_WEDGE_BUFFER_LEN;

// =============================================================================
// Configuration
// =============================================================================

/// Timing thresholds for the detector.
///
/// These are empirically chosen defaults and may need recalibration for a
/// given scanner model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WedgeConfig {
    /// A gap longer than this between two keys starts a new burst.
    pub max_inter_key_gap: Duration,

    /// Largest gap inside a burst that still counts as hardware speed.
    pub hardware_key_gap: Duration,

    /// Minimum buffer length before the fallback completion is scheduled.
    pub min_fallback_length: usize,

    /// Idle time after the last key before a fallback completion fires.
    pub fallback_delay: Duration,

    /// Treat Tab as a terminator (scanners programmed with a Tab suffix).
    pub tab_terminates: bool,
}

impl Default for WedgeConfig {
    fn default() -> Self {
        WedgeConfig {
            max_inter_key_gap: Duration::from_millis(150),
            hardware_key_gap: Duration::from_millis(50),
            min_fallback_length: 8,
            fallback_delay: Duration::from_millis(120),
            tab_terminates: false,
        }
    }
}

// =============================================================================
// Key Events
// =============================================================================

/// A key as reported by the host's keydown event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// A printable character.
    Char(char),
    Enter,
    Tab,
    Escape,
    /// Any other named key (Shift, ArrowUp, F5, Backspace, ...).
    Named(String),
}

impl Key {
    /// Maps a DOM `KeyboardEvent.key` value.
    pub fn from_dom(key: &str) -> Key {
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Key::Char(c),
            _ => match key {
                "Enter" => Key::Enter,
                "Tab" => Key::Tab,
                "Escape" | "Esc" => Key::Escape,
                other => Key::Named(other.to_string()),
            },
        }
    }
}

/// What element had focus when the key was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyTarget {
    /// Page body or a non-editable element.
    #[default]
    Document,
    /// `<input>`, `<textarea>` or a contenteditable region.
    TextInput,
}

/// Modifier keys held during the event. Shift is not listed: scanners emit
/// shifted characters for upper-case payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// True when the event is a shortcut chord rather than text.
    pub fn is_chord(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

/// One raw key event with its capture time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub target: KeyTarget,
    pub modifiers: Modifiers,
    pub at: Instant,
}

impl KeyEvent {
    pub fn new(key: Key, at: Instant) -> Self {
        KeyEvent {
            key,
            target: KeyTarget::Document,
            modifiers: Modifiers::default(),
            at,
        }
    }

    pub fn char(c: char, at: Instant) -> Self {
        KeyEvent::new(Key::Char(c), at)
    }

    pub fn enter(at: Instant) -> Self {
        KeyEvent::new(Key::Enter, at)
    }

    pub fn in_text_input(mut self) -> Self {
        self.target = KeyTarget::TextInput;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

// =============================================================================
// Pending Scan Buffer
// =============================================================================

/// Single-owner accumulator for the burst in progress.
#[derive(Debug, Clone, Default)]
pub struct PendingScanBuffer {
    chars: String,
    len: usize,
    last_key_at: Option<Instant>,
    max_gap: Duration,
}

impl PendingScanBuffer {
    fn push(&mut self, c: char, at: Instant) {
        if let Some(last) = self.last_key_at {
            self.max_gap = self.max_gap.max(at.saturating_duration_since(last));
        }
        self.chars.push(c);
        self.len += 1;
        self.last_key_at = Some(at);
    }

    fn take(&mut self) -> String {
        let code = std::mem::take(&mut self.chars);
        self.clear();
        code
    }

    fn clear(&mut self) {
        self.chars.clear();
        self.len = 0;
        self.last_key_at = None;
        self.max_gap = Duration::ZERO;
    }

    fn is_stale(&self, at: Instant, max_gap: Duration) -> bool {
        self.last_key_at
            .map(|last| at.saturating_duration_since(last) > max_gap)
            .unwrap_or(false)
    }

    /// Number of characters buffered.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_str(&self) -> &str {
        &self.chars
    }

    /// Largest gap between two keys of the current burst.
    pub fn max_gap(&self) -> Duration {
        self.max_gap
    }
}

// =============================================================================
// Detector
// =============================================================================

/// What the caller should do after feeding an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WedgeAction {
    /// Not scanner input; nothing changed.
    Ignored,
    /// Character appended. `restarted` is true when a stale buffer was
    /// discarded first.
    Buffered { restarted: bool },
    /// Character appended and the burst qualifies for fallback completion:
    /// call [`WedgeDetector::complete_pending`] with `generation` at `at`.
    ScheduleCompletion { at: Instant, generation: u64 },
    /// A terminator completed the scan.
    Completed(String),
    /// The pending buffer was thrown away (Escape, timeout, overflow).
    Discarded,
}

/// Keystroke-wedge detector.
#[derive(Debug, Clone)]
pub struct WedgeDetector {
    config: WedgeConfig,
    buffer: PendingScanBuffer,
    generation: u64,
}

impl WedgeDetector {
    pub fn new(config: WedgeConfig) -> Self {
        WedgeDetector {
            config,
            buffer: PendingScanBuffer::default(),
            generation: 0,
        }
    }

    pub fn config(&self) -> &WedgeConfig {
        &self.config
    }

    pub fn pending(&self) -> &PendingScanBuffer {
        &self.buffer
    }

    /// Feeds one key event.
    pub fn on_key(&mut self, event: &KeyEvent) -> WedgeAction {
        if event.target == KeyTarget::TextInput || event.modifiers.is_chord() {
            return WedgeAction::Ignored;
        }

        match &event.key {
            Key::Char(c) if !c.is_control() => self.on_char(*c, event.at),
            Key::Enter => self.on_terminator(),
            Key::Tab if self.config.tab_terminates => self.on_terminator(),
            Key::Escape if !self.buffer.is_empty() => {
                self.discard();
                WedgeAction::Discarded
            }
            _ => WedgeAction::Ignored,
        }
    }

    fn on_char(&mut self, c: char, at: Instant) -> WedgeAction {
        self.generation += 1;

        let restarted = !self.buffer.is_empty()
            && self.buffer.is_stale(at, self.config.max_inter_key_gap);
        if restarted {
            self.buffer.clear();
        }

        if self.buffer.len() >= MAX_WEDGE_BUFFER_LEN {
            self.buffer.clear();
            return WedgeAction::Discarded;
        }

        self.buffer.push(c, at);

        if self.buffer.len() >= self.config.min_fallback_length
            && self.buffer.max_gap() <= self.config.hardware_key_gap
        {
            return WedgeAction::ScheduleCompletion {
                at: at + self.config.fallback_delay,
                generation: self.generation,
            };
        }

        WedgeAction::Buffered { restarted }
    }

    fn on_terminator(&mut self) -> WedgeAction {
        if self.buffer.is_empty() {
            return WedgeAction::Ignored;
        }

        // Not gap-checked: a slow terminator suffix still ends the burst.
        self.generation += 1;
        WedgeAction::Completed(self.buffer.take())
    }

    /// Completes the buffer if nothing happened since `generation` was
    /// handed out by [`WedgeAction::ScheduleCompletion`].
    pub fn complete_pending(&mut self, generation: u64) -> Option<String> {
        if generation != self.generation || self.buffer.is_empty() {
            return None;
        }

        self.generation += 1;
        Some(self.buffer.take())
    }

    /// Drops any pending input (screen teardown, Escape).
    pub fn discard(&mut self) {
        self.generation += 1;
        self.buffer.clear();
    }
}

impl Default for WedgeDetector {
    fn default() -> Self {
        WedgeDetector::new(WedgeConfig::default())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
