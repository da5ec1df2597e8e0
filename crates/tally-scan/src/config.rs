//! # Scanner Configuration
//!
//! Timing thresholds, camera preferences and dispatch settings.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_WEDGE_MAX_GAP_MS=180                                         │
//! │     TALLY_CAMERA_FORMATS=ean_13,qr_code                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/pos/scanner.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.tally.pos/scanner.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     150ms stale gap, 8-char fallback, 300ms debounce, all formats      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # scanner.toml
//! [wedge]
//! max_inter_key_gap_ms = 150
//! hardware_key_gap_ms = 50
//! min_fallback_length = 8
//! fallback_delay_ms = 120
//! tab_terminates = false
//!
//! [camera]
//! preferred_device_id = "usb-0c45:6366"
//! close_on_detect = true
//! formats = ["ean_13", "ean_8", "upc_a", "code_128", "qr_code"]
//! decode_interval_ms = 100
//! repeat_cooldown_ms = 1500
//!
//! [dispatch]
//! debounce_ms = 300
//! ```
//!
//! The scanner timings are empirically chosen. Recalibrate `wedge` for
//! scanner models that emit slower than ~50ms per character.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tally_core::{Symbology, WedgeConfig};
use tracing::{debug, info, warn};

use crate::error::{ScanError, ScanResult};

// =============================================================================
// Wedge Settings
// =============================================================================

/// Keystroke-wedge timing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WedgeSettings {
    /// A gap longer than this (ms) between keys discards the buffer.
    #[serde(default = "default_max_gap")]
    pub max_inter_key_gap_ms: u64,

    /// Largest gap (ms) inside a burst that still counts as hardware speed.
    #[serde(default = "default_hardware_gap")]
    pub hardware_key_gap_ms: u64,

    /// Buffer length at which the terminator-less fallback is armed.
    #[serde(default = "default_min_length")]
    pub min_fallback_length: usize,

    /// Idle time (ms) before the fallback completes a burst.
    #[serde(default = "default_fallback_delay")]
    pub fallback_delay_ms: u64,

    /// Treat Tab as a terminator.
    #[serde(default)]
    pub tab_terminates: bool,
}

fn default_max_gap() -> u64 {
    150
}

fn default_hardware_gap() -> u64 {
    50
}

fn default_min_length() -> usize {
    8
}

fn default_fallback_delay() -> u64 {
    120
}

impl Default for WedgeSettings {
    fn default() -> Self {
        WedgeSettings {
            max_inter_key_gap_ms: default_max_gap(),
            hardware_key_gap_ms: default_hardware_gap(),
            min_fallback_length: default_min_length(),
            fallback_delay_ms: default_fallback_delay(),
            tab_terminates: false,
        }
    }
}

impl WedgeSettings {
    /// Converts to the detector's configuration.
    pub fn to_wedge_config(&self) -> WedgeConfig {
        WedgeConfig {
            max_inter_key_gap: Duration::from_millis(self.max_inter_key_gap_ms),
            hardware_key_gap: Duration::from_millis(self.hardware_key_gap_ms),
            min_fallback_length: self.min_fallback_length,
            fallback_delay: Duration::from_millis(self.fallback_delay_ms),
            tab_terminates: self.tab_terminates,
        }
    }
}

// =============================================================================
// Camera Settings
// =============================================================================

/// Camera decoder session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Device remembered from a previous session; wins over the facing
    /// heuristic when it is still enumerated.
    #[serde(default)]
    pub preferred_device_id: Option<String>,

    /// End the session after the first forwarded code.
    #[serde(default = "default_true")]
    pub close_on_detect: bool,

    /// Symbologies the decoder looks for.
    #[serde(default = "default_formats")]
    pub formats: Vec<Symbology>,

    /// Minimum time (ms) between two decode attempts.
    #[serde(default = "default_decode_interval")]
    pub decode_interval_ms: u64,

    /// In continuous mode, the same code is not forwarded again within
    /// this window (ms).
    #[serde(default = "default_repeat_cooldown")]
    pub repeat_cooldown_ms: u64,

    /// Ideal capture width passed to the backend.
    #[serde(default = "default_ideal_width")]
    pub ideal_width: u32,

    /// Ideal capture height passed to the backend.
    #[serde(default = "default_ideal_height")]
    pub ideal_height: u32,

    /// Ideal frame rate passed to the backend.
    #[serde(default = "default_ideal_frame_rate")]
    pub ideal_frame_rate: u32,
}

fn default_true() -> bool {
    true
}

fn default_formats() -> Vec<Symbology> {
    Symbology::ALL.to_vec()
}

fn default_decode_interval() -> u64 {
    100
}

fn default_repeat_cooldown() -> u64 {
    1500
}

fn default_ideal_width() -> u32 {
    1280
}

fn default_ideal_height() -> u32 {
    720
}

fn default_ideal_frame_rate() -> u32 {
    30
}

impl Default for CameraSettings {
    fn default() -> Self {
        CameraSettings {
            preferred_device_id: None,
            close_on_detect: default_true(),
            formats: default_formats(),
            decode_interval_ms: default_decode_interval(),
            repeat_cooldown_ms: default_repeat_cooldown(),
            ideal_width: default_ideal_width(),
            ideal_height: default_ideal_height(),
            ideal_frame_rate: default_ideal_frame_rate(),
        }
    }
}

impl CameraSettings {
    pub fn decode_interval(&self) -> Duration {
        Duration::from_millis(self.decode_interval_ms)
    }

    pub fn repeat_cooldown(&self) -> Duration {
        Duration::from_millis(self.repeat_cooldown_ms)
    }
}

// =============================================================================
// Dispatch Settings
// =============================================================================

/// Scan dispatcher settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// Identical codes within this window (ms) collapse to one outcome.
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    /// Capacity of the command and outcome channels.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_debounce() -> u64 {
    300
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for DispatchSettings {
    fn default() -> Self {
        DispatchSettings {
            debounce_ms: default_debounce(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl DispatchSettings {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

// =============================================================================
// Main Scanner Configuration
// =============================================================================

/// Complete scanner configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Keystroke-wedge detector timings.
    #[serde(default)]
    pub wedge: WedgeSettings,

    /// Camera decoder settings.
    #[serde(default)]
    pub camera: CameraSettings,

    /// Dispatcher settings.
    #[serde(default)]
    pub dispatch: DispatchSettings,
}

impl ScannerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (scanner.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ScanResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading scanner config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());

        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load scanner config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ScanResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ScanError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ScanError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ScanError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Scanner config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ScanResult<()> {
        if self.wedge.max_inter_key_gap_ms == 0 {
            return Err(ScanError::InvalidConfig(
                "wedge.max_inter_key_gap_ms must be greater than 0".into(),
            ));
        }

        if self.wedge.min_fallback_length == 0 {
            return Err(ScanError::InvalidConfig(
                "wedge.min_fallback_length must be greater than 0".into(),
            ));
        }

        if self.wedge.hardware_key_gap_ms > self.wedge.max_inter_key_gap_ms {
            return Err(ScanError::InvalidConfig(format!(
                "wedge.hardware_key_gap_ms ({}) cannot exceed wedge.max_inter_key_gap_ms ({})",
                self.wedge.hardware_key_gap_ms, self.wedge.max_inter_key_gap_ms
            )));
        }

        if self.camera.formats.is_empty() {
            return Err(ScanError::InvalidConfig(
                "camera.formats must list at least one symbology".into(),
            ));
        }

        if self.dispatch.debounce_ms == 0 {
            return Err(ScanError::InvalidConfig(
                "dispatch.debounce_ms must be greater than 0".into(),
            ));
        }

        if self.dispatch.channel_capacity == 0 {
            return Err(ScanError::InvalidConfig(
                "dispatch.channel_capacity must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides read through `lookup`.
    fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(gap) = lookup("TALLY_WEDGE_MAX_GAP_MS") {
            match gap.parse::<u64>() {
                Ok(ms) => {
                    debug!(max_gap_ms = ms, "Overriding inter-key gap from environment");
                    self.wedge.max_inter_key_gap_ms = ms;
                }
                Err(_) => warn!(value = %gap, "Ignoring invalid TALLY_WEDGE_MAX_GAP_MS"),
            }
        }

        if let Some(len) = lookup("TALLY_WEDGE_MIN_LENGTH") {
            match len.parse::<usize>() {
                Ok(n) => self.wedge.min_fallback_length = n,
                Err(_) => warn!(value = %len, "Ignoring invalid TALLY_WEDGE_MIN_LENGTH"),
            }
        }

        if let Some(delay) = lookup("TALLY_WEDGE_FALLBACK_DELAY_MS") {
            match delay.parse::<u64>() {
                Ok(ms) => self.wedge.fallback_delay_ms = ms,
                Err(_) => warn!(value = %delay, "Ignoring invalid TALLY_WEDGE_FALLBACK_DELAY_MS"),
            }
        }

        if let Some(id) = lookup("TALLY_CAMERA_DEVICE_ID") {
            debug!(device_id = %id, "Overriding preferred camera from environment");
            self.camera.preferred_device_id = if id.trim().is_empty() {
                None
            } else {
                Some(id)
            };
        }

        if let Some(flag) = lookup("TALLY_CAMERA_CLOSE_ON_DETECT") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.camera.close_on_detect = true,
                "0" | "false" | "no" | "off" => self.camera.close_on_detect = false,
                _ => warn!(value = %flag, "Unknown TALLY_CAMERA_CLOSE_ON_DETECT value"),
            }
        }

        if let Some(list) = lookup("TALLY_CAMERA_FORMATS") {
            let parsed: Result<Vec<Symbology>, _> = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::parse::<Symbology>)
                .collect();

            match parsed {
                Ok(formats) => {
                    debug!(count = formats.len(), "Overriding camera formats from environment");
                    self.camera.formats = formats;
                }
                Err(e) => warn!(error = %e, "Ignoring TALLY_CAMERA_FORMATS"),
            }
        }

        if let Some(debounce) = lookup("TALLY_DISPATCH_DEBOUNCE_MS") {
            match debounce.parse::<u64>() {
                Ok(ms) => self.dispatch.debounce_ms = ms,
                Err(_) => warn!(value = %debounce, "Ignoring invalid TALLY_DISPATCH_DEBOUNCE_MS"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "pos")
            .map(|dirs| dirs.config_dir().join("scanner.toml"))
    }
}
