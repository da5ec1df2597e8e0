//! # Scan Error Types
//!
//! Error types for the capture runtime.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Scan Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Camera         │  │   Decode        │  │     Lookup              │ │
//! │  │  (terminal for  │  │  (recoverable)  │  │  (always surfaced)      │ │
//! │  │   the session)  │  │                 │  │                         │ │
//! │  │  PermissionDen. │  │  DecodeTransie- │  │  CodeNotFound           │ │
//! │  │  NoDeviceFound  │  │  ntMiss         │  │                         │ │
//! │  │  StreamInitFail │  │                 │  │                         │ │
//! │  │  StreamFailed   │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Lifecycle      │  │  Configuration  │  │     Internal            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidTrans.  │  │  InvalidConfig  │  │  ChannelError           │ │
//! │  │  DeviceNotFound │  │  ConfigLoad/Save│  │  ShuttingDown           │ │
//! │  │  SessionClosed  │  │                 │  │  Core                   │ │
//! │  │  ListenerAlrea. │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A duplicate scan inside the debounce window is not an error; the
//! dispatcher reports it as [`crate::dispatcher::Dispatch::Suppressed`].

use tally_core::{CoreError, ScanSource};
use thiserror::Error;

/// Result type alias for capture operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Capture runtime error covering every failure the pipeline can report.
#[derive(Debug, Error)]
pub enum ScanError {
    // =========================================================================
    // Camera Errors
    // =========================================================================
    /// The user (or browser policy) refused camera access.
    #[error("Camera permission denied")]
    PermissionDenied,

    /// No video input device is available.
    #[error("No camera found")]
    NoDeviceFound,

    /// The selected device could not start streaming.
    #[error("Failed to start camera stream: {0}")]
    StreamInitFailed(String),

    /// A running stream failed (device unplugged, track ended by the OS).
    #[error("Camera stream failed: {0}")]
    StreamFailed(String),

    /// A device switch named a device that was not enumerated.
    #[error("Camera device not found: {0}")]
    DeviceNotFound(String),

    // =========================================================================
    // Decode Errors
    // =========================================================================
    /// The frame held no readable barcode. Recoverable; the loop continues.
    #[error("No barcode detected in frame")]
    DecodeTransientMiss,

    // =========================================================================
    // Lookup Errors
    // =========================================================================
    /// A valid scan with no catalog match.
    #[error("No product matches code {code} ({scan_source})")]
    CodeNotFound { code: String, scan_source: ScanSource },

    // =========================================================================
    // Lifecycle Errors
    // =========================================================================
    /// Operation not allowed in the session's current state.
    #[error("Cannot {action} while camera session is {state}")]
    InvalidTransition { action: String, state: String },

    /// The session was closed while the operation was in flight.
    #[error("Camera session closed")]
    SessionClosed,

    /// A keyboard listener is already attached to the bus.
    #[error("A keyboard scan listener is already attached")]
    ListenerAlreadyAttached,

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid scanner configuration.
    #[error("Invalid scanner configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// The dispatcher is shutting down.
    #[error("Scan dispatcher is shutting down")]
    ShuttingDown,

    /// Domain error from tally-core.
    #[error(transparent)]
    Core(#[from] CoreError),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        ScanError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ScanError {
    fn from(err: toml::de::Error) -> Self {
        ScanError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ScanError {
    fn from(err: toml::ser::Error) -> Self {
        ScanError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ScanError {
    /// Returns true if the decode loop should ignore this error and keep
    /// reading frames.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ScanError::DecodeTransientMiss)
    }

    /// Returns true if this error ends a camera session.
    ///
    /// ## Terminal Errors
    /// - Permission denied (no re-prompt within the session)
    /// - No device
    /// - Stream could not start, or died while running
    pub fn is_terminal_for_session(&self) -> bool {
        matches!(
            self,
            ScanError::PermissionDenied
                | ScanError::NoDeviceFound
                | ScanError::StreamInitFailed(_)
                | ScanError::StreamFailed(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ScanError::InvalidConfig(_)
                | ScanError::ConfigLoadFailed(_)
                | ScanError::ConfigSaveFailed(_)
                | ScanError::Core(CoreError::UnknownSymbology(_))
        )
    }

    /// The text shown to the cashier.
    ///
    /// Not-found messages differ per source so the cashier knows whether to
    /// re-aim the camera or check the printed label.
    pub fn user_message(&self) -> String {
        match self {
            ScanError::PermissionDenied => {
                "Camera access was blocked. Allow camera access in the browser and reload the page."
                    .to_string()
            }
            ScanError::NoDeviceFound => {
                "No camera was found. Connect a camera or use the handheld scanner.".to_string()
            }
            ScanError::StreamInitFailed(_) | ScanError::StreamFailed(_) => {
                "The camera stopped working. Pick another camera from the list or reload the page."
                    .to_string()
            }
            ScanError::DeviceNotFound(_) => {
                "That camera is no longer available. Pick another camera from the list.".to_string()
            }
            ScanError::CodeNotFound { code, scan_source } => match scan_source {
                ScanSource::Keyboard => format!(
                    "Scanned barcode {} is not in the product list. Check the label before scanning again.",
                    code
                ),
                ScanSource::Camera => format!(
                    "The camera read {} but no product matches. Hold the barcode steady and try again, or enter it by hand.",
                    code
                ),
                ScanSource::Manual => format!("No product has the code {}.", code),
            },
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(ScanError::DecodeTransientMiss.is_recoverable());
        assert!(!ScanError::StreamFailed("ended".into()).is_recoverable());
        assert!(!ScanError::PermissionDenied.is_recoverable());
    }

    #[test]
    fn test_terminal_errors() {
        assert!(ScanError::PermissionDenied.is_terminal_for_session());
        assert!(ScanError::NoDeviceFound.is_terminal_for_session());
        assert!(ScanError::StreamInitFailed("busy".into()).is_terminal_for_session());

        assert!(!ScanError::DecodeTransientMiss.is_terminal_for_session());
        assert!(!ScanError::DeviceNotFound("cam-9".into()).is_terminal_for_session());
    }

    #[test]
    fn test_config_errors() {
        assert!(ScanError::InvalidConfig("bad".into()).is_config_error());
        assert!(ScanError::from(CoreError::UnknownSymbology("x".into())).is_config_error());
        assert!(!ScanError::SessionClosed.is_config_error());
    }

    #[test]
    fn test_not_found_message_differs_per_source() {
        let keyboard = ScanError::CodeNotFound {
            code: "9999999999999".into(),
            scan_source: ScanSource::Keyboard,
        };
        let camera = ScanError::CodeNotFound {
            code: "9999999999999".into(),
            scan_source: ScanSource::Camera,
        };

        assert!(keyboard.user_message().contains("9999999999999"));
        assert!(camera.user_message().contains("9999999999999"));
        assert_ne!(keyboard.user_message(), camera.user_message());
    }

    #[test]
    fn test_not_found_is_a_leaf_error() {
        use std::error::Error;

        let err = ScanError::CodeNotFound {
            code: "4006381333931".into(),
            scan_source: ScanSource::Manual,
        };
        assert!(err.source().is_none());
        assert_eq!(err.to_string(), "No product matches code 4006381333931 (manual)");
    }

    #[test]
    fn test_error_display() {
        let err = ScanError::InvalidTransition {
            action: "switch device".into(),
            state: "idle".into(),
        };
        assert_eq!(err.to_string(), "Cannot switch device while camera session is idle");
    }
}
