//! # Terminal Error Type
//!
//! Unified error type for the POS screen and the headless binary.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Terminal                           │
//! │                                                                         │
//! │  PosScreen / headless replay                                            │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Capture error? ──── ScanError::SessionClosed ─────┐                   │
//! │         │                                          │                   │
//! │         ▼                                          ▼                   │
//! │  Cart rule?    ──── CartError::InsufficientStock ─ TerminalError ──►   │
//! │         │                                          ▲                   │
//! │         ▼                                          │                   │
//! │  Product file? ──── io / serde_json ───────────────┘                   │
//! │                                                                         │
//! │  TerminalError::code() → machine-readable code for the console         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use serde::Serialize;
use tally_scan::ScanError;
use thiserror::Error;

/// Cart rule violations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Only {available} units of {name} in stock")]
    InsufficientStock { name: String, available: i64 },

    #[error("Maximum quantity per item is {max}")]
    QuantityLimit { max: i64 },

    #[error("Cart cannot have more than {max} different items")]
    CartFull { max: usize },
}

/// Errors surfaced by the terminal app.
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("Product file not found: {0}")]
    CatalogNotFound(PathBuf),

    #[error("Product file is not valid JSON: {0}")]
    CatalogFormat(#[from] serde_json::Error),

    #[error("No camera backend is configured for this terminal")]
    CameraUnavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Machine-readable error codes for the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    CameraError,
    CartError,
    InsufficientStock,
    ConfigError,
    Internal,
}

impl TerminalError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TerminalError::Scan(ScanError::CodeNotFound { .. }) => ErrorCode::NotFound,
            TerminalError::Scan(e) if e.is_config_error() => ErrorCode::ConfigError,
            TerminalError::Scan(ScanError::Core(_)) => ErrorCode::ValidationError,
            TerminalError::Scan(e) if e.is_terminal_for_session() || e.is_recoverable() => {
                ErrorCode::CameraError
            }
            TerminalError::Scan(_) => ErrorCode::Internal,
            TerminalError::Cart(CartError::InsufficientStock { .. }) => ErrorCode::InsufficientStock,
            TerminalError::Cart(_) => ErrorCode::CartError,
            TerminalError::CatalogNotFound(_) => ErrorCode::NotFound,
            TerminalError::CatalogFormat(_) => ErrorCode::ValidationError,
            TerminalError::CameraUnavailable => ErrorCode::CameraError,
            TerminalError::Io(_) => ErrorCode::Internal,
        }
    }

    /// Text shown to the cashier.
    pub fn user_message(&self) -> String {
        match self {
            TerminalError::Scan(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for the terminal app.
pub type TerminalResult<T> = Result<T, TerminalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_errors_map_to_their_own_code() {
        let err: TerminalError = CartError::InsufficientStock {
            name: "Widget".into(),
            available: 2,
        }
        .into();
        assert_eq!(err.code(), ErrorCode::InsufficientStock);
        assert_eq!(err.user_message(), "Only 2 units of Widget in stock");
    }

    #[test]
    fn test_camera_errors_map_to_camera_code() {
        let err: TerminalError = ScanError::PermissionDenied.into();
        assert_eq!(err.code(), ErrorCode::CameraError);
        assert_eq!(TerminalError::CameraUnavailable.code(), ErrorCode::CameraError);
    }

    #[test]
    fn test_code_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::InsufficientStock).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");
    }
}
