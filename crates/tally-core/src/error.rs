//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Domain errors (unknown symbology, ...)         │
//! │  └── ValidationError  - Scan-code input failures                       │
//! │                                                                         │
//! │  tally-scan errors (separate crate)                                    │
//! │  └── ScanError        - Camera, listener, dispatch, config failures    │
//! │                                                                         │
//! │  terminal errors (in app)                                              │
//! │  └── TerminalError    - What the hosting screen reports                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ScanError → TerminalError         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (code, field, ...)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A symbology name did not match any supported format.
    ///
    /// ## When This Occurs
    /// - `formats = ["ean13x"]` in scanner.toml
    /// - `TALLY_CAMERA_FORMATS` contains a typo
    #[error("Unknown barcode format: {0}")]
    UnknownSymbology(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g. a check digit mismatch).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::UnknownSymbology("ean13x".to_string());
        assert_eq!(err.to_string(), "Unknown barcode format: ean13x");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "scan code".to_string(),
        };
        assert_eq!(err.to_string(), "scan code is required");

        let err = ValidationError::TooLong {
            field: "scan code".to_string(),
            max: 128,
        };
        assert_eq!(err.to_string(), "scan code must be at most 128 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "scan code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
