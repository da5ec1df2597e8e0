//! # Validation Module
//!
//! Scan-code normalization and check-digit validation.
//!
//! ## Where Codes Are Checked
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Source recognizer                                            │
//! │  ├── Wedge: only printable keys reach the buffer                       │
//! │  └── Camera: GTIN check digit on EAN/UPC/ITF-14 reads                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Scan Dispatcher                                              │
//! │  └── THIS MODULE: normalize_scan_code() before lookup + debounce       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Catalog Index                                                │
//! │  └── Exact match on trimmed codes                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{gtin_checksum_valid, normalize_scan_code};
//!
//! assert_eq!(normalize_scan_code("  4006381333931\r").unwrap(), "4006381333931");
//! assert!(gtin_checksum_valid("4006381333931"));
//! ```

use crate::error::ValidationError;
use crate::MAX_SCAN_CODE_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Normalization
// =============================================================================

/// Normalizes a raw code from any source.
///
/// ## Rules
/// - ASCII control characters are removed (CR/LF suffixes, GS1 group
///   separators some scanners inject into the keystream)
/// - Surrounding whitespace is trimmed
/// - Must not be empty afterwards
/// - Must be at most [`MAX_SCAN_CODE_LEN`] characters
pub fn normalize_scan_code(raw: &str) -> ValidationResult<String> {
    let cleaned: String = raw.chars().filter(|c| !c.is_ascii_control()).collect();
    let code = cleaned.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "scan code".to_string(),
        });
    }

    if code.chars().count() > MAX_SCAN_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "scan code".to_string(),
            max: MAX_SCAN_CODE_LEN,
        });
    }

    Ok(code.to_string())
}

// =============================================================================
// Retail Barcodes
// =============================================================================

/// Checks if a code looks like a retail barcode (8-14 numeric digits).
///
/// ## Formats Covered
/// - EAN-8: 8 digits
/// - UPC-A: 12 digits
/// - EAN-13: 13 digits
/// - ITF-14 / GTIN-14: 14 digits
pub fn looks_like_retail_barcode(code: &str) -> bool {
    let len = code.len();
    (8..=14).contains(&len) && code.chars().all(|c| c.is_ascii_digit())
}

/// Validates the GTIN mod-10 check digit (GTIN-8/12/13/14).
///
/// Weights alternate 3,1,3,... from the digit left of the check digit.
/// Non-numeric input or an unsupported length is invalid.
///
/// ```rust
/// use tally_core::validation::gtin_checksum_valid;
///
/// assert!(gtin_checksum_valid("96385074"));      // EAN-8
/// assert!(gtin_checksum_valid("036000291452"));  // UPC-A
/// assert!(!gtin_checksum_valid("036000291453"));
/// ```
pub fn gtin_checksum_valid(code: &str) -> bool {
    if !matches!(code.len(), 8 | 12 | 13 | 14) {
        return false;
    }

    let digits: Option<Vec<u32>> = code.chars().map(|c| c.to_digit(10)).collect();
    let Some(digits) = digits else {
        return false;
    };

    let (body, check) = digits.split_at(digits.len() - 1);
    let sum: u32 = body
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d * 3 } else { *d })
        .sum();

    (10 - sum % 10) % 10 == check[0]
}

/// Validates a code against the check digit rule of the symbology that
/// produced it. Formats without a GTIN check digit always pass.
pub fn validate_symbology_payload(
    symbology: crate::types::Symbology,
    code: &str,
) -> ValidationResult<()> {
    if !symbology.carries_gtin_check_digit(code) {
        return Ok(());
    }

    if !looks_like_retail_barcode(code) {
        return Err(ValidationError::InvalidFormat {
            field: "scan code".to_string(),
            reason: format!("{} payload must be 8-14 digits", symbology),
        });
    }

    if !gtin_checksum_valid(code) {
        return Err(ValidationError::InvalidFormat {
            field: "scan code".to_string(),
            reason: format!("{} check digit mismatch", symbology),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Symbology;

    #[test]
    fn test_normalize_scan_code() {
        assert_eq!(normalize_scan_code("ABC-123").unwrap(), "ABC-123");
        assert_eq!(normalize_scan_code("  12345678\r\n").unwrap(), "12345678");
        assert_eq!(normalize_scan_code("01\u{1d}123").unwrap(), "01123");

        assert!(normalize_scan_code("").is_err());
        assert!(normalize_scan_code(" \r\n").is_err());
        assert!(normalize_scan_code(&"9".repeat(200)).is_err());
    }

    #[test]
    fn test_looks_like_retail_barcode() {
        assert!(looks_like_retail_barcode("12345678"));
        assert!(looks_like_retail_barcode("0123456789012"));
        assert!(!looks_like_retail_barcode("1234567"));
        assert!(!looks_like_retail_barcode("ABC12345"));
    }

    #[test]
    fn test_gtin_checksum() {
        assert!(gtin_checksum_valid("4006381333931")); // EAN-13
        assert!(gtin_checksum_valid("96385074")); // EAN-8
        assert!(gtin_checksum_valid("036000291452")); // UPC-A
        assert!(gtin_checksum_valid("10012345678902")); // GTIN-14

        assert!(!gtin_checksum_valid("4006381333932"));
        assert!(!gtin_checksum_valid("40063813339"));
        assert!(!gtin_checksum_valid("400638133393X"));
    }

    #[test]
    fn test_validate_symbology_payload() {
        assert!(validate_symbology_payload(Symbology::Ean13, "4006381333931").is_ok());
        assert!(validate_symbology_payload(Symbology::Ean13, "4006381333932").is_err());
        // No check digit rule for QR payloads
        assert!(validate_symbology_payload(Symbology::QrCode, "4006381333932").is_ok());
    }

    #[test]
    fn test_non_numeric_retail_payload_is_rejected_by_shape() {
        let err = validate_symbology_payload(Symbology::Ean13, "40063813339O1").unwrap_err();
        match err {
            ValidationError::InvalidFormat { reason, .. } => {
                assert_eq!(reason, "ean_13 payload must be 8-14 digits");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = validate_symbology_payload(Symbology::Ean13, "4006381333932").unwrap_err();
        match err {
            ValidationError::InvalidFormat { reason, .. } => {
                assert_eq!(reason, "ean_13 check digit mismatch");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
