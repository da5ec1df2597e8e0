//! # Catalog Index
//!
//! Maps every scannable code (barcode, SKU, internal product code) to the
//! product that owns it.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Catalog Index Lifecycle                              │
//! │                                                                         │
//! │  Product list fetched ──► CatalogIndex::build(&products)   O(n)         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌───────────────────────────────────────────┐                         │
//! │  │  "0123456789012" ──► Widget               │                         │
//! │  │  "WID-001"       ──► Widget               │                         │
//! │  │  "4006381333931" ──► Pencil               │                         │
//! │  └───────────────────────────────────────────┘                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  resolve(code) ──► Some(&product) | None   O(1), no side effects        │
//! │                                                                         │
//! │  Product list changes ──► build again (never patched in place)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Normalization
//! Keys go through [`normalize_scan_code`], the same rule the dispatcher
//! applies to scans, so a code stored with a GS separator still matches.
//! A code that fails normalization (control characters only, or too long)
//! is never registered.
//!
//! ## Duplicate Codes
//! Each code maps to at most one product. When source data assigns the same
//! code to two products, the later product wins and the collision is counted
//! so the owner can report it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::ScannableProduct;
use crate::validation::normalize_scan_code;

/// Ephemeral lookup structure from scan code to product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogIndex {
    entries: HashMap<String, Arc<ScannableProduct>>,
    collisions: usize,
}

impl CatalogIndex {
    /// Builds the index from a product collection.
    ///
    /// Building twice from the same input yields equal indexes.
    pub fn build(products: &[ScannableProduct]) -> Self {
        let mut entries: HashMap<String, Arc<ScannableProduct>> =
            HashMap::with_capacity(products.len() * 2);
        let mut collisions = 0;

        for product in products {
            let shared = Arc::new(product.clone());
            for code in product.scan_codes() {
                let Ok(key) = normalize_scan_code(code) else {
                    continue;
                };
                if let Some(previous) = entries.insert(key, Arc::clone(&shared)) {
                    // A product listing the same value as barcode and SKU is not a collision
                    if previous.id != product.id {
                        collisions += 1;
                    }
                }
            }
        }

        CatalogIndex {
            entries,
            collisions,
        }
    }

    /// Looks up a code. Pure O(1) map read.
    #[inline]
    pub fn resolve(&self, code: &str) -> Option<&ScannableProduct> {
        self.entries.get(code).map(Arc::as_ref)
    }

    /// Returns true if `code` is registered.
    #[inline]
    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    /// Number of registered codes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of codes that were claimed by more than one product.
    pub fn collisions(&self) -> usize {
        self.collisions
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> ScannableProduct {
        ScannableProduct::new("p-1", "Widget", 499)
            .with_barcode("0123456789012")
            .with_sku("WID-001")
            .with_product_code("W1")
    }

    fn pencil() -> ScannableProduct {
        ScannableProduct::new("p-2", "Pencil", 99).with_barcode("4006381333931")
    }

    #[test]
    fn test_every_code_registered_once() {
        let index = CatalogIndex::build(&[widget(), pencil()]);

        assert_eq!(index.len(), 4);
        for code in ["0123456789012", "WID-001", "W1"] {
            assert_eq!(index.resolve(code).map(|p| p.id.as_str()), Some("p-1"));
        }
        assert_eq!(index.resolve("4006381333931").map(|p| p.id.as_str()), Some("p-2"));
        assert_eq!(index.collisions(), 0);
    }

    #[test]
    fn test_unregistered_code_not_found() {
        let index = CatalogIndex::build(&[widget()]);
        assert!(index.resolve("9999999999999").is_none());
        assert!(index.resolve("").is_none());
    }

    #[test]
    fn test_empty_fields_are_not_keys() {
        let mut product = ScannableProduct::new("p-3", "Loose Apples", 25);
        product.barcode = Some(String::new());
        product.sku = Some("  ".to_string());

        let index = CatalogIndex::build(&[product]);
        assert!(index.is_empty());
        assert!(!index.contains(""));
    }

    #[test]
    fn test_build_is_idempotent() {
        let products = vec![widget(), pencil()];
        let first = CatalogIndex::build(&products);
        let second = CatalogIndex::build(&products);
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_code_last_write_wins() {
        let old = ScannableProduct::new("p-1", "Old Label", 100).with_barcode("12345678");
        let new = ScannableProduct::new("p-9", "New Label", 120).with_barcode("12345678");

        let index = CatalogIndex::build(&[old, new]);
        assert_eq!(index.resolve("12345678").map(|p| p.name.as_str()), Some("New Label"));
        assert_eq!(index.collisions(), 1);
    }

    #[test]
    fn test_same_value_in_two_fields_is_not_a_collision() {
        let product = ScannableProduct::new("p-1", "Widget", 499)
            .with_barcode("12345678")
            .with_sku("12345678");

        let index = CatalogIndex::build(&[product]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.collisions(), 0);
    }

    #[test]
    fn test_codes_are_trimmed() {
        let product = ScannableProduct::new("p-1", "Widget", 499).with_barcode(" 12345678 ");
        let index = CatalogIndex::build(&[product]);
        assert!(index.contains("12345678"));
    }

    #[test]
    fn test_keys_match_normalized_scans() {
        let product = ScannableProduct::new("p-5", "Lot Tagged Flour", 349)
            .with_barcode("01\x1d123")
            .with_sku("\x1d\x1d");

        let index = CatalogIndex::build(&[product]);

        let scanned = normalize_scan_code("01\x1d123").unwrap();
        assert_eq!(index.resolve(&scanned).map(|p| p.id.as_str()), Some("p-5"));
        assert!(index.contains("01123"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_overlong_code_is_not_registered() {
        let product = ScannableProduct::new("p-6", "Mislabelled", 100)
            .with_barcode("9".repeat(crate::MAX_SCAN_CODE_LEN + 1))
            .with_sku("MIS-1");

        let index = CatalogIndex::build(&[product]);
        assert_eq!(index.len(), 1);
        assert!(index.contains("MIS-1"));
    }
}
