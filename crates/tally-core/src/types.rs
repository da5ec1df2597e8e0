//! # Domain Types
//!
//! Core domain types shared by every stage of the scan pipeline.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ScannableProduct │   │  ScannedCode    │   │  ScanOutcome    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  code           │   │  Found          │       │
//! │  │  name           │   │  source         │   │   product       │       │
//! │  │  barcode / sku  │   │  symbology?     │   │  NotFound       │       │
//! │  │  product_code   │   │  scanned_at     │   │   code          │       │
//! │  │  price / stock  │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────────────────────────┐        │
//! │  │   ScanSource    │   │             Symbology                │        │
//! │  │  ─────────────  │   │  QR, EAN-13/8, Code128/39, UPC-A/E,  │        │
//! │  │  Keyboard       │   │  ITF, Data Matrix, Aztec, PDF417,    │        │
//! │  │  Camera         │   │  Codabar                             │        │
//! │  │  Manual         │   └──────────────────────────────────────┘        │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;

// =============================================================================
// Scannable Product
// =============================================================================

/// A product as the scan pipeline sees it.
///
/// The catalog collaborator fetches the full product record; this is the
/// subset needed to resolve a scan and hand a line item to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScannableProduct {
    /// Unique identifier from the catalog backend.
    pub id: String,

    /// Display name shown to the cashier.
    pub name: String,

    /// Barcode (EAN-13, UPC-A, QR payload, ...).
    #[serde(default)]
    pub barcode: Option<String>,

    /// Stock Keeping Unit - business identifier.
    #[serde(default)]
    pub sku: Option<String>,

    /// Internal product code printed on shelf labels.
    #[serde(default)]
    pub product_code: Option<String>,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Current stock level, `None` when inventory is not tracked.
    #[serde(default)]
    pub stock: Option<i64>,
}

impl ScannableProduct {
    /// Creates a product with no scan codes yet.
    pub fn new(id: impl Into<String>, name: impl Into<String>, price_cents: i64) -> Self {
        ScannableProduct {
            id: id.into(),
            name: name.into(),
            barcode: None,
            sku: None,
            product_code: None,
            price_cents,
            stock: None,
        }
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn with_product_code(mut self, code: impl Into<String>) -> Self {
        self.product_code = Some(code.into());
        self
    }

    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock = Some(stock);
        self
    }

    /// Returns every non-empty scan code in registration order:
    /// barcode, SKU, product code.
    ///
    /// Codes are trimmed; a whitespace-only field counts as empty.
    pub fn scan_codes(&self) -> impl Iterator<Item = &str> {
        [&self.barcode, &self.sku, &self.product_code]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }

    /// Checks if `quantity` units can be sold (untracked stock always can).
    pub fn can_sell(&self, quantity: i64) -> bool {
        match self.stock {
            Some(stock) => stock >= quantity,
            None => true,
        }
    }
}

// =============================================================================
// Scan Source
// =============================================================================

/// Where a scanned code came from.
///
/// Carried on every outcome so the caller can word notifications per source
/// and suppress duplicate notifications for one physical scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ScanSource {
    /// Keyboard-wedge hardware scanner.
    Keyboard,
    /// Camera decoder in the scanner modal.
    Camera,
    /// Code typed into the scanner modal's manual entry field.
    Manual,
}

impl std::fmt::Display for ScanSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanSource::Keyboard => write!(f, "keyboard"),
            ScanSource::Camera => write!(f, "camera"),
            ScanSource::Manual => write!(f, "manual"),
        }
    }
}

// =============================================================================
// Symbology
// =============================================================================

/// A barcode encoding standard the camera decoder is asked to recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Symbology {
    #[serde(rename = "qr_code")]
    QrCode,
    #[serde(rename = "ean_13")]
    Ean13,
    #[serde(rename = "ean_8")]
    Ean8,
    #[serde(rename = "code_128")]
    Code128,
    #[serde(rename = "code_39")]
    Code39,
    #[serde(rename = "upc_a")]
    UpcA,
    #[serde(rename = "upc_e")]
    UpcE,
    #[serde(rename = "itf")]
    Itf,
    #[serde(rename = "data_matrix")]
    DataMatrix,
    #[serde(rename = "aztec")]
    Aztec,
    #[serde(rename = "pdf417")]
    Pdf417,
    #[serde(rename = "codabar")]
    Codabar,
}

impl Symbology {
    /// Every supported symbology, the default camera format set.
    pub const ALL: [Symbology; 12] = [
        Symbology::QrCode,
        Symbology::Ean13,
        Symbology::Ean8,
        Symbology::Code128,
        Symbology::Code39,
        Symbology::UpcA,
        Symbology::UpcE,
        Symbology::Itf,
        Symbology::DataMatrix,
        Symbology::Aztec,
        Symbology::Pdf417,
        Symbology::Codabar,
    ];

    /// Config/wire name (matches the serde representation).
    pub const fn as_str(&self) -> &'static str {
        match self {
            Symbology::QrCode => "qr_code",
            Symbology::Ean13 => "ean_13",
            Symbology::Ean8 => "ean_8",
            Symbology::Code128 => "code_128",
            Symbology::Code39 => "code_39",
            Symbology::UpcA => "upc_a",
            Symbology::UpcE => "upc_e",
            Symbology::Itf => "itf",
            Symbology::DataMatrix => "data_matrix",
            Symbology::Aztec => "aztec",
            Symbology::Pdf417 => "pdf417",
            Symbology::Codabar => "codabar",
        }
    }

    /// Returns true for one-dimensional retail formats whose payload ends in
    /// a GTIN mod-10 check digit.
    ///
    /// ITF is only checked when it carries a 14-digit GTIN (ITF-14); other
    /// ITF lengths have no standard check digit.
    pub fn carries_gtin_check_digit(&self, payload: &str) -> bool {
        match self {
            Symbology::Ean13 | Symbology::Ean8 | Symbology::UpcA => true,
            Symbology::Itf => payload.len() == 14,
            _ => false,
        }
    }
}

impl std::fmt::Display for Symbology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Symbology {
    type Err = CoreError;

    /// Accepts the config name plus the spellings scanner vendors use
    /// (`EAN-13`, `ean13`, `QR`, `code128`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();

        match folded.as_str() {
            "qr" | "qrcode" => Ok(Symbology::QrCode),
            "ean13" => Ok(Symbology::Ean13),
            "ean8" => Ok(Symbology::Ean8),
            "code128" => Ok(Symbology::Code128),
            "code39" => Ok(Symbology::Code39),
            "upca" => Ok(Symbology::UpcA),
            "upce" => Ok(Symbology::UpcE),
            "itf" | "itf14" => Ok(Symbology::Itf),
            "datamatrix" => Ok(Symbology::DataMatrix),
            "aztec" => Ok(Symbology::Aztec),
            "pdf417" => Ok(Symbology::Pdf417),
            "codabar" => Ok(Symbology::Codabar),
            _ => Err(CoreError::UnknownSymbology(s.to_string())),
        }
    }
}

// =============================================================================
// Scanned Code
// =============================================================================

/// A normalized code handed from a source recognizer to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScannedCode {
    /// The code string as captured.
    pub code: String,

    /// Which recognizer produced it.
    pub source: ScanSource,

    /// Decoded format, known for camera reads only.
    pub symbology: Option<Symbology>,

    /// When the recognizer completed the code.
    #[ts(as = "String")]
    pub scanned_at: DateTime<Utc>,
}

impl ScannedCode {
    pub fn new(code: impl Into<String>, source: ScanSource, scanned_at: DateTime<Utc>) -> Self {
        ScannedCode {
            code: code.into(),
            source,
            symbology: None,
            scanned_at,
        }
    }

    pub fn with_symbology(mut self, symbology: Symbology) -> Self {
        self.symbology = Some(symbology);
        self
    }
}

// =============================================================================
// Scan Outcome
// =============================================================================

/// The result of one physical scan, consumed exactly once by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// The code resolved to a catalog product.
    Found {
        product: ScannableProduct,
        code: String,
        source: ScanSource,
    },
    /// A valid scan with no catalog match.
    NotFound { code: String, source: ScanSource },
}

impl ScanOutcome {
    /// The code that produced this outcome.
    pub fn code(&self) -> &str {
        match self {
            ScanOutcome::Found { code, .. } | ScanOutcome::NotFound { code, .. } => code,
        }
    }

    pub fn source(&self) -> ScanSource {
        match self {
            ScanOutcome::Found { source, .. } | ScanOutcome::NotFound { source, .. } => *source,
        }
    }

    pub fn product(&self) -> Option<&ScannableProduct> {
        match self {
            ScanOutcome::Found { product, .. } => Some(product),
            ScanOutcome::NotFound { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ScanOutcome::Found { .. })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
