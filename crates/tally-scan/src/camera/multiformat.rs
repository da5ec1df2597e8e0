//! Multi-format frame decoder backed by `rxing`.
//!
//! Frames are 8-bit grayscale, row-major, `width * height` bytes. Hosts
//! convert camera output (RGBA, NV12, ...) to luma before handing frames to
//! the session.

use rxing::BarcodeFormat;
use tally_core::Symbology;
use tracing::trace;

use super::backend::Frame;
use super::decoder::{DecodedCode, FrameDecoder};
use crate::error::{ScanError, ScanResult};

/// Maps a symbology onto the recognizer's format.
pub fn to_barcode_format(symbology: Symbology) -> BarcodeFormat {
    match symbology {
        Symbology::QrCode => BarcodeFormat::QR_CODE,
        Symbology::Ean13 => BarcodeFormat::EAN_13,
        Symbology::Ean8 => BarcodeFormat::EAN_8,
        Symbology::Code128 => BarcodeFormat::CODE_128,
        Symbology::Code39 => BarcodeFormat::CODE_39,
        Symbology::UpcA => BarcodeFormat::UPC_A,
        Symbology::UpcE => BarcodeFormat::UPC_E,
        Symbology::Itf => BarcodeFormat::ITF,
        Symbology::DataMatrix => BarcodeFormat::DATA_MATRIX,
        Symbology::Aztec => BarcodeFormat::AZTEC,
        Symbology::Pdf417 => BarcodeFormat::PDF_417,
        Symbology::Codabar => BarcodeFormat::CODABAR,
    }
}

/// Maps a recognized format back; formats the pipeline never asks for
/// (MaxiCode, RSS, ...) yield `None`.
pub fn from_barcode_format(format: &BarcodeFormat) -> Option<Symbology> {
    Symbology::ALL
        .into_iter()
        .find(|symbology| &to_barcode_format(*symbology) == format)
}

/// Decodes every [`Symbology`] the pipeline supports.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiFormatDecoder;

impl MultiFormatDecoder {
    pub fn new() -> Self {
        MultiFormatDecoder
    }
}

impl FrameDecoder for MultiFormatDecoder {
    fn decode(&self, frame: &Frame, formats: &[Symbology]) -> ScanResult<DecodedCode> {
        let expected = frame.width as usize * frame.height as usize;
        if frame.data.len() != expected {
            return Err(ScanError::StreamFailed(format!(
                "frame {} is {}x{} but carries {} bytes",
                frame.sequence,
                frame.width,
                frame.height,
                frame.data.len()
            )));
        }
        if expected == 0 || formats.is_empty() {
            return Err(ScanError::DecodeTransientMiss);
        }

        // A single configured format lets the recognizer skip the others
        let only = match formats {
            [single] => Some(to_barcode_format(*single)),
            _ => None,
        };

        let read = rxing::helpers::detect_in_luma(frame.data.clone(), frame.width, frame.height, only)
            .map_err(|e| {
                trace!(sequence = frame.sequence, error = ?e, "No barcode in frame");
                ScanError::DecodeTransientMiss
            })?;

        match from_barcode_format(read.getBarcodeFormat()) {
            Some(symbology) if formats.contains(&symbology) => {
                Ok(DecodedCode::new(read.getText(), symbology))
            }
            _ => Err(ScanError::DecodeTransientMiss),
        }
    }
}
