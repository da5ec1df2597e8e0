//! # Scan Feedback
//!
//! User-facing notifications raised by the pipeline.
//!
//! The host screen implements [`ScanFeedback`] to show toasts (or play a
//! beep). [`TracingFeedback`] logs instead, and [`NoOpFeedback`] discards.

use tally_core::{ScanSource, ScannableProduct};
use tracing::{info, warn};

use crate::camera::CameraFault;

/// Receives the notifications the cashier should see.
pub trait ScanFeedback: Send + Sync {
    /// A scan resolved to a product.
    fn found(&self, product: &ScannableProduct, source: ScanSource);

    /// A scan had no catalog match. `message` already differs per source.
    fn not_found(&self, code: &str, source: ScanSource, message: &str);

    /// The camera session hit a fault.
    fn camera_fault(&self, fault: &CameraFault, message: &str);
}

/// No-op feedback for testing.
pub struct NoOpFeedback;

impl ScanFeedback for NoOpFeedback {
    fn found(&self, _product: &ScannableProduct, _source: ScanSource) {}
    fn not_found(&self, _code: &str, _source: ScanSource, _message: &str) {}
    fn camera_fault(&self, _fault: &CameraFault, _message: &str) {}
}

/// Feedback that only logs.
pub struct TracingFeedback;

impl ScanFeedback for TracingFeedback {
    fn found(&self, product: &ScannableProduct, source: ScanSource) {
        info!(product_id = %product.id, name = %product.name, source = %source, "Product scanned");
    }

    fn not_found(&self, code: &str, source: ScanSource, message: &str) {
        warn!(code = %code, source = %source, "{}", message);
    }

    fn camera_fault(&self, fault: &CameraFault, message: &str) {
        warn!(?fault, "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn captured(f: impl FnOnce()) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_tracing_feedback_logs_each_notification() {
        let product = ScannableProduct::new("p-7", "Pencil HB", 99);
        let feedback: &dyn ScanFeedback = &TracingFeedback;

        let logs = captured(|| {
            feedback.found(&product, ScanSource::Keyboard);
            feedback.not_found("PEN-XX", ScanSource::Camera, "Scanned code not recognized");
        });

        assert!(logs.contains("Product scanned"));
        assert!(logs.contains("p-7"));
        assert!(logs.contains("PEN-XX"));
        assert!(logs.contains("Scanned code not recognized"));
    }

    #[test]
    fn test_noop_feedback_is_silent() {
        let product = ScannableProduct::new("p-7", "Pencil HB", 99);
        let feedback: &dyn ScanFeedback = &NoOpFeedback;

        let logs = captured(|| {
            feedback.found(&product, ScanSource::Manual);
            feedback.not_found("PEN-XX", ScanSource::Manual, "No product matches");
        });

        assert!(logs.is_empty());
    }
}
