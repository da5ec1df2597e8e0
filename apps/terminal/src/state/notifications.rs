//! # Notifications
//!
//! Toasts shown on the POS screen.
//!
//! [`NotificationCenter`] is the screen's [`ScanFeedback`]: the dispatcher
//! and camera session push not-found and camera-fault messages here, and the
//! outcome consumer adds cart refusals (e.g. out of stock).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tally_core::{ScanSource, ScannableProduct};
use tally_scan::{CameraFault, ScanFeedback};
use tracing::{debug, warn};

/// Toasts kept before the oldest is dropped.
const MAX_NOTIFICATIONS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,

    /// Scanned code the toast refers to, if any.
    pub code: Option<String>,
    pub raised_at: DateTime<Utc>,
}

/// Bounded toast queue shared by the pipeline and the screen.
#[derive(Debug, Clone, Default)]
pub struct NotificationCenter {
    queue: Arc<Mutex<VecDeque<Notification>>>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, level: NotificationLevel, message: impl Into<String>, code: Option<&str>) {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        if queue.len() == MAX_NOTIFICATIONS {
            queue.pop_front();
        }
        queue.push_back(Notification {
            level,
            message: message.into(),
            code: code.map(str::to_string),
            raised_at: Utc::now(),
        });
    }

    /// Current toasts, oldest first.
    pub fn snapshot(&self) -> Vec<Notification> {
        let queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.iter().cloned().collect()
    }

    /// Removes and returns every toast.
    pub fn drain(&self) -> Vec<Notification> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScanFeedback for NotificationCenter {
    // The cart line itself is the confirmation; no toast.
    fn found(&self, product: &ScannableProduct, source: ScanSource) {
        debug!(product_id = %product.id, source = %source, "Scan matched");
    }

    fn not_found(&self, code: &str, source: ScanSource, message: &str) {
        warn!(code = %code, source = %source, "No product for scanned code");
        self.push(NotificationLevel::Warning, message, Some(code));
    }

    fn camera_fault(&self, fault: &CameraFault, message: &str) {
        warn!(?fault, "Camera fault");
        self.push(NotificationLevel::Error, message, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_becomes_warning_toast() {
        let center = NotificationCenter::new();
        center.not_found("9999999999999", ScanSource::Keyboard, "No product matches 9999999999999");

        let toasts = center.snapshot();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].level, NotificationLevel::Warning);
        assert_eq!(toasts[0].code.as_deref(), Some("9999999999999"));
    }

    #[test]
    fn test_found_raises_no_toast() {
        let center = NotificationCenter::new();
        center.found(&ScannableProduct::new("p-1", "Widget", 499), ScanSource::Camera);
        assert!(center.is_empty());
    }

    #[test]
    fn test_camera_fault_is_error_toast() {
        let center = NotificationCenter::new();
        center.camera_fault(&CameraFault::PermissionDenied, "Camera access was blocked.");
        assert_eq!(center.drain()[0].level, NotificationLevel::Error);
        assert!(center.is_empty());
    }

    #[test]
    fn test_queue_is_bounded() {
        let center = NotificationCenter::new();
        for i in 0..(MAX_NOTIFICATIONS + 5) {
            center.push(NotificationLevel::Info, format!("toast {}", i), None);
        }
        let toasts = center.snapshot();
        assert_eq!(toasts.len(), MAX_NOTIFICATIONS);
        assert_eq!(toasts[0].message, "toast 5");
    }
}
