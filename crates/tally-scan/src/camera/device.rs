//! Video input devices and default selection.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One enumerated video input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VideoDevice {
    pub device_id: String,
    /// Human-readable label; empty until permission is granted on most
    /// platforms.
    #[serde(default)]
    pub label: String,
}

impl VideoDevice {
    pub fn new(device_id: impl Into<String>, label: impl Into<String>) -> Self {
        VideoDevice {
            device_id: device_id.into(),
            label: label.into(),
        }
    }

    /// Guesses which way the camera faces from its label.
    pub fn facing(&self) -> Facing {
        Facing::from_label(&self.label)
    }
}

/// Camera orientation inferred from the device label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Front,
    Rear,
    Unknown,
}

const FRONT_KEYWORDS: &[&str] = &["front", "user", "facetime", "selfie", "integrated", "webcam"];
const REAR_KEYWORDS: &[&str] = &["back", "rear", "environment", "world"];

impl Facing {
    pub fn from_label(label: &str) -> Facing {
        let label = label.to_lowercase();

        if FRONT_KEYWORDS.iter().any(|k| label.contains(k)) {
            Facing::Front
        } else if REAR_KEYWORDS.iter().any(|k| label.contains(k)) {
            Facing::Rear
        } else {
            Facing::Unknown
        }
    }
}

/// Picks the device a new session streams from.
///
/// ## Priority
/// 1. `preferred` (remembered device), if still enumerated
/// 2. First front-facing device (counter terminals face the cashier)
/// 3. First rear-facing device
/// 4. First device
pub fn select_default<'a>(
    devices: &'a [VideoDevice],
    preferred: Option<&str>,
) -> Option<&'a VideoDevice> {
    if let Some(id) = preferred {
        if let Some(device) = devices.iter().find(|d| d.device_id == id) {
            return Some(device);
        }
    }

    devices
        .iter()
        .find(|d| d.facing() == Facing::Front)
        .or_else(|| devices.iter().find(|d| d.facing() == Facing::Rear))
        .or_else(|| devices.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_from_label() {
        assert_eq!(Facing::from_label("FaceTime HD Camera (Built-in)"), Facing::Front);
        assert_eq!(Facing::from_label("Integrated Webcam"), Facing::Front);
        assert_eq!(Facing::from_label("camera2 1, facing back"), Facing::Rear);
        assert_eq!(Facing::from_label("Rear Camera"), Facing::Rear);
        assert_eq!(Facing::from_label("USB2.0 PC CAMERA"), Facing::Unknown);
        assert_eq!(Facing::from_label(""), Facing::Unknown);
    }

    #[test]
    fn test_front_preferred_over_rear() {
        let devices = vec![
            VideoDevice::new("a", "Back Camera"),
            VideoDevice::new("b", "Front Camera"),
        ];
        assert_eq!(select_default(&devices, None).map(|d| d.device_id.as_str()), Some("b"));
    }

    #[test]
    fn test_rear_then_first() {
        let devices = vec![
            VideoDevice::new("a", "USB Capture"),
            VideoDevice::new("b", "Rear Camera"),
        ];
        assert_eq!(select_default(&devices, None).map(|d| d.device_id.as_str()), Some("b"));

        let unlabeled = vec![VideoDevice::new("x", ""), VideoDevice::new("y", "")];
        assert_eq!(select_default(&unlabeled, None).map(|d| d.device_id.as_str()), Some("x"));
    }

    #[test]
    fn test_remembered_device_wins_when_present() {
        let devices = vec![
            VideoDevice::new("a", "Front Camera"),
            VideoDevice::new("b", "Back Camera"),
        ];
        assert_eq!(
            select_default(&devices, Some("b")).map(|d| d.device_id.as_str()),
            Some("b")
        );
        assert_eq!(
            select_default(&devices, Some("gone")).map(|d| d.device_id.as_str()),
            Some("a")
        );
    }

    #[test]
    fn test_no_devices() {
        assert!(select_default(&[], None).is_none());
    }
}
