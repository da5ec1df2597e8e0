//! Observable camera session state.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ScanError;

/// Why a camera session ended in `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CameraFault {
    PermissionDenied,
    NoDevice,
    StreamInitFailed { reason: String },
    StreamFailed { reason: String },
}

impl CameraFault {
    /// Permission and device faults cannot be recovered inside the session.
    /// Stream faults can, by switching to another device.
    pub fn allows_device_switch(&self) -> bool {
        matches!(
            self,
            CameraFault::StreamInitFailed { .. } | CameraFault::StreamFailed { .. }
        )
    }

    /// Text shown to the cashier next to the retry affordance.
    pub fn user_message(&self) -> String {
        ScanError::from(self.clone()).user_message()
    }
}

impl From<CameraFault> for ScanError {
    fn from(fault: CameraFault) -> Self {
        match fault {
            CameraFault::PermissionDenied => ScanError::PermissionDenied,
            CameraFault::NoDevice => ScanError::NoDeviceFound,
            CameraFault::StreamInitFailed { reason } => ScanError::StreamInitFailed(reason),
            CameraFault::StreamFailed { reason } => ScanError::StreamFailed(reason),
        }
    }
}

/// Camera session lifecycle.
///
/// ```text
/// Idle ─► RequestingPermission ─► DeviceEnumeration ─► Streaming ─► Stopped
///                 │                       │                │  ▲
///                 ▼                       ▼                │  │ switch_device
///        Error(PermissionDenied)   Error(NoDevice)         └──┘
///                                                          │
///                                                          ▼
///                                         Error(StreamInitFailed / StreamFailed)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum CameraState {
    Idle,
    RequestingPermission,
    DeviceEnumeration,
    Streaming { device_id: String },
    Stopped,
    Error(CameraFault),
}

impl CameraState {
    pub fn name(&self) -> &'static str {
        match self {
            CameraState::Idle => "idle",
            CameraState::RequestingPermission => "requesting_permission",
            CameraState::DeviceEnumeration => "device_enumeration",
            CameraState::Streaming { .. } => "streaming",
            CameraState::Stopped => "stopped",
            CameraState::Error(_) => "error",
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, CameraState::Streaming { .. })
    }

    /// True once the session can do no more work (until a new session).
    pub fn is_terminal(&self) -> bool {
        match self {
            CameraState::Stopped => true,
            CameraState::Error(fault) => !fault.allows_device_switch(),
            _ => false,
        }
    }

    pub fn fault(&self) -> Option<&CameraFault> {
        match self {
            CameraState::Error(fault) => Some(fault),
            _ => None,
        }
    }
}

impl std::fmt::Display for CameraState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(CameraState::Stopped.is_terminal());
        assert!(CameraState::Error(CameraFault::PermissionDenied).is_terminal());
        assert!(CameraState::Error(CameraFault::NoDevice).is_terminal());
        assert!(!CameraState::Error(CameraFault::StreamFailed {
            reason: "unplugged".into()
        })
        .is_terminal());
        assert!(!CameraState::Idle.is_terminal());
    }

    #[test]
    fn test_state_serialization_shape() {
        let json = serde_json::to_value(CameraState::Streaming {
            device_id: "cam-1".into(),
        })
        .unwrap();
        assert_eq!(json["state"], "streaming");
        assert_eq!(json["detail"]["device_id"], "cam-1");

        let json = serde_json::to_value(CameraState::Error(CameraFault::NoDevice)).unwrap();
        assert_eq!(json["state"], "error");
        assert_eq!(json["detail"]["kind"], "no_device");
    }

    #[test]
    fn test_fault_converts_to_terminal_error() {
        let err: ScanError = CameraFault::PermissionDenied.into();
        assert!(err.is_terminal_for_session());
        assert!(CameraFault::NoDevice.user_message().contains("No camera"));
    }
}
