//! # Camera Decoder Session
//!
//! Camera-based barcode capture for the scanner modal.
//!
//! ## Module Structure
//! ```text
//! camera/
//! ├── mod.rs       ← You are here (exports)
//! ├── backend.rs   ← CameraBackend / MediaStream traits (platform seam)
//! ├── decoder.rs   ← FrameDecoder trait, decode throttle and read filter
//! ├── device.rs    ← VideoDevice, facing heuristic, default selection
//! ├── multiformat.rs ← rxing-backed decoder for every supported format
//! ├── scripted.rs  ← In-memory backend and decoder
//! ├── session.rs   ← CameraSession state machine and decode loop
//! └── state.rs     ← CameraState / CameraFault
//! ```
//!
//! ## Supported Formats
//! QR, EAN-13, EAN-8, Code 128, Code 39, UPC-A, UPC-E, ITF, Data Matrix,
//! Aztec, PDF417 and Codabar; the active list comes from
//! [`crate::config::CameraSettings::formats`].

pub mod backend;
pub mod decoder;
pub mod device;
pub mod multiformat;
pub mod scripted;
pub mod session;
pub mod state;

pub use backend::{CameraBackend, Frame, MediaStream, PermissionOutcome, StreamConstraints, TrackState};
pub use decoder::{DecodedCode, FrameDecoder};
pub use device::{select_default, Facing, VideoDevice};
pub use multiformat::MultiFormatDecoder;
pub use scripted::{ScriptedCamera, ScriptedDecoder};
pub use session::{CameraSession, SessionCloser};
pub use state::{CameraFault, CameraState};
