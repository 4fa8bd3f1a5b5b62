// SPDX-License-Identifier: MPL-2.0

//! Error types for capture, conversion, and the media source facade

use std::fmt;

use crate::capture::types::{DeviceId, PixelEncoding};
use crate::media::texture::TargetFormat;

/// Result type alias for capture-layer operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Result type alias for facade-level operations
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors from device enumeration and capture sessions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Driver layer is absent or failed to initialize
    HardwareUnavailable(String),
    /// Device id does not resolve against the current enumeration
    DeviceNotFound(DeviceId),
    /// Device is already owned by another session
    DeviceBusy(DeviceId),
    /// Device rejected the requested signal mode
    ModeUnsupported { device: DeviceId, mode: String },
    /// Hardware fault at open time or mid-stream
    HardwareError(String),
}

/// Errors from pixel conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertError {
    /// No conversion path from the frame encoding to the target format
    UnsupportedEncoding {
        encoding: PixelEncoding,
        target: TargetFormat,
    },
    /// Frame and target dimensions disagree
    GeometryMismatch {
        frame: (u32, u32),
        target: (u32, u32),
    },
}

/// Facade-level errors surfaced to the host player
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// Capture-layer failure
    Capture(CaptureError),
    /// Conversion failure
    Convert(ConvertError),
    /// Source URL did not parse or addressed no device
    InvalidUrl(String),
    /// Operation requires an open source
    NotOpen,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::HardwareUnavailable(msg) => write!(f, "Hardware unavailable: {}", msg),
            CaptureError::DeviceNotFound(id) => write!(f, "Device not found: {}", id),
            CaptureError::DeviceBusy(id) => write!(f, "Device is busy: {}", id),
            CaptureError::ModeUnsupported { device, mode } => {
                write!(f, "Mode {} not supported by device {}", mode, device)
            }
            CaptureError::HardwareError(msg) => write!(f, "Hardware error: {}", msg),
        }
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::UnsupportedEncoding { encoding, target } => {
                write!(f, "No conversion from {} to {}", encoding, target)
            }
            ConvertError::GeometryMismatch { frame, target } => write!(
                f,
                "Frame is {}x{} but target is {}x{}",
                frame.0, frame.1, target.0, target.1
            ),
        }
    }
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::Capture(e) => write!(f, "Capture error: {}", e),
            MediaError::Convert(e) => write!(f, "Conversion error: {}", e),
            MediaError::InvalidUrl(url) => write!(f, "Invalid source URL: {}", url),
            MediaError::NotOpen => write!(f, "No source is open"),
        }
    }
}

impl std::error::Error for CaptureError {}
impl std::error::Error for ConvertError {}
impl std::error::Error for MediaError {}

// Conversions from sub-errors to MediaError
impl From<CaptureError> for MediaError {
    fn from(err: CaptureError) -> Self {
        MediaError::Capture(err)
    }
}

impl From<ConvertError> for MediaError {
    fn from(err: ConvertError) -> Self {
        MediaError::Convert(err)
    }
}
