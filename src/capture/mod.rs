// SPDX-License-Identifier: GPL-3.0-only

//! Device capture core
//!
//! Everything between the hardware callback and the consumer: typed
//! device/mode descriptions, the pooled frame buffers, the bounded
//! drop-oldest queue, the delivery sink shared with backend threads, and
//! the session lifecycle that ties them to one claimed device.

pub mod enumeration;
pub mod pool;
pub mod queue;
pub mod session;
pub mod sink;
pub mod types;

pub use enumeration::DeviceEnumerator;
pub use session::CaptureSession;
pub use sink::FrameSink;
pub use types::{
    CaptureStats, CapturedFrame, DeviceDescriptor, DeviceId, Framerate, PixelEncoding,
    STANDARD_MODES, SessionOptions, SessionState, SignalMode,
};
