// SPDX-License-Identifier: MPL-2.0

//! Frame presentation layer between capture and a host player
//!
//! Everything above the capture core that a playback host touches:
//!
//! # Color Space Conversion
//!
//! Captured frames arrive in their SDI wire encoding (UYVY, v210 or
//! BGRA), which must be converted to interleaved RGB for display. The
//! [`convert`] module performs CPU conversion with BT.709 video-range
//! coefficients into a host-owned [`texture::TextureTarget`].
//!
//! # Playback Facade
//!
//! The [`source`] module exposes the tick-driven [`source::MediaSource`]:
//! open a device (or an `sdi://device/N` URL), call tick each frame with
//! a texture target, drain lifecycle events. Live sources have no
//! timeline; rate is 0.0 or 1.0.
//!
//! # Modules
//!
//! - [`convert`]: wire-format to display-format pixel conversion
//! - [`source`]: the tick-driven media source facade
//! - [`texture`]: host-owned pixel targets the converter writes into

pub mod convert;
pub mod source;
pub mod texture;

// Re-export commonly used types
pub use convert::convert_frame;
pub use source::{FrameInfo, MediaEvent, MediaSource, PlaybackState};
pub use texture::{TargetFormat, TextureTarget};
