// SPDX-License-Identifier: MPL-2.0

//! DeckLink Media - SDI capture from Blackmagic DeckLink cards
//!
//! This library turns a DeckLink capture card (or a built-in simulator)
//! into a pull-based media source: hardware pushes frames on its own
//! schedule, a bounded queue absorbs the rate mismatch, and the consumer
//! renders the newest frame whenever it ticks.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Capture device drivers (DeckLink hardware, simulator)
//! - [`capture`]: Device enumeration, sessions, and the frame pipeline
//! - [`media`]: Color conversion and the tick-driven playback facade
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```no_run
//! use decklink_media::backends::{BackendKind, create_backend};
//! use decklink_media::capture::SessionOptions;
//! use decklink_media::media::{MediaSource, TargetFormat, TextureTarget};
//!
//! let backend = create_backend(BackendKind::Simulator)?;
//! let mut source = MediaSource::new(backend, SessionOptions::default());
//! source.open_url("sdi://device/1")?;
//!
//! let mode = source.video_format().unwrap();
//! let mut target = TextureTarget::new(TargetFormat::Bgra8, mode.width, mode.height);
//! if let Some(frame) = source.tick(&mut target)? {
//!     println!("frame {} at {} ns", frame.sequence, frame.pts_ns);
//! }
//! source.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backends;
pub mod capture;
pub mod config;
pub mod constants;
pub mod errors;
pub mod media;

// Re-export commonly used types
pub use capture::{CaptureSession, DeviceEnumerator, DeviceId, SessionOptions, SignalMode};
pub use config::Config;
pub use errors::{CaptureError, MediaError};
pub use media::{MediaSource, TextureTarget};
