// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for capture devices, signal modes, and frames

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::capture::pool::PooledBuffer;

/// Stable identifier for a capture device
///
/// Formed from the backend name and the card's sub-device index, so it
/// survives re-enumeration and never depends on the position of the device
/// in an enumeration result.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a device id from a backend name and sub-device index
    pub fn new(backend: &str, sub_device: u32) -> Self {
        Self(format!("{}:{}", backend, sub_device))
    }

    /// The id as a string (e.g., "simulator:0", "decklink:1")
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric sub-device index, when the id carries one
    pub fn sub_device(&self) -> Option<u32> {
        self.0.rsplit_once(':').and_then(|(_, index)| index.parse().ok())
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Framerate as a fraction (numerator/denominator)
/// Stores exact framerate to handle NTSC rates like 59.94fps (60000/1001)
///
/// `new` reduces the fraction, so equality and ordering compare by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Framerate {
    pub num: u32,
    pub denom: u32,
}

impl Framerate {
    /// Create a new framerate from numerator and denominator
    ///
    /// Zero components are coerced to 1; the fraction is stored reduced.
    pub fn new(num: u32, denom: u32) -> Self {
        let num = if num == 0 { 1 } else { num };
        let denom = if denom == 0 { 1 } else { denom };
        let divisor = gcd(num, denom);
        Self {
            num: num / divisor,
            denom: denom / divisor,
        }
    }

    /// Create a framerate from an integer (e.g., 30 becomes 30/1)
    pub fn from_int(fps: u32) -> Self {
        Self { num: fps, denom: 1 }
    }

    /// Get the framerate as a floating point value
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.denom as f64
    }

    /// Get the truncated integer framerate (29 for 29.97)
    pub fn as_int(&self) -> u32 {
        self.num / self.denom
    }

    /// Frame period for this rate
    pub fn interval(&self) -> Duration {
        Duration::from_nanos(self.denom as u64 * 1_000_000_000 / self.num as u64)
    }
}

impl std::fmt::Display for Framerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fps = self.as_f64();
        // Show decimal for non-integer framerates (NTSC)
        if self.denom != 1 {
            write!(f, "{:.2}", fps)
        } else {
            write!(f, "{}", self.num)
        }
    }
}

impl Default for Framerate {
    fn default() -> Self {
        Self { num: 30, denom: 1 }
    }
}

impl PartialOrd for Framerate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Framerate {
    /// Order by value, so 30000/1001 sorts below 30/1
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.num as u64 * other.denom as u64).cmp(&(other.num as u64 * self.denom as u64))
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Wire encoding of captured pixels
///
/// These are the encodings SDI capture hardware can deliver into host
/// memory. `Raw12` is capturable but deliberately has no CPU conversion
/// path; consumers wanting RAW process it offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelEncoding {
    /// Packed 8-bit 4:2:2 (U Y0 V Y1), the default capture encoding
    Uyvy8,
    /// v210-packed 10-bit 4:2:2, three components per 32-bit word
    Yuv10,
    /// 32-bit BGRA, already display-ready
    Bgra8,
    /// 12-bit Bayer RAW, two photosites packed in three bytes
    Raw12,
}

impl PixelEncoding {
    /// Bytes per row for this encoding at the given width
    pub fn row_bytes(&self, width: u32) -> usize {
        let width = width as usize;
        match self {
            PixelEncoding::Uyvy8 => width * 2,
            // v210 packs 48 pixels into each 128-byte block
            PixelEncoding::Yuv10 => width.div_ceil(48) * 128,
            PixelEncoding::Bgra8 => width * 4,
            PixelEncoding::Raw12 => (width * 3).div_ceil(2),
        }
    }

    /// Total frame size in bytes for this encoding
    pub fn frame_bytes(&self, width: u32, height: u32) -> usize {
        self.row_bytes(width) * height as usize
    }

    /// Check if this encoding carries Y'CbCr samples
    pub fn is_yuv(&self) -> bool {
        matches!(self, PixelEncoding::Uyvy8 | PixelEncoding::Yuv10)
    }

    /// FourCC-style short name
    pub fn fourcc(&self) -> &'static str {
        match self {
            PixelEncoding::Uyvy8 => "UYVY",
            PixelEncoding::Yuv10 => "v210",
            PixelEncoding::Bgra8 => "BGRA",
            PixelEncoding::Raw12 => "R12L",
        }
    }
}

impl std::str::FromStr for PixelEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uyvy" | "2vuy" => Ok(PixelEncoding::Uyvy8),
            "v210" | "yuv10" => Ok(PixelEncoding::Yuv10),
            "bgra" => Ok(PixelEncoding::Bgra8),
            "r12l" | "raw12" => Ok(PixelEncoding::Raw12),
            other => Err(format!("unknown pixel encoding '{}'", other)),
        }
    }
}

impl std::fmt::Display for PixelEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fourcc())
    }
}

/// A video signal mode a device can capture: geometry, rate, and encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalMode {
    pub width: u32,
    pub height: u32,
    pub fps: Framerate,
    pub encoding: PixelEncoding,
    pub interlaced: bool,
}

impl SignalMode {
    /// Create a progressive mode with the default capture encoding
    pub fn progressive(width: u32, height: u32, fps: Framerate) -> Self {
        Self {
            width,
            height,
            fps,
            encoding: PixelEncoding::Uyvy8,
            interlaced: false,
        }
    }

    /// Same mode with a different wire encoding
    pub fn with_encoding(mut self, encoding: PixelEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Bytes per row at this mode's encoding
    pub fn row_bytes(&self) -> usize {
        self.encoding.row_bytes(self.width)
    }

    /// Total frame size in bytes
    pub fn frame_bytes(&self) -> usize {
        self.encoding.frame_bytes(self.width, self.height)
    }

    /// Frame period at this mode's rate
    pub fn frame_interval(&self) -> Duration {
        self.fps.interval()
    }

    /// Broadcast shorthand: "1080p29.97", "1080i50", "2160p30"
    ///
    /// Interlaced modes show the field rate, progressive modes the frame
    /// rate, matching SDI convention.
    pub fn shorthand(&self) -> String {
        let scan = if self.interlaced { 'i' } else { 'p' };
        let rate = if self.interlaced {
            Framerate::new(self.fps.num * 2, self.fps.denom)
        } else {
            self.fps
        };
        format!("{}{}{}", self.height, scan, rate)
    }

    /// Resolve a broadcast shorthand against the standard mode table
    ///
    /// Case-insensitive; returns the table entry (default UYVY encoding).
    pub fn from_shorthand(s: &str) -> Option<SignalMode> {
        let wanted = s.trim().to_ascii_lowercase();
        STANDARD_MODES
            .iter()
            .find(|mode| mode.shorthand().to_ascii_lowercase() == wanted)
            .copied()
    }
}

impl std::fmt::Display for SignalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.shorthand(), self.encoding)
    }
}

/// The standard HD/UHD mode table, in ascending raster order
///
/// Covers the modes broadcast SDI equipment actually emits; device
/// descriptors list the subset a given card supports.
pub const STANDARD_MODES: [SignalMode; 19] = [
    mode(1280, 720, 50, 1, false),
    mode(1280, 720, 60000, 1001, false),
    mode(1280, 720, 60, 1, false),
    mode(1920, 1080, 24000, 1001, false),
    mode(1920, 1080, 24, 1, false),
    mode(1920, 1080, 25, 1, false),
    mode(1920, 1080, 30000, 1001, false),
    mode(1920, 1080, 30, 1, false),
    mode(1920, 1080, 50, 1, false),
    mode(1920, 1080, 60000, 1001, false),
    mode(1920, 1080, 60, 1, false),
    mode(1920, 1080, 25, 1, true),
    mode(1920, 1080, 30000, 1001, true),
    mode(1920, 1080, 30, 1, true),
    mode(3840, 2160, 24000, 1001, false),
    mode(3840, 2160, 24, 1, false),
    mode(3840, 2160, 25, 1, false),
    mode(3840, 2160, 30000, 1001, false),
    mode(3840, 2160, 30, 1, false),
];

const fn mode(width: u32, height: u32, num: u32, denom: u32, interlaced: bool) -> SignalMode {
    SignalMode {
        width,
        height,
        fps: Framerate { num, denom },
        encoding: PixelEncoding::Uyvy8,
        interlaced,
    }
}

/// A capture device as seen at enumeration time
///
/// Descriptors are snapshots: a later enumeration pass invalidates earlier
/// ones, and devices are always resolved by [`DeviceId`], never by their
/// position in the enumeration result.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    pub id: DeviceId,
    pub display_name: String,
    /// Backend that owns the device ("simulator", "decklink")
    pub backend: String,
    /// Geometry/rate modes the card accepts, default encoding per entry
    pub modes: Vec<SignalMode>,
    /// Wire encodings the card can deliver for any listed mode
    pub encodings: Vec<PixelEncoding>,
    /// Card can detect the incoming signal format on its own
    pub supports_format_detection: bool,
}

impl DeviceDescriptor {
    /// Check whether the device accepts a mode with its requested encoding
    pub fn supports(&self, mode: &SignalMode) -> bool {
        self.encodings.contains(&mode.encoding)
            && self.modes.iter().any(|m| {
                m.width == mode.width
                    && m.height == mode.height
                    && m.fps == mode.fps
                    && m.interlaced == mode.interlaced
            })
    }

    /// Default mode when the caller does not request one
    ///
    /// Prefers 1080p29.97, then any progressive 1080 mode, then the first
    /// listed mode.
    pub fn preferred_mode(&self) -> Option<SignalMode> {
        self.modes
            .iter()
            .find(|m| m.height == 1080 && !m.interlaced && m.fps.as_int() == 29)
            .or_else(|| self.modes.iter().find(|m| m.height == 1080 && !m.interlaced))
            .or_else(|| self.modes.first())
            .copied()
    }
}

/// Capture session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No hardware held
    Closed,
    /// Negotiating the device and mode
    Opening,
    /// Delivery running
    Streaming,
    /// Releasing the device
    Closing,
    /// Unrecoverable mid-stream fault; close and reopen to retry
    Error,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Closed => "Closed",
            SessionState::Opening => "Opening",
            SessionState::Streaming => "Streaming",
            SessionState::Closing => "Closing",
            SessionState::Error => "Error",
        };
        write!(f, "{}", name)
    }
}

/// Tunables for a capture session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Bounded queue depth between delivery and consumer
    pub queue_capacity: usize,
    /// Buffers the frame pool retains for reuse
    pub pool_retention: usize,
    /// Bounded wait for the delivery side to acknowledge a close
    pub close_grace: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            queue_capacity: crate::constants::queue::DEFAULT_CAPACITY,
            pool_retention: crate::constants::pool::DEFAULT_RETENTION,
            close_grace: crate::constants::timing::CLOSE_GRACE,
        }
    }
}

/// A single captured video frame
///
/// The pixel buffer is pool-owned: exactly one of the delivery side, the
/// frame queue, or the consumer holds it at any time, and dropping the
/// frame recycles the buffer into the session pool.
#[derive(Debug)]
pub struct CapturedFrame {
    pub mode: SignalMode,
    /// Packed pixel rows in the mode's wire encoding
    pub buffer: PooledBuffer,
    /// Strictly increasing per session, starting at 1
    pub sequence: u64,
    /// Presentation time in nanoseconds from stream start (hardware clock)
    pub pts_ns: u64,
    /// Arrival timestamp for latency diagnostics
    pub captured_at: Instant,
}

impl CapturedFrame {
    /// Pixel data in the mode's wire encoding
    pub fn data(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// Bytes per row of the pixel data
    pub fn row_bytes(&self) -> usize {
        self.mode.row_bytes()
    }
}

/// Counters observable on a running or closed session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Frames handed to the queue
    pub delivered: u64,
    /// Frames evicted from the queue before the consumer saw them
    pub dropped: u64,
    /// Deliveries skipped because the input carried no signal
    pub no_signal: u64,
    /// Sequence number of the newest delivered frame
    pub last_sequence: Option<u64>,
    /// Frames currently waiting in the queue
    pub queue_depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ntsc_framerate_displays_with_decimals() {
        assert_eq!(Framerate::new(30000, 1001).to_string(), "29.97");
        assert_eq!(Framerate::new(60000, 1001).to_string(), "59.94");
        assert_eq!(Framerate::from_int(25).to_string(), "25");
    }

    #[test]
    fn framerates_reduce_and_order_by_value() {
        assert_eq!(Framerate::new(60, 2), Framerate::from_int(30));
        assert_eq!(Framerate::new(50, 0), Framerate::from_int(50));

        // NTSC 29.97 sits just below integer 30
        assert!(Framerate::new(30000, 1001) < Framerate::from_int(30));
        assert!(Framerate::from_int(30) < Framerate::new(60000, 1001));
    }

    #[test]
    fn shorthand_round_trips_through_the_mode_table() {
        for mode in STANDARD_MODES {
            let parsed = SignalMode::from_shorthand(&mode.shorthand())
                .expect("every table entry parses back");
            assert_eq!(parsed, mode, "round trip for {}", mode.shorthand());
        }
    }

    #[test]
    fn interlaced_shorthand_shows_field_rate() {
        let m = SignalMode::from_shorthand("1080i50").expect("1080i50 is a standard mode");
        assert_eq!(m.fps, Framerate::new(25, 1));
        assert!(m.interlaced);
        assert_eq!(m.shorthand(), "1080i50");
    }

    #[test]
    fn v210_rows_are_128_byte_blocks() {
        // 1280 px = 26.7 blocks of 48 px, rounded up to 27 blocks
        assert_eq!(PixelEncoding::Yuv10.row_bytes(1280), 27 * 128);
        assert_eq!(PixelEncoding::Yuv10.row_bytes(1920), 40 * 128);
        assert_eq!(PixelEncoding::Uyvy8.row_bytes(1920), 3840);
    }

    #[test]
    fn descriptor_rejects_unlisted_geometry_and_encoding() {
        let descriptor = DeviceDescriptor {
            id: DeviceId::new("sim", 0),
            display_name: "Test".into(),
            backend: "simulator".into(),
            modes: vec![SignalMode::progressive(1920, 1080, Framerate::new(30000, 1001))],
            encodings: vec![PixelEncoding::Uyvy8],
            supports_format_detection: false,
        };

        let supported = SignalMode::progressive(1920, 1080, Framerate::new(30000, 1001));
        assert!(descriptor.supports(&supported));

        let wrong_geometry = SignalMode::progressive(1280, 720, Framerate::new(50, 1));
        assert!(!descriptor.supports(&wrong_geometry));

        let wrong_encoding = supported.with_encoding(PixelEncoding::Yuv10);
        assert!(!descriptor.supports(&wrong_encoding));
    }
}
