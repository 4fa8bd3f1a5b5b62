// SPDX-License-Identifier: GPL-3.0-only

//! Bindings to the DeckLink capture shim
//!
//! The shim is a thin C wrapper over the vendor SDK: it owns the SDK
//! session and the last completed frame, and exposes a polled, handle-free
//! surface. One capture runs per device index; frame memory returned by
//! the shim stays valid only until the next poll on that capture.

use std::ffi::c_char;

use crate::capture::types::{PixelEncoding, SignalMode};
use crate::errors::{CaptureError, CaptureResult};

// ===== Shim Status Codes =====

/// Capture opened and running
const DL_OK: i32 = 0;
/// No device at the requested index
const DL_ERR_NOT_FOUND: i32 = 1;
/// Device already opened by this or another process
const DL_ERR_BUSY: i32 = 2;
/// The device rejected the requested display mode or pixel format
const DL_ERR_MODE: i32 = 3;

unsafe extern "C" {
    fn decklink_capture_device_count() -> i32;
    fn decklink_capture_device_name(index: i32, out: *mut c_char, out_len: i32) -> bool;
    fn decklink_capture_open(
        index: i32,
        width: i32,
        height: i32,
        fps_num: i32,
        fps_denom: i32,
        pixel_format: u32,
        interlaced: bool,
    ) -> i32;
    fn decklink_capture_get_frame(index: i32, out: *mut RawCaptureFrame) -> bool;
    fn decklink_capture_close(index: i32);
}

/// One completed frame as the shim reports it
///
/// `data` points into shim-owned memory and is invalidated by the next
/// `decklink_capture_get_frame` call on the same capture.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(super) struct RawCaptureFrame {
    pub data: *const u8,
    pub width: i32,
    pub height: i32,
    pub row_bytes: i32,
    /// Hardware reference clock at frame completion
    pub hardware_time_ns: u64,
    /// The input carried no signal for this frame interval
    pub no_signal: bool,
}

impl Default for RawCaptureFrame {
    fn default() -> Self {
        Self {
            data: std::ptr::null(),
            width: 0,
            height: 0,
            row_bytes: 0,
            hardware_time_ns: 0,
            no_signal: false,
        }
    }
}

/// What one poll of the shim produced
pub(super) enum Polled {
    /// A completed frame; borrow expires at the next poll
    Frame(RawCaptureFrame),
    /// The input carried no signal for one frame interval
    NoSignal(u64),
    /// Nothing new since the last poll
    Pending,
}

/// The SDK pixel format code for an encoding
fn pixel_format_code(encoding: PixelEncoding) -> u32 {
    let fourcc: &[u8; 4] = match encoding {
        PixelEncoding::Uyvy8 => b"2vuy",
        PixelEncoding::Yuv10 => b"v210",
        PixelEncoding::Bgra8 => b"BGRA",
        PixelEncoding::Raw12 => b"R12L",
    };
    u32::from_be_bytes(*fourcc)
}

/// Whether the Desktop Video driver answered the shim at all
///
/// The shim reports a negative device count when the SDK session cannot
/// initialize.
pub(super) fn driver_present() -> bool {
    unsafe { decklink_capture_device_count() } >= 0
}

pub(super) fn device_count() -> usize {
    let count = unsafe { decklink_capture_device_count() };
    count.max(0) as usize
}

pub(super) fn device_name(index: u32) -> Option<String> {
    let mut buf = [0u8; 64];
    let ok = unsafe {
        decklink_capture_device_name(index as i32, buf.as_mut_ptr() as *mut c_char, buf.len() as i32)
    };
    if !ok {
        return None;
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Some(String::from_utf8_lossy(&buf[..len]).to_string())
}

/// Why an open attempt was refused, mapped onto the error taxonomy by
/// the caller, which knows the device id
pub(super) enum OpenRefused {
    NotFound,
    Busy,
    ModeRejected,
    Failed(i32),
}

/// A running capture on one device index, closed on drop
pub(super) struct CaptureHandle {
    index: u32,
    open: bool,
}

impl CaptureHandle {
    pub fn open(index: u32, mode: &SignalMode) -> Result<Self, OpenRefused> {
        let status = unsafe {
            decklink_capture_open(
                index as i32,
                mode.width as i32,
                mode.height as i32,
                mode.fps.num as i32,
                mode.fps.denom as i32,
                pixel_format_code(mode.encoding),
                mode.interlaced,
            )
        };
        match status {
            DL_OK => Ok(Self { index, open: true }),
            DL_ERR_NOT_FOUND => Err(OpenRefused::NotFound),
            DL_ERR_BUSY => Err(OpenRefused::Busy),
            DL_ERR_MODE => Err(OpenRefused::ModeRejected),
            other => Err(OpenRefused::Failed(other)),
        }
    }

    /// Poll for the next completed frame; never blocks
    pub fn poll(&mut self) -> CaptureResult<Polled> {
        if !self.open {
            return Err(CaptureError::HardwareError("capture is closed".into()));
        }

        let mut raw = RawCaptureFrame::default();
        let ok = unsafe { decklink_capture_get_frame(self.index as i32, &mut raw) };
        if !ok {
            return Ok(Polled::Pending);
        }
        if raw.no_signal {
            return Ok(Polled::NoSignal(raw.hardware_time_ns));
        }
        if raw.data.is_null() || raw.width <= 0 || raw.height <= 0 || raw.row_bytes <= 0 {
            return Err(CaptureError::HardwareError(
                "driver returned an invalid frame".into(),
            ));
        }
        Ok(Polled::Frame(raw))
    }

    pub fn close(&mut self) {
        if self.open {
            unsafe { decklink_capture_close(self.index as i32) };
            self.open = false;
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.close();
    }
}
