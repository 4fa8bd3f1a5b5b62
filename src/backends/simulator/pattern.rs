// SPDX-License-Identifier: GPL-3.0-only

//! Test pattern generation in SDI wire encodings
//!
//! Fills pooled frame buffers with synthetic signal content: 100% color
//! bars or a scrolling luma gradient, in any encoding a simulated card
//! claims to deliver. Bar colors are Rec.709 video range (Y 16-235,
//! chroma 16-240), the convention HD SDI sources actually use, so frames
//! survive conversion with the expected RGB values.

use serde::{Deserialize, Serialize};

use crate::capture::types::{PixelEncoding, SignalMode};

/// Synthetic signal content for simulated cards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestPattern {
    /// Static 100% color bars, eight vertical stripes
    #[default]
    Bars,
    /// Horizontal luma ramp scrolling one pixel per frame
    Gradient,
}

impl std::fmt::Display for TestPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestPattern::Bars => write!(f, "bars"),
            TestPattern::Gradient => write!(f, "gradient"),
        }
    }
}

impl std::str::FromStr for TestPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bars" => Ok(TestPattern::Bars),
            "gradient" => Ok(TestPattern::Gradient),
            other => Err(format!("unknown test pattern '{}'", other)),
        }
    }
}

/// 100% bars in Rec.709 video range, left to right:
/// white, yellow, cyan, green, magenta, red, blue, black
const BARS_YCBCR: [(u8, u8, u8); 8] = [
    (235, 128, 128),
    (219, 16, 138),
    (188, 154, 16),
    (173, 42, 26),
    (78, 214, 230),
    (63, 102, 240),
    (32, 240, 118),
    (16, 128, 128),
];

/// The same bars as full-swing RGB
pub(crate) const BARS_RGB: [(u8, u8, u8); 8] = [
    (255, 255, 255),
    (255, 255, 0),
    (0, 255, 255),
    (0, 255, 0),
    (255, 0, 255),
    (255, 0, 0),
    (0, 0, 255),
    (0, 0, 0),
];

/// Fill a frame buffer with pattern content for one frame interval
///
/// `data` must be at least [`SignalMode::frame_bytes`] long; padding bytes
/// beyond the packed pixels stay zero.
pub fn fill_frame(pattern: TestPattern, mode: &SignalMode, data: &mut [u8], frame_index: u64) {
    match (pattern, mode.encoding) {
        (TestPattern::Bars, PixelEncoding::Uyvy8) => fill_uyvy_bars(data, mode.width, mode.height),
        (TestPattern::Gradient, PixelEncoding::Uyvy8) => {
            fill_uyvy_gradient(data, mode.width, mode.height, frame_index)
        }
        (TestPattern::Bars, PixelEncoding::Yuv10) => fill_v210_bars(data, mode.width, mode.height),
        (TestPattern::Gradient, PixelEncoding::Yuv10) => {
            fill_v210_gradient(data, mode.width, mode.height, frame_index)
        }
        (TestPattern::Bars, PixelEncoding::Bgra8) => fill_bgra_bars(data, mode.width, mode.height),
        (TestPattern::Gradient, PixelEncoding::Bgra8) => {
            fill_bgra_gradient(data, mode.width, mode.height, frame_index)
        }
        // RAW content is only meaningful to offline tooling; a byte ramp
        // keeps every frame distinct without pretending to be a sensor
        (_, PixelEncoding::Raw12) => fill_raw_ramp(data, frame_index),
    }
}

fn bar_at(x: u32, width: u32) -> (u8, u8, u8) {
    BARS_YCBCR[(x as usize * BARS_YCBCR.len()) / width as usize]
}

fn gradient_at(x: u32, width: u32, frame_index: u64) -> u8 {
    let shifted = (x as u64 + frame_index) % width as u64;
    16 + (shifted * 219 / width as u64) as u8
}

fn fill_uyvy_bars(data: &mut [u8], width: u32, height: u32) {
    let row_bytes = width as usize * 2;
    for row in data.chunks_exact_mut(row_bytes).take(height as usize) {
        for (pair, px) in row.chunks_exact_mut(4).enumerate() {
            let (y, cb, cr) = bar_at(pair as u32 * 2, width);
            px[0] = cb;
            px[1] = y;
            px[2] = cr;
            px[3] = y;
        }
    }
}

fn fill_uyvy_gradient(data: &mut [u8], width: u32, height: u32, frame_index: u64) {
    let row_bytes = width as usize * 2;
    for row in data.chunks_exact_mut(row_bytes).take(height as usize) {
        for (pair, px) in row.chunks_exact_mut(4).enumerate() {
            let x = pair as u32 * 2;
            px[0] = 128;
            px[1] = gradient_at(x, width, frame_index);
            px[2] = 128;
            px[3] = gradient_at(x + 1, width, frame_index);
        }
    }
}

/// Pack one row of 8-bit Y'CbCr samples as v210
///
/// Six pixels become four little-endian 32-bit words of three 10-bit
/// components each; sample values are 8-bit left-shifted into the 10-bit
/// range. Trailing words of the final 128-byte block stay zero.
fn pack_v210_row(row: &mut [u8], width: u32, sample: impl Fn(u32) -> (u8, u8, u8)) {
    let clamped = |x: u32| sample(x.min(width - 1));
    let wide = |v: u8| (v as u32) << 2;

    let mut word_off = 0;
    let mut x = 0;
    while x < width {
        let (y0, cb0, cr0) = clamped(x);
        let (y1, _, _) = clamped(x + 1);
        let (y2, cb1, cr1) = clamped(x + 2);
        let (y3, _, _) = clamped(x + 3);
        let (y4, cb2, cr2) = clamped(x + 4);
        let (y5, _, _) = clamped(x + 5);

        let words = [
            wide(cb0) | wide(y0) << 10 | wide(cr0) << 20,
            wide(y1) | wide(cb1) << 10 | wide(y2) << 20,
            wide(cr1) | wide(y3) << 10 | wide(cb2) << 20,
            wide(y4) | wide(cr2) << 10 | wide(y5) << 20,
        ];
        for word in words {
            row[word_off..word_off + 4].copy_from_slice(&word.to_le_bytes());
            word_off += 4;
        }
        x += 6;
    }
}

fn fill_v210_bars(data: &mut [u8], width: u32, height: u32) {
    let row_bytes = PixelEncoding::Yuv10.row_bytes(width);
    for row in data.chunks_exact_mut(row_bytes).take(height as usize) {
        pack_v210_row(row, width, |x| bar_at(x, width));
    }
}

fn fill_v210_gradient(data: &mut [u8], width: u32, height: u32, frame_index: u64) {
    let row_bytes = PixelEncoding::Yuv10.row_bytes(width);
    for row in data.chunks_exact_mut(row_bytes).take(height as usize) {
        pack_v210_row(row, width, |x| (gradient_at(x, width, frame_index), 128, 128));
    }
}

fn fill_bgra_bars(data: &mut [u8], width: u32, height: u32) {
    let row_bytes = width as usize * 4;
    for row in data.chunks_exact_mut(row_bytes).take(height as usize) {
        let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(row);
        for (x, px) in pixels.iter_mut().enumerate() {
            let (r, g, b) = BARS_RGB[(x * BARS_RGB.len()) / width as usize];
            *px = [b, g, r, 255];
        }
    }
}

fn fill_bgra_gradient(data: &mut [u8], width: u32, height: u32, frame_index: u64) {
    let row_bytes = width as usize * 4;
    for row in data.chunks_exact_mut(row_bytes).take(height as usize) {
        let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(row);
        for (x, px) in pixels.iter_mut().enumerate() {
            let level = gradient_at(x as u32, width, frame_index);
            *px = [level, level, level, 255];
        }
    }
}

fn fill_raw_ramp(data: &mut [u8], frame_index: u64) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte = (i as u64 + frame_index) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::types::Framerate;

    fn mode(encoding: PixelEncoding) -> SignalMode {
        SignalMode::progressive(48, 2, Framerate::from_int(30)).with_encoding(encoding)
    }

    #[test]
    fn uyvy_bars_start_white_and_end_black() {
        let mode = mode(PixelEncoding::Uyvy8);
        let mut data = vec![0u8; mode.frame_bytes()];
        fill_frame(TestPattern::Bars, &mode, &mut data, 0);

        // First pair: U Y V Y of reference white
        assert_eq!(&data[0..4], &[128, 235, 128, 235]);
        // Last pair of the first row: black
        let row = mode.row_bytes();
        assert_eq!(&data[row - 4..row], &[128, 16, 128, 16]);
    }

    #[test]
    fn v210_first_word_packs_white() {
        let mode = mode(PixelEncoding::Yuv10);
        let mut data = vec![0u8; mode.frame_bytes()];
        fill_frame(TestPattern::Bars, &mode, &mut data, 0);

        let word = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        assert_eq!(word & 0x3FF, 128 << 2, "Cb0");
        assert_eq!((word >> 10) & 0x3FF, 235 << 2, "Y0");
        assert_eq!((word >> 20) & 0x3FF, 128 << 2, "Cr0");
    }

    #[test]
    fn gradient_scrolls_with_the_frame_index() {
        let mode = mode(PixelEncoding::Uyvy8);
        let mut first = vec![0u8; mode.frame_bytes()];
        let mut second = vec![0u8; mode.frame_bytes()];
        fill_frame(TestPattern::Gradient, &mode, &mut first, 0);
        fill_frame(TestPattern::Gradient, &mode, &mut second, 1);

        assert_ne!(first, second);
        // Frame 1 shifted one pixel: luma at x matches frame 0 at x+1
        assert_eq!(second[1], first[3]);
    }

    #[test]
    fn bgra_bars_carry_opaque_alpha() {
        let mode = mode(PixelEncoding::Bgra8);
        let mut data = vec![0u8; mode.frame_bytes()];
        fill_frame(TestPattern::Bars, &mode, &mut data, 0);

        assert_eq!(&data[0..4], &[255, 255, 255, 255]);
        assert!(data.chunks_exact(4).all(|px| px[3] == 255));
    }
}
