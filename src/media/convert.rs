// SPDX-License-Identifier: GPL-3.0-only

//! Wire-format to display-format pixel conversion
//!
//! CPU conversion of captured frames into interleaved 8-bit targets.
//! YCbCr sources use BT.709 video-range coefficients (the HD SDI
//! convention) in 8.8 fixed point. The converter is a pure transform: a
//! rejected request leaves the target untouched, and nothing here retains
//! the input frame.

use crate::capture::types::{CapturedFrame, PixelEncoding};
use crate::errors::ConvertError;
use crate::media::texture::{TargetFormat, TextureTarget};

// BT.709 video range, scaled by 256
const Y_SCALE: i32 = 298; // 1.164
const R_CR: i32 = 459; // 1.793
const G_CB: i32 = 55; // 0.213
const G_CR: i32 = 136; // 0.533
const B_CB: i32 = 541; // 2.112

/// Convert one captured frame into the target surface
///
/// The target must already match the frame geometry; sizing it is the
/// caller's job. Unsupported encodings and geometry mismatches fail
/// before a single byte is written.
pub fn convert_frame(
    frame: &CapturedFrame,
    target: &mut TextureTarget,
) -> Result<(), ConvertError> {
    let frame_size = (frame.mode.width, frame.mode.height);
    let target_size = (target.width(), target.height());

    match frame.mode.encoding {
        PixelEncoding::Raw12 => Err(ConvertError::UnsupportedEncoding {
            encoding: frame.mode.encoding,
            target: target.format(),
        }),
        _ if frame_size != target_size => Err(ConvertError::GeometryMismatch {
            frame: frame_size,
            target: target_size,
        }),
        PixelEncoding::Uyvy8 => {
            uyvy_to_interleaved(frame, target);
            Ok(())
        }
        PixelEncoding::Yuv10 => {
            v210_to_interleaved(frame, target);
            Ok(())
        }
        PixelEncoding::Bgra8 => {
            bgra_to_interleaved(frame, target);
            Ok(())
        }
    }
}

/// Per-pixel chroma contributions for one Cb/Cr pair
#[inline]
fn chroma_terms(cb: i32, cr: i32) -> (i32, i32, i32) {
    (R_CR * cr, G_CB * cb + G_CR * cr, B_CB * cb)
}

#[inline]
fn store_px(luma: i32, terms: (i32, i32, i32), format: TargetFormat) -> [u8; 4] {
    let (r_add, g_sub, b_add) = terms;
    let y = (luma - 16) * Y_SCALE + 128;
    let r = ((y + r_add) >> 8).clamp(0, 255) as u8;
    let g = ((y - g_sub) >> 8).clamp(0, 255) as u8;
    let b = ((y + b_add) >> 8).clamp(0, 255) as u8;
    match format {
        TargetFormat::Bgra8 => [b, g, r, 255],
        TargetFormat::Rgba8 => [r, g, b, 255],
    }
}

fn uyvy_to_interleaved(frame: &CapturedFrame, target: &mut TextureTarget) {
    let src_row = frame.row_bytes();
    let dst_row = target.row_bytes();
    let format = target.format();

    let rows = frame
        .data()
        .chunks_exact(src_row)
        .zip(target.data_mut().chunks_exact_mut(dst_row));
    for (src, dst) in rows {
        let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(dst);
        for (group, out) in src.chunks_exact(4).zip(pixels.chunks_exact_mut(2)) {
            let cb = group[0] as i32 - 128;
            let cr = group[2] as i32 - 128;
            let terms = chroma_terms(cb, cr);
            out[0] = store_px(group[1] as i32, terms, format);
            out[1] = store_px(group[3] as i32, terms, format);
        }
    }
}

fn v210_to_interleaved(frame: &CapturedFrame, target: &mut TextureTarget) {
    let width = frame.mode.width as usize;
    let src_row = frame.row_bytes();
    let dst_row = target.row_bytes();
    let format = target.format();

    let rows = frame
        .data()
        .chunks_exact(src_row)
        .zip(target.data_mut().chunks_exact_mut(dst_row));
    for (src, dst) in rows {
        let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(dst);
        let mut x = 0;

        // Each 16-byte block packs six pixels as four little-endian words
        for block in src.chunks_exact(16) {
            if x >= width {
                break;
            }
            let word = |i: usize| {
                u32::from_le_bytes([block[i * 4], block[i * 4 + 1], block[i * 4 + 2], block[i * 4 + 3]])
            };
            // Drop the 10-bit fraction; the upper 8 bits carry video range
            let c8 = |v: u32| ((v & 0x3FF) >> 2) as i32;

            let (w0, w1, w2, w3) = (word(0), word(1), word(2), word(3));
            let lumas = [
                c8(w0 >> 10),
                c8(w1),
                c8(w1 >> 20),
                c8(w2 >> 10),
                c8(w3),
                c8(w3 >> 20),
            ];
            let chromas = [
                chroma_terms(c8(w0) - 128, c8(w0 >> 20) - 128),
                chroma_terms(c8(w1 >> 10) - 128, c8(w2) - 128),
                chroma_terms(c8(w2 >> 20) - 128, c8(w3 >> 10) - 128),
            ];

            for (i, luma) in lumas.into_iter().enumerate() {
                if x >= width {
                    break;
                }
                pixels[x] = store_px(luma, chromas[i / 2], format);
                x += 1;
            }
        }
    }
}

fn bgra_to_interleaved(frame: &CapturedFrame, target: &mut TextureTarget) {
    match target.format() {
        TargetFormat::Bgra8 => target.data_mut().copy_from_slice(frame.data()),
        TargetFormat::Rgba8 => {
            let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(target.data_mut());
            for (src, px) in frame.data().chunks_exact(4).zip(pixels.iter_mut()) {
                // Swap blue and red, keep source alpha
                *px = [src[2], src[1], src[0], src[3]];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::simulator::pattern::{self, BARS_RGB, TestPattern};
    use crate::capture::pool::FramePool;
    use crate::capture::types::{Framerate, SignalMode};
    use std::time::Instant;

    fn bars_frame(encoding: PixelEncoding, width: u32, height: u32) -> CapturedFrame {
        let mode = SignalMode::progressive(width, height, Framerate::from_int(30))
            .with_encoding(encoding);
        let pool = FramePool::new(mode.frame_bytes(), 1);
        let mut buffer = pool.acquire();
        pattern::fill_frame(TestPattern::Bars, &mode, buffer.as_mut_slice(), 0);
        CapturedFrame {
            mode,
            buffer,
            sequence: 1,
            pts_ns: 0,
            captured_at: Instant::now(),
        }
    }

    fn pixel(target: &TextureTarget, x: usize, y: usize) -> [u8; 4] {
        let offset = y * target.row_bytes() + x * 4;
        target.data()[offset..offset + 4].try_into().unwrap()
    }

    fn assert_close(actual: [u8; 4], expected: [u8; 4], context: &str) {
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!(
                a.abs_diff(*e) <= 3,
                "{}: got {:?}, expected {:?}",
                context,
                actual,
                expected
            );
        }
    }

    #[test]
    fn uyvy_bars_decode_to_bt709_rgb() {
        let frame = bars_frame(PixelEncoding::Uyvy8, 48, 4);
        let mut target = TextureTarget::new(TargetFormat::Rgba8, 48, 4);
        convert_frame(&frame, &mut target).expect("conversion succeeds");

        for (bar, &(r, g, b)) in BARS_RGB.iter().enumerate() {
            // Sample each bar at its center column
            let x = bar * 6 + 3;
            assert_close(pixel(&target, x, 2), [r, g, b, 255], &format!("bar {bar}"));
        }
    }

    #[test]
    fn v210_bars_decode_like_uyvy() {
        let uyvy = bars_frame(PixelEncoding::Uyvy8, 48, 2);
        let v210 = bars_frame(PixelEncoding::Yuv10, 48, 2);

        let mut from_uyvy = TextureTarget::new(TargetFormat::Bgra8, 48, 2);
        let mut from_v210 = TextureTarget::new(TargetFormat::Bgra8, 48, 2);
        convert_frame(&uyvy, &mut from_uyvy).expect("conversion succeeds");
        convert_frame(&v210, &mut from_v210).expect("conversion succeeds");

        assert_eq!(from_uyvy.data(), from_v210.data());
    }

    #[test]
    fn bgra_copies_straight_and_swizzles_to_rgba() {
        let frame = bars_frame(PixelEncoding::Bgra8, 48, 2);

        let mut straight = TextureTarget::new(TargetFormat::Bgra8, 48, 2);
        convert_frame(&frame, &mut straight).expect("conversion succeeds");
        assert_eq!(straight.data(), frame.data());

        let mut swizzled = TextureTarget::new(TargetFormat::Rgba8, 48, 2);
        convert_frame(&frame, &mut swizzled).expect("conversion succeeds");
        // White bar keeps its channels, the red bar swaps into place
        assert_eq!(pixel(&swizzled, 3, 0), [255, 255, 255, 255]);
        assert_eq!(pixel(&swizzled, 33, 0), [255, 0, 0, 255]);
    }

    #[test]
    fn raw12_is_rejected_before_writing() {
        let frame = bars_frame(PixelEncoding::Raw12, 48, 2);
        let mut target = TextureTarget::new(TargetFormat::Rgba8, 48, 2);
        target.data_mut().fill(0xAB);

        let err = convert_frame(&frame, &mut target).unwrap_err();
        assert_eq!(
            err,
            ConvertError::UnsupportedEncoding {
                encoding: PixelEncoding::Raw12,
                target: TargetFormat::Rgba8,
            }
        );
        assert!(target.data().iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn geometry_mismatch_is_rejected_before_writing() {
        let frame = bars_frame(PixelEncoding::Uyvy8, 48, 4);
        let mut target = TextureTarget::new(TargetFormat::Rgba8, 32, 4);
        target.data_mut().fill(0xAB);

        let err = convert_frame(&frame, &mut target).unwrap_err();
        assert_eq!(
            err,
            ConvertError::GeometryMismatch {
                frame: (48, 4),
                target: (32, 4),
            }
        );
        assert!(target.data().iter().all(|&b| b == 0xAB));
    }
}
