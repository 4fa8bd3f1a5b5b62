// SPDX-License-Identifier: GPL-3.0-only

//! Host-owned pixel targets for converted frames
//!
//! The host allocates a [`TextureTarget`] sized to the current video
//! format and hands it to the converter each tick. Nothing here touches
//! the GPU; the target is plain interleaved 8-bit memory the host uploads
//! however it likes.

/// Interleaved 8-bit output layouts the converter can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    /// Blue, green, red, alpha byte order
    Bgra8,
    /// Red, green, blue, alpha byte order
    Rgba8,
}

impl TargetFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TargetFormat::Bgra8 | TargetFormat::Rgba8 => 4,
        }
    }
}

impl std::fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetFormat::Bgra8 => write!(f, "BGRA8"),
            TargetFormat::Rgba8 => write!(f, "RGBA8"),
        }
    }
}

/// A CPU-side pixel surface owned by the consumer
#[derive(Debug, Clone)]
pub struct TextureTarget {
    format: TargetFormat,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl TextureTarget {
    pub fn new(format: TargetFormat, width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * format.bytes_per_pixel();
        Self {
            format,
            width,
            height,
            data: vec![0u8; len],
        }
    }

    /// Reshape for a new video format, reallocating only on a size change
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        self.data
            .resize(width as usize * height as usize * self.format.bytes_per_pixel(), 0);
    }

    pub fn format(&self) -> TargetFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}
