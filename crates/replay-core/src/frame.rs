//! Frame buffer types for video frames in CPU memory.
//!
//! Frames are packed top-down with no row padding, so the byte size of a
//! frame is fully determined by its [`ImageDescriptor`]. This keeps every
//! slot of the delay buffer the same size and lets a push be a single copy.

use crate::error::{ReplayError, Result};
use serde::{Deserialize, Serialize};

/// Pixel layout of a frame. Acts as the compatibility key between descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGB, 24 bits per pixel
    #[default]
    Rgb24,
    /// 8-bit RGB plus padding byte, 32 bits per pixel
    Rgb32,
    /// 8-bit grayscale
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb24 => 3,
            Self::Rgb32 => 4,
            Self::Gray8 => 1,
        }
    }

    /// Calculate total bytes needed for a frame of this format.
    pub fn frame_size(self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.bytes_per_pixel()
    }

    /// True for formats carrying color information.
    pub fn is_color(self) -> bool {
        !matches!(self, Self::Gray8)
    }
}

/// Describes the geometry and layout of the frames flowing through the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageDescriptor {
    /// Pixel layout
    pub format: PixelFormat,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Bytes per frame
    pub buffer_size: usize,
}

impl ImageDescriptor {
    /// Create a descriptor, computing the buffer size from the format.
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
            buffer_size: format.frame_size(width, height),
        }
    }

    /// Bytes needed to store one frame.
    #[inline]
    pub fn bytes_per_frame(&self) -> usize {
        self.buffer_size
    }

    /// Bytes per row of pixels.
    #[inline]
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// A descriptor with zero area cannot back any buffer.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.buffer_size > 0
    }

    /// Two descriptors are compatible only if dimensions and layout match exactly.
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.format == other.format
    }
}

/// A video frame in CPU memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    descriptor: ImageDescriptor,
    data: Vec<u8>,
}

impl Frame {
    /// Create a zeroed frame for the given descriptor.
    pub fn new(descriptor: ImageDescriptor) -> Self {
        Self {
            descriptor,
            data: vec![0u8; descriptor.bytes_per_frame()],
        }
    }

    /// Create a zeroed frame, reporting allocation failure instead of aborting.
    pub fn try_new(descriptor: ImageDescriptor) -> Result<Self> {
        let size = descriptor.bytes_per_frame();
        let mut data = Vec::new();
        data.try_reserve_exact(size).map_err(|e| {
            ReplayError::OutOfMemory(format!("Failed to allocate {} bytes: {}", size, e))
        })?;
        data.resize(size, 0);
        Ok(Self { descriptor, data })
    }

    /// Wrap existing pixel data. The length must match the descriptor.
    pub fn from_data(descriptor: ImageDescriptor, data: Vec<u8>) -> Result<Self> {
        if data.len() != descriptor.bytes_per_frame() {
            return Err(ReplayError::FormatMismatch(format!(
                "Expected {} bytes for {}x{} {:?}, got {}",
                descriptor.bytes_per_frame(),
                descriptor.width,
                descriptor.height,
                descriptor.format,
                data.len()
            )));
        }
        Ok(Self { descriptor, data })
    }

    #[inline]
    pub fn descriptor(&self) -> &ImageDescriptor {
        &self.descriptor
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.descriptor.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.descriptor.height
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.descriptor.format
    }

    /// Raw pixel data.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Raw pixel data, mutable.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Total memory usage of this frame in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len()
    }

    /// Get a row of pixel data.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.descriptor.stride();
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    /// Get a mutable row of pixel data.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.descriptor.stride();
        let start = y as usize * stride;
        &mut self.data[start..start + stride]
    }

    /// Copy the pixels of `other` into this frame without reallocating.
    ///
    /// Fails if the two frames are not compatible.
    pub fn copy_from(&mut self, other: &Frame) -> Result<()> {
        if !self.descriptor.is_compatible(&other.descriptor) || self.data.len() != other.data.len()
        {
            return Err(ReplayError::FormatMismatch(format!(
                "Cannot copy {}x{} {:?} into {}x{} {:?}",
                other.width(),
                other.height(),
                other.format(),
                self.width(),
                self.height(),
                self.format()
            )));
        }
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    /// Set every byte of the frame to `value`.
    pub fn fill(&mut self, value: u8) {
        self.data.fill(value);
    }

    /// Create a test pattern frame (color bars).
    pub fn test_pattern(descriptor: ImageDescriptor) -> Self {
        let mut frame = Self::new(descriptor);
        let bpp = descriptor.format.bytes_per_pixel();
        let width = descriptor.width.max(1);

        let colors: [[u8; 4]; 8] = [
            [255, 255, 255, 255], // White
            [255, 255, 0, 255],   // Yellow
            [0, 255, 255, 255],   // Cyan
            [0, 255, 0, 255],     // Green
            [255, 0, 255, 255],   // Magenta
            [255, 0, 0, 255],     // Red
            [0, 0, 255, 255],     // Blue
            [0, 0, 0, 255],       // Black
        ];

        for y in 0..descriptor.height {
            let row = frame.row_mut(y);
            for x in 0..descriptor.width {
                let bar = (x * 8 / width) as usize;
                let color = colors[bar];
                let i = x as usize * bpp;
                match descriptor.format {
                    PixelFormat::Gray8 => {
                        row[i] = ((color[0] as u16 + color[1] as u16 + color[2] as u16) / 3) as u8
                    }
                    _ => row[i..i + bpp].copy_from_slice(&color[..bpp]),
                }
            }
        }

        frame
    }
}
