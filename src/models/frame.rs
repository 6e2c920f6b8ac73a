//! Owned interleaved pixel rasters

use crate::error::{Result, ScanError};

/// Pixel layout of a [`Frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 1 byte per pixel luminance
    Gray,
    /// 3 bytes per pixel
    Rgb,
    /// 4 bytes per pixel, alpha ignored by every filter
    Rgba,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// Owned in-memory raster handed over by camera capture or file selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap a raw buffer, checking its length against the declared shape
    pub fn new(width: usize, height: usize, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let expected = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(format.channels()))
            .ok_or_else(|| ScanError::invalid_image("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(ScanError::invalid_image(format!(
                "expected {} bytes for {}x{} {:?}, received {}",
                expected,
                width,
                height,
                format,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// RGB frame from interleaved bytes
    pub fn from_rgb(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        Self::new(width, height, PixelFormat::Rgb, data)
    }

    /// RGBA frame from interleaved bytes
    pub fn from_rgba(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        Self::new(width, height, PixelFormat::Rgba, data)
    }

    /// Single-channel frame
    pub fn from_gray(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        Self::new(width, height, PixelFormat::Gray, data)
    }

    /// Solid-colour frame, mostly useful for tests and padding
    pub fn filled(width: usize, height: usize, format: PixelFormat, value: u8) -> Self {
        Self {
            width,
            height,
            format,
            data: vec![value; width * height * format.channels()],
        }
    }

    /// Frame width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel layout
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Bytes per pixel
    pub fn channels(&self) -> usize {
        self.format.channels()
    }

    /// Width * height
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// True when the frame holds no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Raw interleaved bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw bytes
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Take the raw buffer
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Channel values of pixel (x, y)
    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let c = self.channels();
        let idx = (y * self.width + x) * c;
        &self.data[idx..idx + c]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_short_buffer() {
        let err = Frame::from_rgb(4, 4, vec![0; 10]).unwrap_err();
        assert!(matches!(err, ScanError::InvalidImage { .. }));
    }

    #[test]
    fn test_pixel_access() {
        let frame = Frame::from_rgb(2, 1, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(frame.pixel(1, 0), &[4, 5, 6]);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.area(), 2);
    }
}
