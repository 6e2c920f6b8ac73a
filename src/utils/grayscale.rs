//! Luminance conversion for interleaved RGB / RGBA rasters
//! Y = 0.299*R + 0.587*G + 0.114*B
//! Uses fast integer arithmetic: Y = (76*R + 150*G + 29*B) >> 8

use rayon::prelude::*;

use crate::models::{Frame, PixelFormat};

/// Coefficients for grayscale conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

/// Rows below this are converted on the calling thread
const PARALLEL_MIN_PIXELS: usize = 64 * 1024;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((COEF_R * r as u32 + COEF_G * g as u32 + COEF_B * b as u32) >> 8).min(255) as u8
}

fn convert_rows(src: &[u8], width: usize, height: usize, channels: usize) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    if width == 0 || height == 0 {
        return gray;
    }
    let row = |(y, out): (usize, &mut [u8])| {
        let start = y * width * channels;
        for (x, px) in out.iter_mut().enumerate() {
            let idx = start + x * channels;
            *px = luma(src[idx], src[idx + 1], src[idx + 2]);
        }
    };

    if width * height >= PARALLEL_MIN_PIXELS {
        gray.par_chunks_mut(width).enumerate().for_each(row);
    } else {
        gray.chunks_mut(width).enumerate().for_each(row);
    }
    gray
}

/// Convert RGB image to grayscale
pub fn rgb_to_grayscale(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    convert_rows(rgb, width, height, 3)
}

/// Convert RGBA image to grayscale (ignores alpha channel)
pub fn rgba_to_grayscale(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    convert_rows(rgba, width, height, 4)
}

/// Luminance plane of any frame; gray frames are copied as-is
pub fn frame_to_grayscale(frame: &Frame) -> Vec<u8> {
    match frame.format() {
        PixelFormat::Gray => frame.as_bytes().to_vec(),
        PixelFormat::Rgb => rgb_to_grayscale(frame.as_bytes(), frame.width(), frame.height()),
        PixelFormat::Rgba => rgba_to_grayscale(frame.as_bytes(), frame.width(), frame.height()),
    }
}

/// Expand a luminance plane back into the layout of `like`.
///
/// Alpha, when present, is copied from the template frame.
pub fn grayscale_to_format(gray: &[u8], like: &Frame) -> Vec<u8> {
    match like.format() {
        PixelFormat::Gray => gray.to_vec(),
        PixelFormat::Rgb => gray.iter().flat_map(|&v| [v, v, v]).collect(),
        PixelFormat::Rgba => gray
            .iter()
            .zip(like.as_bytes().chunks_exact(4))
            .flat_map(|(&v, px)| [v, v, v, px[3]])
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_grayscale() {
        // Pure white
        let gray = rgb_to_grayscale(&[255, 255, 255], 1, 1);
        assert!(gray[0] >= 254);

        // Pure black
        let gray = rgb_to_grayscale(&[0, 0, 0], 1, 1);
        assert_eq!(gray[0], 0);

        // Pure green dominates luminance
        let green = rgb_to_grayscale(&[0, 255, 0], 1, 1);
        let red = rgb_to_grayscale(&[255, 0, 0], 1, 1);
        assert!(green[0] > red[0]);

        let img = vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
        assert_eq!(rgb_to_grayscale(&img, 2, 2).len(), 4);
    }

    #[test]
    fn test_parallel_matches_small_path() {
        let width = 300;
        let height = 300;
        let rgb: Vec<u8> = (0..width * height * 3).map(|i| (i % 251) as u8).collect();
        let gray = rgb_to_grayscale(&rgb, width, height);
        for (i, &v) in gray.iter().enumerate().step_by(997) {
            assert_eq!(v, luma(rgb[i * 3], rgb[i * 3 + 1], rgb[i * 3 + 2]));
        }
    }

    #[test]
    fn test_rgba_keeps_alpha_on_expand() {
        let frame = Frame::from_rgba(1, 1, vec![255, 128, 64, 17]).unwrap();
        let gray = frame_to_grayscale(&frame);
        let back = grayscale_to_format(&gray, &frame);
        assert_eq!(back.len(), 4);
        assert_eq!(back[3], 17);
        assert_eq!(back[0], back[1]);
    }
}
