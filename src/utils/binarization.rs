//! Local-mean thresholding for the black & white scan filter

use rayon::prelude::*;

/// Summed-area table with one row/column of zero padding
pub struct IntegralImage {
    width: usize,
    sums: Vec<u64>,
}

impl IntegralImage {
    /// Build the table for a `width x height` luminance plane
    pub fn new(gray: &[u8], width: usize, height: usize) -> Self {
        let stride = width + 1;
        let mut sums = vec![0u64; stride * (height + 1)];
        for y in 0..height {
            let mut row_sum = 0u64;
            for x in 0..width {
                row_sum += gray[y * width + x] as u64;
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row_sum;
            }
        }
        Self { width, sums }
    }

    /// Sum over the inclusive rectangle `[x0, x1] x [y0, y1]`
    pub fn sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> u64 {
        let stride = self.width + 1;
        let a = self.sums[y0 * stride + x0];
        let b = self.sums[y0 * stride + x1 + 1];
        let c = self.sums[(y1 + 1) * stride + x0];
        let d = self.sums[(y1 + 1) * stride + x1 + 1];
        d + a - b - c
    }
}

/// Adaptive mean threshold.
///
/// A pixel becomes white (255) when it is brighter than the mean of its
/// `block_size x block_size` neighbourhood minus `offset`, black (0)
/// otherwise. The window is clipped at the image border. Paper background
/// under a shadow still sits above its local mean, so it is pushed to white.
pub fn adaptive_threshold(
    gray: &[u8],
    width: usize,
    height: usize,
    block_size: usize,
    offset: i32,
) -> Vec<u8> {
    let mut out = vec![0u8; width * height];
    if width == 0 || height == 0 {
        return out;
    }
    let integral = IntegralImage::new(gray, width, height);
    let half = (block_size.max(3) | 1) / 2;

    out.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let y0 = y.saturating_sub(half);
        let y1 = (y + half).min(height - 1);
        for (x, px) in row.iter_mut().enumerate() {
            let x0 = x.saturating_sub(half);
            let x1 = (x + half).min(width - 1);
            let count = ((x1 - x0 + 1) * (y1 - y0 + 1)) as i64;
            let mean = integral.sum(x0, y0, x1, y1) as i64 / count;
            let value = gray[y * width + x] as i64;
            *px = if value > mean - offset as i64 { 255 } else { 0 };
        }
    });

    out
}
