//! Convolution and morphology helpers shared by detection and enhancement

use rayon::prelude::*;

use crate::models::BitMatrix;

/// 1-D Gaussian weights for an odd kernel size.
///
/// A non-positive `sigma` derives one from the size the same way common
/// vision libraries do: `0.3 * ((ksize - 1) * 0.5 - 1) + 0.8`.
pub fn gaussian_kernel(ksize: usize, sigma: f32) -> Vec<f32> {
    let ksize = ksize.max(1) | 1;
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
    };
    let half = (ksize / 2) as i32;
    let mut kernel: Vec<f32> = (-half..=half)
        .map(|i| (-(i * i) as f32 / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= sum);
    kernel
}

#[inline]
fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

/// Separable Gaussian blur of a single-channel plane with replicated borders
pub fn gaussian_blur(gray: &[u8], width: usize, height: usize, ksize: usize) -> Vec<u8> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let kernel = gaussian_kernel(ksize, 0.0);
    let half = (kernel.len() / 2) as isize;

    let mut horizontal = vec![0f32; width * height];
    horizontal
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let src = &gray[y * width..(y + 1) * width];
            for (x, out) in row.iter_mut().enumerate() {
                let mut acc = 0.0;
                for (k, w) in kernel.iter().enumerate() {
                    let sx = clamp_index(x as isize + k as isize - half, width);
                    acc += src[sx] as f32 * w;
                }
                *out = acc;
            }
        });

    let mut out = vec![0u8; width * height];
    out.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for (x, px) in row.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (k, w) in kernel.iter().enumerate() {
                let sy = clamp_index(y as isize + k as isize - half, height);
                acc += horizontal[sy * width + x] * w;
            }
            *px = acc.round().clamp(0.0, 255.0) as u8;
        }
    });
    out
}

/// Apply a 3x3 kernel to every colour channel of an interleaved raster.
///
/// Channel index `skip_channel` (alpha) is copied unchanged.
pub fn convolve3x3(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    kernel: &[[f32; 3]; 3],
    skip_channel: Option<usize>,
) -> Vec<u8> {
    let mut out = vec![0u8; data.len()];
    if width == 0 || height == 0 {
        return out;
    }
    let stride = width * channels;
    out.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
        for x in 0..width {
            for c in 0..channels {
                let idx = x * channels + c;
                if Some(c) == skip_channel {
                    row[idx] = data[y * stride + idx];
                    continue;
                }
                let mut acc = 0.0f32;
                for (ky, krow) in kernel.iter().enumerate() {
                    let sy = clamp_index(y as isize + ky as isize - 1, height);
                    for (kx, w) in krow.iter().enumerate() {
                        if *w == 0.0 {
                            continue;
                        }
                        let sx = clamp_index(x as isize + kx as isize - 1, width);
                        acc += data[sy * stride + sx * channels + c] as f32 * w;
                    }
                }
                row[idx] = acc.round().clamp(0.0, 255.0) as u8;
            }
        }
    });
    out
}

/// Binary dilation with a square `size x size` structuring element
pub fn dilate(mask: &BitMatrix, size: usize) -> BitMatrix {
    let width = mask.width();
    let height = mask.height();
    let half = (size.max(1) / 2) as i32;
    let mut out = BitMatrix::new(width, height);
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            if !mask.get_signed(x, y) {
                continue;
            }
            for dy in -half..=half {
                for dx in -half..=half {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx >= 0 && ny >= 0 {
                        out.set(nx as usize, ny as usize, true);
                    }
                }
            }
        }
    }
    out
}
