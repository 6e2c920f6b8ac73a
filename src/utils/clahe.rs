//! Contrast-limited adaptive histogram equalization.
//!
//! The plane is split into a `tiles x tiles` grid, every tile gets its own
//! clipped-histogram lookup table, and each pixel is mapped through a
//! bilinear blend of the four nearest tile tables so tile seams do not show.

use rayon::prelude::*;

/// Tiled equalization parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClaheParams {
    /// Tiles per axis
    pub tiles: usize,
    /// Histogram clip limit, relative to a flat histogram
    pub clip_limit: f32,
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self {
            tiles: 8,
            clip_limit: 2.0,
        }
    }
}

struct TileGrid {
    tile_w: usize,
    tile_h: usize,
    cols: usize,
    rows: usize,
}

impl TileGrid {
    fn new(width: usize, height: usize, tiles: usize) -> Self {
        let tiles = tiles.max(1);
        let tile_w = width.div_ceil(tiles).max(1);
        let tile_h = height.div_ceil(tiles).max(1);
        Self {
            tile_w,
            tile_h,
            cols: width.div_ceil(tile_w),
            rows: height.div_ceil(tile_h),
        }
    }

    /// Lower tile index and blend weight along one axis
    fn locate(pos: usize, tile: usize, count: usize) -> (usize, usize, f32) {
        let t = (pos as f32 + 0.5) / tile as f32 - 0.5;
        if t <= 0.0 {
            return (0, 0, 0.0);
        }
        let t0 = (t.floor() as usize).min(count - 1);
        let t1 = (t0 + 1).min(count - 1);
        let weight = if t1 == t0 { 0.0 } else { t - t0 as f32 };
        (t0, t1, weight)
    }
}

fn tile_lut(
    gray: &[u8],
    width: usize,
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
    clip_limit: f32,
) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for &v in &gray[y * width + x0..y * width + x1] {
            hist[v as usize] += 1;
        }
    }
    let total = ((x1 - x0) * (y1 - y0)) as u32;

    if clip_limit > 0.0 {
        let limit = ((clip_limit * total as f32 / 256.0) as u32).max(1);
        let mut excess = 0u32;
        for bin in hist.iter_mut() {
            if *bin > limit {
                excess += *bin - limit;
                *bin = limit;
            }
        }
        let batch = excess / 256;
        let residual = (excess % 256) as usize;
        for bin in hist.iter_mut() {
            *bin += batch;
        }
        if residual > 0 {
            let step = (256 / residual).max(1);
            for bin in hist.iter_mut().step_by(step).take(residual) {
                *bin += 1;
            }
        }
    }

    let mut lut = [0u8; 256];
    let scale = 255.0 / total.max(1) as f32;
    let mut cdf = 0u32;
    for (value, &count) in hist.iter().enumerate() {
        cdf += count;
        lut[value] = (cdf as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Equalize a luminance plane tile by tile
pub fn clahe(gray: &[u8], width: usize, height: usize, params: ClaheParams) -> Vec<u8> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let grid = TileGrid::new(width, height, params.tiles);

    let luts: Vec<[u8; 256]> = (0..grid.rows * grid.cols)
        .into_par_iter()
        .map(|i| {
            let (tx, ty) = (i % grid.cols, i / grid.cols);
            let x0 = tx * grid.tile_w;
            let y0 = ty * grid.tile_h;
            let x1 = (x0 + grid.tile_w).min(width);
            let y1 = (y0 + grid.tile_h).min(height);
            tile_lut(gray, width, x0, y0, x1, y1, params.clip_limit)
        })
        .collect();

    let mut out = vec![0u8; width * height];
    out.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let (ty0, ty1, wy) = TileGrid::locate(y, grid.tile_h, grid.rows);
        for (x, px) in row.iter_mut().enumerate() {
            let (tx0, tx1, wx) = TileGrid::locate(x, grid.tile_w, grid.cols);
            let v = gray[y * width + x] as usize;
            let tl = luts[ty0 * grid.cols + tx0][v] as f32;
            let tr = luts[ty0 * grid.cols + tx1][v] as f32;
            let bl = luts[ty1 * grid.cols + tx0][v] as f32;
            let br = luts[ty1 * grid.cols + tx1][v] as f32;
            let top = tl + (tr - tl) * wx;
            let bottom = bl + (br - bl) * wx;
            *px = (top + (bottom - top) * wy).round().clamp(0.0, 255.0) as u8;
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_shape() {
        let gray = vec![100u8; 37 * 23];
        let out = clahe(&gray, 37, 23, ClaheParams::default());
        assert_eq!(out.len(), gray.len());
    }

    #[test]
    fn test_preserves_ordering() {
        // Equalization is monotonic within a tile
        let width = 64;
        let height = 64;
        let gray: Vec<u8> = (0..width * height).map(|i| ((i % width) * 2) as u8).collect();
        let out = clahe(&gray, width, height, ClaheParams { tiles: 1, clip_limit: 2.0 });
        for x in 1..width {
            assert!(out[x] >= out[x - 1]);
        }
    }

    #[test]
    fn test_stretches_low_contrast() {
        let width = 64;
        let height = 64;
        let gray: Vec<u8> = (0..width * height)
            .map(|i| if (i % width) < 32 { 100 } else { 110 })
            .collect();
        let out = clahe(&gray, width, height, ClaheParams { tiles: 1, clip_limit: 0.0 });
        let spread = out[width - 1] as i32 - out[0] as i32;
        assert!(spread > 10, "contrast should grow, got {spread}");
    }
}
