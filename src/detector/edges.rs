//! Dual-threshold hysteresis edge detection on a luminance plane

use rayon::prelude::*;

use crate::models::BitMatrix;

/// tan(22.5 deg) and tan(67.5 deg) for gradient direction binning
const TAN_22_5: f32 = 0.414_213_57;
const TAN_67_5: f32 = 2.414_213_6;

/// Sobel gradients, replicated borders
fn sobel(gray: &[u8], width: usize, height: usize) -> (Vec<i32>, Vec<i32>) {
    let at = |x: isize, y: isize| -> i32 {
        let x = x.clamp(0, width as isize - 1) as usize;
        let y = y.clamp(0, height as isize - 1) as usize;
        gray[y * width + x] as i32
    };
    let mut gx = vec![0i32; width * height];
    let mut gy = vec![0i32; width * height];
    gx.par_chunks_mut(width)
        .zip(gy.par_chunks_mut(width))
        .enumerate()
        .for_each(|(y, (row_x, row_y))| {
            let y = y as isize;
            for x in 0..width {
                let xi = x as isize;
                let tl = at(xi - 1, y - 1);
                let t = at(xi, y - 1);
                let tr = at(xi + 1, y - 1);
                let l = at(xi - 1, y);
                let r = at(xi + 1, y);
                let bl = at(xi - 1, y + 1);
                let b = at(xi, y + 1);
                let br = at(xi + 1, y + 1);
                row_x[x] = (tr + 2 * r + br) - (tl + 2 * l + bl);
                row_y[x] = (bl + 2 * b + br) - (tl + 2 * t + tr);
            }
        });
    (gx, gy)
}

/// Canny edge map.
///
/// Gradient magnitude is the L1 norm `|gx| + |gy|` of the 3x3 Sobel
/// response. Pixels above `high` seed edges; pixels above `low` are kept
/// only when 8-connected to a seed.
pub fn canny(gray: &[u8], width: usize, height: usize, low: f32, high: f32) -> BitMatrix {
    let mut edges = BitMatrix::new(width, height);
    if width < 3 || height < 3 {
        return edges;
    }
    let (gx, gy) = sobel(gray, width, height);
    let magnitude: Vec<f32> = gx
        .iter()
        .zip(gy.iter())
        .map(|(&dx, &dy)| (dx.abs() + dy.abs()) as f32)
        .collect();

    // 0 = suppressed, 1 = weak, 2 = strong
    let mut class = vec![0u8; width * height];
    class
        .par_chunks_mut(width)
        .enumerate()
        .skip(1)
        .take(height - 2)
        .for_each(|(y, row)| {
            for x in 1..width - 1 {
                let idx = y * width + x;
                let m = magnitude[idx];
                if m <= low {
                    continue;
                }
                let ax = gx[idx].abs() as f32;
                let ay = gy[idx].abs() as f32;
                let (n1, n2) = if ay <= ax * TAN_22_5 {
                    (idx - 1, idx + 1)
                } else if ay >= ax * TAN_67_5 {
                    (idx - width, idx + width)
                } else if (gx[idx] > 0) == (gy[idx] > 0) {
                    (idx - width - 1, idx + width + 1)
                } else {
                    (idx - width + 1, idx + width - 1)
                };
                if m > magnitude[n1] && m >= magnitude[n2] {
                    row[x] = if m > high { 2 } else { 1 };
                }
            }
        });

    let mut stack: Vec<usize> = Vec::new();
    for (idx, &c) in class.iter().enumerate() {
        if c == 2 {
            stack.push(idx);
        }
    }
    while let Some(idx) = stack.pop() {
        let (x, y) = (idx % width, idx / width);
        if edges.get(x, y) {
            continue;
        }
        edges.set(x, y, true);
        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                    continue;
                }
                let nidx = ny as usize * width + nx as usize;
                if class[nidx] != 0 && !edges.get(nx as usize, ny as usize) {
                    stack.push(nidx);
                }
            }
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_image_has_no_edges() {
        let gray = vec![128u8; 32 * 32];
        assert_eq!(canny(&gray, 32, 32, 30.0, 100.0).count_ones(), 0);
    }

    #[test]
    fn test_vertical_step_gives_thin_line() {
        let width = 32;
        let height = 16;
        let gray: Vec<u8> = (0..width * height)
            .map(|i| if i % width < 16 { 20 } else { 220 })
            .collect();
        let edges = canny(&gray, width, height, 30.0, 100.0);
        for y in 2..height - 2 {
            let row: Vec<usize> = (0..width).filter(|&x| edges.get(x, y)).collect();
            assert_eq!(row.len(), 1, "row {y}: {row:?}");
            assert!(row[0] == 15 || row[0] == 16);
        }
    }

    #[test]
    fn test_weak_edges_need_strong_neighbor() {
        let width = 32;
        let height = 16;
        // Step of 10 levels: magnitude 40 is above low but below high
        let gray: Vec<u8> = (0..width * height)
            .map(|i| if i % width < 16 { 100 } else { 110 })
            .collect();
        assert_eq!(canny(&gray, width, height, 30.0, 100.0).count_ones(), 0);
    }
}
