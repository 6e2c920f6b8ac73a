//! Geometry utilities: projective transforms and polygon measurements

use crate::error::GeometryError;
use crate::models::Point;

/// Pivots smaller than this make the homography system singular
const SINGULAR_EPSILON: f64 = 1e-10;

/// Perspective transformation matrix (3x3), row-major, `a33` fixed at 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveTransform {
    m: [[f64; 3]; 3],
}

impl PerspectiveTransform {
    /// Create transform mapping 4 source points onto 4 destination points.
    ///
    /// Solves the 8-parameter direct linear transform with partial pivoting.
    pub fn from_points(src: &[Point; 4], dst: &[Point; 4]) -> Result<Self, GeometryError> {
        let mut a = [[0.0f64; 8]; 8];
        let mut b = [0.0f64; 8];

        for i in 0..4 {
            let (sx, sy) = (src[i].x as f64, src[i].y as f64);
            let (dx, dy) = (dst[i].x as f64, dst[i].y as f64);

            let row = i * 2;
            a[row] = [sx, sy, 1.0, 0.0, 0.0, 0.0, -dx * sx, -dx * sy];
            b[row] = dx;
            a[row + 1] = [0.0, 0.0, 0.0, sx, sy, 1.0, -dy * sx, -dy * sy];
            b[row + 1] = dy;
        }

        let h = solve_linear_system(&a, &b).ok_or(GeometryError::SingularTransform)?;
        if h.iter().any(|v| !v.is_finite()) {
            return Err(GeometryError::SingularTransform);
        }
        Ok(Self {
            m: [[h[0], h[1], h[2]], [h[3], h[4], h[5]], [h[6], h[7], 1.0]],
        })
    }

    /// Raw matrix, row-major
    pub fn matrix(&self) -> [[f64; 3]; 3] {
        self.m
    }

    /// Map `(x, y)`; `None` when the point lands on the line at infinity
    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let m = &self.m;
        let w = m[2][0] * x + m[2][1] * y + m[2][2];
        if w.abs() < SINGULAR_EPSILON {
            return None;
        }
        Some((
            (m[0][0] * x + m[0][1] * y + m[0][2]) / w,
            (m[1][0] * x + m[1][1] * y + m[1][2]) / w,
        ))
    }

    /// Transform a point using this perspective matrix
    pub fn transform(&self, p: &Point) -> Option<Point> {
        self.apply(p.x as f64, p.y as f64)
            .map(|(x, y)| Point::new(x as f32, y as f32))
    }
}

/// Solve 8x8 linear system using Gaussian elimination
#[allow(clippy::needless_range_loop)]
fn solve_linear_system(a: &[[f64; 8]; 8], b: &[f64; 8]) -> Option<[f64; 8]> {
    let mut a = *a;
    let mut b = *b;
    let n = 8;

    // Forward elimination
    for i in 0..n {
        let mut max_val = a[i][i].abs();
        let mut max_row = i;
        for k in (i + 1)..n {
            if a[k][i].abs() > max_val {
                max_val = a[k][i].abs();
                max_row = k;
            }
        }

        if max_val < SINGULAR_EPSILON {
            return None;
        }

        if max_row != i {
            a.swap(i, max_row);
            b.swap(i, max_row);
        }

        for k in (i + 1)..n {
            let factor = a[k][i] / a[i][i];
            b[k] -= factor * b[i];
            for j in i..n {
                a[k][j] -= factor * a[i][j];
            }
        }
    }

    // Back substitution
    let mut x = [0.0f64; 8];
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= a[i][j] * x[j];
        }
        x[i] = sum / a[i][i];
    }

    Some(x)
}

/// Absolute shoelace area of a closed polygon
pub fn polygon_area(points: &[Point]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0f64;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        acc += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
    }
    (acc * 0.5).abs() as f32
}

/// Length of a closed polygon's boundary
pub fn perimeter(points: &[Point]) -> f32 {
    if points.len() < 2 {
        return 0.0;
    }
    (0..points.len())
        .map(|i| points[i].distance(&points[(i + 1) % points.len()]))
        .sum()
}

fn point_segment_distance(p: &Point, a: &Point, b: &Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(&Point::new(a.x + t * dx, a.y + t * dy))
}

fn douglas_peucker(points: &[Point], epsilon: f32, keep: &mut [bool], lo: usize, hi: usize) {
    // Explicit stack: document outlines can be thousands of pixels long
    let mut stack = vec![(lo, hi)];
    while let Some((lo, hi)) = stack.pop() {
        if hi <= lo + 1 {
            continue;
        }
        let mut max_dist = 0.0f32;
        let mut index = lo;
        for i in (lo + 1)..hi {
            let d = point_segment_distance(&points[i], &points[lo], &points[hi]);
            if d > max_dist {
                max_dist = d;
                index = i;
            }
        }
        if max_dist > epsilon {
            keep[index] = true;
            stack.push((lo, index));
            stack.push((index, hi));
        }
    }
}

fn farthest_from(points: &[Point], origin: usize) -> usize {
    (0..points.len())
        .max_by(|&a, &b| {
            points[origin]
                .distance_squared(&points[a])
                .total_cmp(&points[origin].distance_squared(&points[b]))
        })
        .unwrap_or(origin)
}

/// Simplify a closed polygon with the Douglas-Peucker algorithm.
///
/// The curve is split between two mutually distant points, which are
/// extreme points of the outline, so the start of the trace does not have
/// to coincide with a real vertex.
pub fn approx_closed_polygon(points: &[Point], epsilon: f32) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let a = farthest_from(points, 0);
    let b = farthest_from(points, a);
    let split = (b + n - a) % n;
    if split == 0 {
        return vec![points[a]];
    }

    // Rotate so the walk starts at `a`, then treat a -> b -> a as two open chains
    let mut chain: Vec<Point> = points[a..].iter().chain(points[..a].iter()).copied().collect();
    chain.push(points[a]);
    let mut keep = vec![false; chain.len()];
    keep[0] = true;
    keep[split] = true;
    douglas_peucker(&chain, epsilon, &mut keep, 0, split);
    douglas_peucker(&chain, epsilon, &mut keep, split, n);

    chain
        .into_iter()
        .take(n)
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perspective_transform() {
        let src = [
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ];
        let dst = [
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(50.0, 50.0),
            Point::new(0.0, 50.0),
        ];

        let t = PerspectiveTransform::from_points(&src, &dst).unwrap();
        let p = t.transform(&Point::new(50.0, 50.0)).unwrap();
        assert!((p.x - 25.0).abs() < 1e-3);
        assert!((p.y - 25.0).abs() < 1e-3);
    }

    #[test]
    fn test_projective_maps_all_corners() {
        let src = [
            Point::new(12.0, 30.0),
            Point::new(410.0, 5.0),
            Point::new(380.0, 520.0),
            Point::new(40.0, 470.0),
        ];
        let dst = [
            Point::new(0.0, 0.0),
            Point::new(300.0, 0.0),
            Point::new(300.0, 400.0),
            Point::new(0.0, 400.0),
        ];
        let t = PerspectiveTransform::from_points(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            let p = t.transform(s).unwrap();
            assert!(p.distance(d) < 1e-2, "{s:?} -> {p:?}, expected {d:?}");
        }
    }

    #[test]
    fn test_singular_transform() {
        let src = [Point::new(5.0, 5.0); 4];
        let dst = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        assert_eq!(
            PerspectiveTransform::from_points(&src, &dst),
            Err(GeometryError::SingularTransform)
        );
    }

    #[test]
    fn test_polygon_area_and_perimeter() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ];
        assert!((polygon_area(&square) - 16.0).abs() < 1e-5);
        assert!((perimeter(&square) - 16.0).abs() < 1e-5);
    }

    #[test]
    fn test_approx_recovers_square() {
        // Dense outline of a 100x60 rectangle starting mid-edge
        let mut outline = Vec::new();
        for x in 50..100 {
            outline.push(Point::new(x as f32, 0.0));
        }
        for y in 0..60 {
            outline.push(Point::new(100.0, y as f32));
        }
        for x in (1..=100).rev() {
            outline.push(Point::new(x as f32, 60.0));
        }
        for y in (1..=60).rev() {
            outline.push(Point::new(0.0, y as f32));
        }
        for x in 0..50 {
            outline.push(Point::new(x as f32, 0.0));
        }
        let eps = 0.03 * perimeter(&outline);
        let approx = approx_closed_polygon(&outline, eps);
        assert_eq!(approx.len(), 4, "approx = {approx:?}");
        let corners: Vec<_> = approx
            .iter()
            .filter(|p| (p.x == 0.0 || p.x == 100.0) && (p.y == 0.0 || p.y == 60.0))
            .collect();
        assert_eq!(corners.len(), 4, "approx = {approx:?}");
    }
}
