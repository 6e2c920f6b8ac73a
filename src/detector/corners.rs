//! Canonical clockwise corner ordering
use crate::models::{Point, Quad};

/// How to pick `[TL, TR, BR, BL]` from a set of points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CornerStrategy {
    /// Sort by y, then split the top and bottom pairs by x.
    /// Needs exactly four points.
    #[default]
    AxisSort,
    /// Pick the points minimizing x+y, maximizing x-y, maximizing x+y and
    /// maximizing y-x. Works on any number of points, which is how a 5 or 6
    /// vertex outline is reduced to a quad.
    ExtremeSums,
}

/// Order points into a clockwise `[TL, TR, BR, BL]` quad.
///
/// Returns `None` when fewer than four points are given, or when
/// [`CornerStrategy::AxisSort`] receives anything but exactly four.
pub fn order_corners(points: &[Point], strategy: CornerStrategy) -> Option<Quad> {
    match strategy {
        CornerStrategy::AxisSort => {
            let pts: [Point; 4] = points.try_into().ok()?;
            Some(axis_sort(pts))
        }
        CornerStrategy::ExtremeSums => extreme_sums(points),
    }
}

fn axis_sort(mut pts: [Point; 4]) -> Quad {
    pts.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));
    let (mut top, mut bottom) = ([pts[0], pts[1]], [pts[2], pts[3]]);
    top.sort_by(|a, b| a.x.total_cmp(&b.x));
    bottom.sort_by(|a, b| a.x.total_cmp(&b.x));
    Quad::new([top[0], top[1], bottom[1], bottom[0]])
}

fn extreme_sums(points: &[Point]) -> Option<Quad> {
    if points.len() < 4 {
        return None;
    }
    let pick = |key: fn(&Point) -> f32, largest: bool| -> Point {
        let mut best = points[0];
        for p in &points[1..] {
            let better = if largest { key(p) > key(&best) } else { key(p) < key(&best) };
            if better {
                best = *p;
            }
        }
        best
    };
    let tl = pick(Point::sum, false);
    let tr = pick(Point::diff, true);
    let br = pick(Point::sum, true);
    let bl = pick(|p| p.y - p.x, true);
    Some(Quad::new([tl, tr, br, bl]))
}
