//! Four-corner document outlines

use super::Point;
use crate::error::GeometryError;

/// Adjacent corners closer than this (in pixels) are treated as coincident
pub const CORNER_TOLERANCE: f32 = 1.0;

/// Quads enclosing less than this many square pixels are degenerate
pub const MIN_QUAD_AREA: f32 = 1.0;

/// Four-point document boundary.
///
/// Detectors emit corners in clockwise `[TL, TR, BR, BL]` order; a quad
/// built by hand (manual corner dragging) should be passed through
/// [`order_corners`](crate::detector::corners::order_corners) first.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quad {
    corners: [Point; 4],
}

impl Quad {
    /// Build from corners in `[TL, TR, BR, BL]` order
    pub fn new(corners: [Point; 4]) -> Self {
        Self { corners }
    }

    /// Axis-aligned quad from box corners
    pub fn from_box(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new([
            Point::new(x1, y1),
            Point::new(x2, y1),
            Point::new(x2, y2),
            Point::new(x1, y2),
        ])
    }

    /// Quad inset from the frame border by `fraction` of each dimension.
    ///
    /// Shown to the user when detection fails so that manual adjustment has
    /// a sensible starting point.
    pub fn inset(width: usize, height: usize, fraction: f32) -> Self {
        let fraction = fraction.clamp(0.0, 0.49);
        let w = width as f32;
        let h = height as f32;
        Self::from_box(w * fraction, h * fraction, w * (1.0 - fraction), h * (1.0 - fraction))
    }

    /// Corners in stored order
    pub fn corners(&self) -> &[Point; 4] {
        &self.corners
    }

    /// Top-left corner
    pub fn top_left(&self) -> Point {
        self.corners[0]
    }

    /// Top-right corner
    pub fn top_right(&self) -> Point {
        self.corners[1]
    }

    /// Bottom-right corner
    pub fn bottom_right(&self) -> Point {
        self.corners[2]
    }

    /// Bottom-left corner
    pub fn bottom_left(&self) -> Point {
        self.corners[3]
    }

    /// Signed shoelace area; positive for clockwise order in image space
    pub fn signed_area(&self) -> f32 {
        let mut acc = 0.0f32;
        for i in 0..4 {
            let a = self.corners[i];
            let b = self.corners[(i + 1) % 4];
            acc += a.x * b.y - b.x * a.y;
        }
        acc * 0.5
    }

    /// Absolute enclosed area
    pub fn area(&self) -> f32 {
        self.signed_area().abs()
    }

    /// Check every rectifier precondition
    pub fn validate(&self) -> Result<(), GeometryError> {
        for (index, point) in self.corners.iter().enumerate() {
            if !point.is_finite() {
                return Err(GeometryError::NonFinite {
                    index,
                    point: *point,
                });
            }
        }
        for a in 0..4 {
            let b = (a + 1) % 4;
            let distance = self.corners[a].distance(&self.corners[b]);
            if distance < CORNER_TOLERANCE {
                return Err(GeometryError::CoincidentCorners { a, b, distance });
            }
        }
        let area = self.area();
        if area < MIN_QUAD_AREA {
            return Err(GeometryError::DegenerateArea { area });
        }
        Ok(())
    }

    /// True when the quad passes [`Quad::validate`]
    pub fn is_well_formed(&self) -> bool {
        self.validate().is_ok()
    }

    /// Map pixel coordinates into percentage space for overlay rendering
    pub fn to_percent(&self, width: usize, height: usize) -> Self {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        Self::new(
            self.corners
                .map(|p| Point::new(p.x / w * 100.0, p.y / h * 100.0)),
        )
    }

    /// Inverse of [`Quad::to_percent`]
    pub fn from_percent(&self, width: usize, height: usize) -> Self {
        let w = width as f32;
        let h = height as f32;
        Self::new(
            self.corners
                .map(|p| Point::new(p.x / 100.0 * w, p.y / 100.0 * h)),
        )
    }

    /// Multiply x and y coordinates independently
    pub fn scale(&self, sx: f32, sy: f32) -> Self {
        Self::new(self.corners.map(|p| Point::new(p.x * sx, p.y * sy)))
    }

    /// Largest per-corner distance to another quad
    pub fn max_corner_distance(&self, other: &Quad) -> f32 {
        self.corners
            .iter()
            .zip(other.corners.iter())
            .map(|(a, b)| a.distance(b))
            .fold(0.0f32, f32::max)
    }
}

impl From<[Point; 4]> for Quad {
    fn from(corners: [Point; 4]) -> Self {
        Self::new(corners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_and_orientation() {
        let quad = Quad::from_box(0.0, 0.0, 10.0, 5.0);
        assert!((quad.area() - 50.0).abs() < 1e-4);
        // y grows downwards, so TL -> TR -> BR -> BL is clockwise on screen
        assert!(quad.signed_area() > 0.0);
    }

    #[test]
    fn test_rejects_coincident_corners() {
        let quad = Quad::new([
            Point::new(0.0, 0.0),
            Point::new(0.5, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]);
        assert!(matches!(
            quad.validate(),
            Err(GeometryError::CoincidentCorners { a: 0, b: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_collinear() {
        let quad = Quad::new([
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(30.0, 0.0),
        ]);
        assert!(matches!(
            quad.validate(),
            Err(GeometryError::DegenerateArea { .. })
        ));
    }

    #[test]
    fn test_percent_round_trip() {
        let quad = Quad::from_box(10.0, 20.0, 90.0, 180.0);
        let pct = quad.to_percent(100, 200);
        assert!((pct.top_left().x - 10.0).abs() < 1e-4);
        assert!((pct.bottom_right().y - 90.0).abs() < 1e-4);
        assert!(pct.from_percent(100, 200).max_corner_distance(&quad) < 1e-3);
    }

    #[test]
    fn test_inset() {
        let quad = Quad::inset(200, 100, 0.1);
        assert_eq!(quad.top_left(), Point::new(20.0, 10.0));
        assert_eq!(quad.bottom_right(), Point::new(180.0, 90.0));
    }
}
