//! Pixel and percentage-space points

/// 2D point with floating point coordinates
///
/// Lives in pixel space for detection and rectification, or in percentage
/// space (0.0 - 100.0 per axis) when handed to an overlay renderer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

impl Point {
    /// Create a new point
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Calculate squared distance (faster, no sqrt)
    pub fn distance_squared(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// x + y, smallest at the top-left corner
    pub fn sum(&self) -> f32 {
        self.x + self.y
    }

    /// x - y, largest at the top-right corner
    pub fn diff(&self) -> f32 {
        self.x - self.y
    }

    /// True when both coordinates are finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Integer point for pixel-grid coordinates (contour tracing)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointI {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
}

impl PointI {
    /// Create a new integer point
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Convert to a floating point pixel coordinate
    pub fn to_point(self) -> Point {
        Point::new(self.x as f32, self.y as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
        assert!((a.distance_squared(&b) - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_corner_keys() {
        let p = Point::new(10.0, 4.0);
        assert_eq!(p.sum(), 14.0);
        assert_eq!(p.diff(), 6.0);
        assert!(!Point::new(f32::NAN, 0.0).is_finite());
    }
}
