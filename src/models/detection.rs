//! Detection outcomes and neural candidate boxes

use super::Quad;

/// Which strategy produced a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionMethod {
    /// Classical edge/contour pipeline
    Contour,
    /// Single-shot neural detector
    Neural,
    /// Corners supplied by the user
    Manual,
}

/// Axis-aligned box decoded from the detector tensor, `[x1, y1, x2, y2]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Left edge
    pub x1: f32,
    /// Top edge
    pub y1: f32,
    /// Right edge
    pub x2: f32,
    /// Bottom edge
    pub y2: f32,
    /// Score of the winning class
    pub confidence: f32,
    /// Index of the winning class
    pub class_id: usize,
}

impl BoundingBox {
    /// Box from center/size as emitted by single-shot detectors
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32, confidence: f32, class_id: usize) -> Self {
        Self {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
            confidence,
            class_id,
        }
    }

    /// Box width (never negative)
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    /// Box height (never negative)
    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    /// Box area
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection-over-union with another box
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }

    /// Scale coordinates independently per axis
    pub fn scale(&self, sx: f32, sy: f32) -> Self {
        Self {
            x1: self.x1 * sx,
            y1: self.y1 * sy,
            x2: self.x2 * sx,
            y2: self.y2 * sy,
            ..*self
        }
    }

    /// Clamp into `[0, width] x [0, height]`
    pub fn clamp(&self, width: f32, height: f32) -> Self {
        Self {
            x1: self.x1.clamp(0.0, width),
            y1: self.y1.clamp(0.0, height),
            x2: self.x2.clamp(0.0, width),
            y2: self.y2.clamp(0.0, height),
            ..*self
        }
    }

    /// Axis-aligned quad in `[TL, TR, BR, BL]` order
    pub fn to_quad(&self) -> Quad {
        Quad::from_box(self.x1, self.y1, self.x2, self.y2)
    }
}

/// Outcome of one detection attempt.
///
/// `detected == false` is a normal negative result, not a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    /// Whether a document boundary was found
    pub detected: bool,
    /// Boundary in absolute pixel coordinates
    pub quad: Option<Quad>,
    /// Detector confidence (1.0 for manual corners)
    pub confidence: f32,
    /// Strategy that produced the result
    pub method: DetectionMethod,
    /// Raw neural candidates kept after suppression, for diagnostics
    pub candidates: Vec<BoundingBox>,
}

impl DetectionResult {
    /// Positive result
    pub fn found(quad: Quad, confidence: f32, method: DetectionMethod) -> Self {
        Self {
            detected: true,
            quad: Some(quad),
            confidence,
            method,
            candidates: Vec::new(),
        }
    }

    /// Negative result
    pub fn not_detected(method: DetectionMethod) -> Self {
        Self {
            detected: false,
            quad: None,
            confidence: 0.0,
            method,
            candidates: Vec::new(),
        }
    }

    /// Attach diagnostic candidates
    pub fn with_candidates(mut self, candidates: Vec<BoundingBox>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Detected and carrying a well-formed quad
    pub fn is_usable(&self) -> bool {
        self.detected && self.quad.is_some_and(|q| q.is_well_formed())
    }

    /// Detected quad, or the inset fallback for a `width x height` frame
    pub fn quad_or_inset(&self, width: usize, height: usize, fraction: f32) -> Quad {
        match self.quad {
            Some(quad) if self.detected => quad,
            _ => Quad::inset(width, height, fraction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou() {
        let a = BoundingBox::from_center(5.0, 5.0, 10.0, 10.0, 0.9, 0);
        let b = BoundingBox::from_center(10.0, 5.0, 10.0, 10.0, 0.8, 0);
        // overlap 5x10 = 50, union 150
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-5);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);

        let far = BoundingBox::from_center(100.0, 100.0, 10.0, 10.0, 0.8, 0);
        assert_eq!(a.iou(&far), 0.0);
    }

    #[test]
    fn test_negative_result_falls_back_to_inset() {
        let result = DetectionResult::not_detected(DetectionMethod::Contour);
        assert!(!result.is_usable());
        let quad = result.quad_or_inset(100, 100, 0.1);
        assert_eq!(quad, Quad::from_box(10.0, 10.0, 90.0, 90.0));
    }
}
