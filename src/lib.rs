//! doc_scan - document boundary detection, rectification and enhancement
//!
//! A pure Rust document scanning core. Finds the quadrilateral outline of a
//! sheet of paper in a photo or live frame, warps it flat and cleans it up.
//!
//! - Classical edge/contour detection or an optional neural detector
//! - Perspective rectification through a homography
//! - Black & white, grayscale and colour enhancement filters
//! - Rolling-history stabilization for live streams

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// TOML configuration with environment overrides
pub mod config;
/// Document detectors (contour, neural) and live stabilization
pub mod detector;
/// Post-rectification filters
pub mod enhance;
/// Error types
pub mod error;
/// Live stream sampling loop
pub mod live;
/// Core data structures (Frame, Quad, DetectionResult, etc.)
pub mod models;
/// Scanner context: strategy selection, fallback and the capture pipeline
pub mod pipeline;
/// Perspective rectification
pub mod rectify;
/// Image file helpers for the command line tool and benches
pub mod tools;
/// Raster building blocks (grayscale, thresholding, filters, geometry)
pub mod utils;

pub use config::ScanConfig;
pub use detector::contour::{ContourDetector, ContourOptions};
pub use detector::corners::{CornerStrategy, order_corners};
pub use detector::neural::{
    InferenceBackend, ModelStatus, NeuralDetector, NeuralOptions, OutputLayout,
};
pub use detector::stabilizer::{LiveStabilizer, Stabilized};
pub use enhance::{EnhancementMode, ScanPage};
pub use error::{GeometryError, ScanError};
pub use live::{LiveConfig, LiveSession, LiveSnapshot};
pub use models::{BoundingBox, DetectionMethod, DetectionResult, Frame, PixelFormat, Point, Quad};
pub use pipeline::{DetectionStrategy, ScannedPage, Scanner};
pub use rectify::PerspectiveRectifier;

use std::path::Path;

use log::warn;

/// Find the document outline with the edge/contour pipeline
///
/// # Arguments
/// * `frame` - Input raster (gray, RGB or RGBA)
/// * `options` - Pipeline tuning; manual corners bypass detection
///
/// # Returns
/// A negative result (`detected == false`) when nothing qualifies
///
/// # Example
/// ```
/// use doc_scan::{ContourOptions, Frame, PixelFormat};
///
/// let frame = Frame::filled(320, 240, PixelFormat::Rgb, 128);
/// let result = doc_scan::detect_contour(&frame, &ContourOptions::default());
/// assert!(!result.detected);
/// ```
pub fn detect_contour(frame: &Frame, options: &ContourOptions) -> DetectionResult {
    ContourDetector::detect(frame, options)
}

/// Warp the region inside `quad` into an upright rectangle
///
/// Fails with [`GeometryError`] when the quad is degenerate.
pub fn rectify(frame: &Frame, quad: &Quad) -> error::Result<Frame> {
    PerspectiveRectifier::rectify(frame, quad)
}

/// Apply an enhancement filter to a fresh copy of `frame`
pub fn enhance(frame: &Frame, mode: EnhancementMode) -> Frame {
    enhance::enhance(frame, mode)
}

/// Load a neural detection model from a local file
///
/// Never panics: a missing file or runtime yields [`ModelStatus::Failed`]
/// and callers keep using the contour detector.
pub fn load_model(path: &Path, options: &NeuralOptions) -> ModelStatus {
    detector::neural::load_model(path, options)
}

/// Run the neural detector on one frame
///
/// Inference failures degrade to a negative result.
pub fn detect_neural(detector: &mut NeuralDetector, frame: &Frame) -> DetectionResult {
    detector.detect(frame).unwrap_or_else(|err| {
        warn!("neural: inference failed: {err}");
        DetectionResult::not_detected(DetectionMethod::Neural)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::backends::StubBackend;

    #[test]
    fn test_detect_neural_degrades_errors() {
        let mut detector =
            NeuralDetector::new(Box::new(StubBackend::failing()), NeuralOptions::default());
        let frame = Frame::filled(32, 32, PixelFormat::Rgb, 0);
        let result = detect_neural(&mut detector, &frame);
        assert!(!result.detected);
        assert_eq!(result.method, DetectionMethod::Neural);
    }

    #[test]
    fn test_rectify_rejects_collapsed_quad() {
        let frame = Frame::filled(32, 32, PixelFormat::Rgb, 0);
        let quad = Quad::from_box(4.0, 4.0, 4.5, 20.0);
        assert!(matches!(rectify(&frame, &quad), Err(ScanError::Geometry(_))));
    }
}
