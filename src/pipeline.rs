//! Scanner context wiring detection, rectification and enhancement

use log::{debug, warn};

use crate::config::ScanConfig;
use crate::detector::contour::{ContourDetector, ContourOptions};
use crate::detector::corners::{CornerStrategy, order_corners};
use crate::detector::neural::{ModelStatus, NeuralDetector, load_model};
use crate::enhance::{EnhanceParams, EnhancementMode, ScanPage};
use crate::error::Result;
use crate::models::{DetectionMethod, DetectionResult, Frame, Point, Quad};
use crate::rectify::PerspectiveRectifier;

/// Fraction trimmed from each side when nothing was detected
pub const INSET_FRACTION: f32 = 0.1;

/// Which detector runs on each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DetectionStrategy {
    /// Classical edge and contour pipeline
    #[default]
    Contour,
    /// Installed neural detector, if any
    Neural,
}

/// A finished capture
#[derive(Debug, Clone)]
pub struct ScannedPage {
    /// What the detector reported for the frame
    pub detection: DetectionResult,
    /// Quad actually rectified (detected, manual or inset fallback)
    pub quad: Quad,
    /// Rectified page with the requested filter applied
    pub page: ScanPage,
}

/// Scanning context: detector configuration plus the optional neural model.
///
/// Replaces process-wide detector singletons. When the neural strategy is
/// requested without a loaded model, the scanner runs the contour detector.
pub struct Scanner {
    strategy: DetectionStrategy,
    contour: ContourOptions,
    neural: Option<NeuralDetector>,
    enhance: EnhanceParams,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(ContourOptions::default())
    }
}

impl Scanner {
    /// Contour-only scanner
    pub fn new(contour: ContourOptions) -> Self {
        Self {
            strategy: DetectionStrategy::Contour,
            contour,
            neural: None,
            enhance: EnhanceParams::default(),
        }
    }

    /// Build from configuration, loading the model once if one is configured.
    ///
    /// A model that fails to load leaves the scanner on the contour strategy.
    pub fn from_config(config: &ScanConfig) -> Self {
        let mut scanner = Self::new(config.contour.clone());
        if let Some(path) = &config.neural.model_path {
            scanner.install_model(load_model(path, &config.neural.options));
        }
        scanner
    }

    /// Install the outcome of a model load; a ready model becomes active
    pub fn install_model(&mut self, status: ModelStatus) -> bool {
        match status {
            ModelStatus::Ready(detector) => {
                self.neural = Some(detector);
                self.strategy = DetectionStrategy::Neural;
                true
            }
            ModelStatus::Failed(reason) => {
                warn!("scanner: neural detector unavailable ({reason}), using contour");
                self.neural = None;
                self.strategy = DetectionStrategy::Contour;
                false
            }
        }
    }

    /// Override the enhancement filter settings
    pub fn with_enhance_params(mut self, params: EnhanceParams) -> Self {
        self.enhance = params;
        self
    }

    /// Requested strategy
    pub fn strategy(&self) -> DetectionStrategy {
        self.strategy
    }

    /// Change strategy; returns the strategy that will actually run
    pub fn set_strategy(&mut self, strategy: DetectionStrategy) -> DetectionStrategy {
        self.strategy = strategy;
        let active = self.active_strategy();
        if active != strategy {
            warn!("scanner: {strategy:?} requested but no model is loaded, using {active:?}");
        }
        active
    }

    /// Strategy that runs given what is loaded
    pub fn active_strategy(&self) -> DetectionStrategy {
        match (self.strategy, &self.neural) {
            (DetectionStrategy::Neural, Some(_)) => DetectionStrategy::Neural,
            _ => DetectionStrategy::Contour,
        }
    }

    pub(crate) fn active_method(&self) -> DetectionMethod {
        match self.active_strategy() {
            DetectionStrategy::Neural => DetectionMethod::Neural,
            DetectionStrategy::Contour => DetectionMethod::Contour,
        }
    }

    /// Whether a neural detector is installed
    pub fn has_model(&self) -> bool {
        self.neural.is_some()
    }

    /// Classical detector tuning
    pub fn contour_options(&self) -> &ContourOptions {
        &self.contour
    }

    /// Mutable classical detector tuning
    pub fn contour_options_mut(&mut self) -> &mut ContourOptions {
        &mut self.contour
    }

    /// Set or clear hand-placed corners; they bypass detection while set
    pub fn set_manual_corners(&mut self, corners: Option<[Point; 4]>) {
        self.contour.manual_corners = corners;
    }

    /// Run the active detector, surfacing inference failures
    pub fn try_detect(&mut self, frame: &Frame) -> Result<DetectionResult> {
        if self.contour.manual_corners.is_some() {
            return Ok(ContourDetector::detect(frame, &self.contour));
        }
        match (self.active_strategy(), self.neural.as_mut()) {
            (DetectionStrategy::Neural, Some(detector)) => detector.detect(frame),
            _ => Ok(ContourDetector::detect(frame, &self.contour)),
        }
    }

    /// Run the active detector; an inference failure is a negative result
    pub fn detect(&mut self, frame: &Frame) -> DetectionResult {
        let method = self.active_method();
        self.try_detect(frame).unwrap_or_else(|err| {
            warn!("scanner: detection failed: {err}");
            DetectionResult::not_detected(method)
        })
    }

    /// Detect, order, rectify and enhance one still frame.
    ///
    /// Without a detection the central inset quad is used, so a capture
    /// always yields a page. Only a degenerate quad is an error.
    pub fn scan(&mut self, frame: &Frame, mode: EnhancementMode) -> Result<ScannedPage> {
        let detection = self.detect(frame);
        let quad = detection.quad_or_inset(frame.width(), frame.height(), INSET_FRACTION);
        // Hand-placed corners may come in any order
        let quad = order_corners(quad.corners(), CornerStrategy::AxisSort).unwrap_or(quad);
        debug!(
            "scan: {:?} detected={} quad={:?}",
            detection.method,
            detection.detected,
            quad.corners()
        );

        let flat = PerspectiveRectifier::rectify(frame, &quad)?;
        let mut page = ScanPage::with_params(flat, self.enhance);
        page.set_mode(mode);
        Ok(ScannedPage {
            detection,
            quad,
            page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::backends::StubBackend;
    use crate::detector::neural::NeuralOptions;
    use crate::models::PixelFormat;

    fn neural_scanner(backend: StubBackend) -> Scanner {
        let mut scanner = Scanner::default();
        let detector = NeuralDetector::new(Box::new(backend), NeuralOptions::default());
        assert!(scanner.install_model(ModelStatus::Ready(detector)));
        scanner
    }

    #[test]
    fn test_failed_model_falls_back_to_contour() {
        let mut scanner = Scanner::default();
        assert!(!scanner.install_model(ModelStatus::Failed("missing".into())));
        assert_eq!(scanner.set_strategy(DetectionStrategy::Neural), DetectionStrategy::Contour);
        let frame = Frame::filled(64, 64, PixelFormat::Rgb, 128);
        assert_eq!(scanner.detect(&frame).method, DetectionMethod::Contour);
    }

    #[test]
    fn test_neural_strategy_uses_model() {
        let mut scanner = neural_scanner(StubBackend::single(320.0, 320.0, 400.0, 400.0, 0.8));
        let frame = Frame::filled(640, 640, PixelFormat::Rgb, 128);
        let result = scanner.detect(&frame);
        assert!(result.detected);
        assert_eq!(result.method, DetectionMethod::Neural);

        scanner.set_strategy(DetectionStrategy::Contour);
        assert_eq!(scanner.detect(&frame).method, DetectionMethod::Contour);
    }

    #[test]
    fn test_inference_error_degrades_to_negative() {
        let mut scanner = neural_scanner(StubBackend::failing());
        let frame = Frame::filled(64, 64, PixelFormat::Rgb, 128);
        assert!(scanner.try_detect(&frame).is_err());
        let result = scanner.detect(&frame);
        assert!(!result.detected);
        assert_eq!(result.method, DetectionMethod::Neural);
    }

    #[test]
    fn test_scan_without_detection_uses_inset() {
        let mut scanner = Scanner::default();
        let frame = Frame::filled(100, 50, PixelFormat::Rgb, 128);
        let scanned = scanner.scan(&frame, EnhancementMode::Original).unwrap();
        assert!(!scanned.detection.detected);
        assert_eq!(scanned.quad, Quad::inset(100, 50, INSET_FRACTION));
        assert_eq!(scanned.page.current().format(), PixelFormat::Rgb);
    }

    #[test]
    fn test_manual_corners_are_reordered() {
        let mut scanner = Scanner::default();
        scanner.set_manual_corners(Some([
            Point::new(50.0, 40.0),
            Point::new(5.0, 5.0),
            Point::new(5.0, 40.0),
            Point::new(50.0, 5.0),
        ]));
        let frame = Frame::filled(64, 64, PixelFormat::Gray, 200);
        let scanned = scanner.scan(&frame, EnhancementMode::Grayscale).unwrap();
        assert_eq!(scanned.detection.method, DetectionMethod::Manual);
        assert_eq!(scanned.quad, Quad::from_box(5.0, 5.0, 50.0, 40.0));
        assert_eq!(scanned.page.mode(), EnhancementMode::Grayscale);
    }
}
