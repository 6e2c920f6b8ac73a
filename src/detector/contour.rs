//! Classical edge and contour document detector

use log::debug;

use crate::detector::connected_components::{label_components, trace_outer_boundary};
use crate::detector::corners::{CornerStrategy, order_corners};
use crate::detector::edges::canny;
use crate::models::{DetectionMethod, DetectionResult, Frame, Point, Quad};
use crate::utils::clahe::{ClaheParams, clahe};
use crate::utils::filter::{dilate, gaussian_blur};
use crate::utils::geometry::{approx_closed_polygon, perimeter, polygon_area};
use crate::utils::grayscale::frame_to_grayscale;

/// Tuning for the classical edge/contour pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ContourOptions {
    /// Smallest accepted contour, as a fraction of the frame area
    pub min_area_fraction: f32,
    /// Tiled equalization applied before blurring
    pub clahe: ClaheParams,
    /// Gaussian kernel size (odd)
    pub blur_kernel: usize,
    /// Lower hysteresis threshold on the L1 Sobel magnitude
    pub canny_low: f32,
    /// Upper hysteresis threshold; pixels above it seed edges
    pub canny_high: f32,
    /// Square structuring element used to close edge gaps
    pub dilate_kernel: usize,
    /// Polygon simplification tolerance, as a fraction of the perimeter
    pub approx_epsilon_fraction: f32,
    /// Corners placed by hand; detection is skipped entirely when set
    pub manual_corners: Option<[Point; 4]>,
}

impl Default for ContourOptions {
    fn default() -> Self {
        Self {
            min_area_fraction: 0.1,
            clahe: ClaheParams::default(),
            blur_kernel: 5,
            canny_low: 30.0,
            canny_high: 100.0,
            dilate_kernel: 3,
            approx_epsilon_fraction: 0.03,
            manual_corners: None,
        }
    }
}

/// Candidate outline that survived simplification
struct Candidate {
    quad: Quad,
    area: f32,
}

/// Classical detector; stateless, all tuning lives in [`ContourOptions`]
pub struct ContourDetector;

impl ContourDetector {
    /// Find the document quadrilateral in a single frame.
    ///
    /// Returns a negative result (not an error) when no contour qualifies.
    pub fn detect(frame: &Frame, options: &ContourOptions) -> DetectionResult {
        if let Some(corners) = options.manual_corners {
            return DetectionResult::found(Quad::new(corners), 1.0, DetectionMethod::Manual);
        }
        if frame.is_empty() {
            return DetectionResult::not_detected(DetectionMethod::Contour);
        }

        let (width, height) = (frame.width(), frame.height());
        let gray = frame_to_grayscale(frame);
        let equalized = clahe(&gray, width, height, options.clahe);
        let blurred = gaussian_blur(&equalized, width, height, options.blur_kernel);
        let edges = canny(&blurred, width, height, options.canny_low, options.canny_high);
        let closed = dilate(&edges, options.dilate_kernel);

        let min_area = options.min_area_fraction * frame.area() as f32;
        let map = label_components(&closed);
        debug!(
            "contour: {} edge pixels, {} components, min area {:.0}",
            closed.count_ones(),
            map.components.len(),
            min_area
        );

        let mut best: Option<Candidate> = None;
        for component in &map.components {
            // The enclosed area can never exceed the bounding box
            if (component.bbox_area() as f32) < min_area {
                continue;
            }
            let outline: Vec<Point> = trace_outer_boundary(&map, component)
                .into_iter()
                .map(|p| p.to_point())
                .collect();
            let area = polygon_area(&outline);
            if area < min_area {
                continue;
            }
            let best_area = best.as_ref().map_or(0.0, |c| c.area);
            if area <= best_area {
                continue;
            }

            let epsilon = options.approx_epsilon_fraction * perimeter(&outline);
            let approx = approx_closed_polygon(&outline, epsilon);
            let quad = match approx.len() {
                4 => order_corners(&approx, CornerStrategy::AxisSort),
                // Clipped corners: only worth reducing for the largest outline
                5 | 6 => order_corners(&approx, CornerStrategy::ExtremeSums),
                _ => None,
            };
            debug!(
                "contour: component {} area {:.0} simplified to {} vertices",
                component.label,
                area,
                approx.len()
            );

            if let Some(quad) = quad.filter(|q| q.is_well_formed()) {
                best = Some(Candidate { quad, area });
            }
        }

        match best {
            Some(candidate) => {
                // How much of the traced outline the quad explains
                let confidence = (candidate.quad.area() / candidate.area).min(1.0);
                DetectionResult::found(candidate.quad, confidence, DetectionMethod::Contour)
            }
            None => DetectionResult::not_detected(DetectionMethod::Contour),
        }
    }
}
