//! Single-shot neural document detector.
//!
//! Frames are letterboxed into a square, channel-first `[0, 1]` tensor and
//! handed to an [`InferenceBackend`]. The dense `[4 + classes, anchors]`
//! output is decoded into boxes, filtered by one fixed acceptance policy,
//! de-duplicated with non-maximum suppression, mapped back to frame
//! coordinates, and the best box becomes an axis-aligned quad.

use std::path::Path;

use image::{ImageBuffer, Rgb, imageops};
use log::{debug, info, warn};
use ndarray::{Array2, Array4, ArrayView2};
use serde::Deserialize;

use crate::error::{Result, ScanError};
use crate::models::{BoundingBox, DetectionMethod, DetectionResult, Frame, PixelFormat};

/// Grey used for letterbox padding, as in common detector training setups
const PAD_VALUE: f32 = 114.0 / 255.0;

/// Inference runtime seam.
///
/// Implementations must treat the input as ephemeral and return the dense
/// prediction with the batch dimension removed.
pub trait InferenceBackend: Send {
    /// Backend identifier
    fn name(&self) -> &'static str;

    /// Run one forward pass on a `[1, 3, size, size]` tensor
    fn run(&mut self, input: Array4<f32>) -> Result<Array2<f32>>;
}

/// Axis order of the dense prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// `[4 + classes, anchors]`: one column per anchor
    #[default]
    AttributesFirst,
    /// `[anchors, 4 + classes]`: one row per anchor
    AnchorsFirst,
}

/// Decoding and acceptance policy
#[derive(Debug, Clone, PartialEq)]
pub struct NeuralOptions {
    /// Square network input edge length
    pub input_size: usize,
    /// Minimum class score for a candidate
    pub confidence_threshold: f32,
    /// Candidates overlapping a kept one above this IoU are dropped
    pub iou_threshold: f32,
    /// Cap on boxes kept after suppression
    pub max_detections: usize,
    /// Minimum box area as a fraction of the network input area
    pub min_box_fraction: f32,
    /// Accepted class ids; empty accepts every class
    pub document_classes: Vec<usize>,
    /// Axis order the backend returns
    pub layout: OutputLayout,
}

impl Default for NeuralOptions {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence_threshold: 0.5,
            iou_threshold: 0.45,
            max_detections: 10,
            min_box_fraction: 0.05,
            document_classes: Vec::new(),
            layout: OutputLayout::AttributesFirst,
        }
    }
}

impl NeuralOptions {
    fn accepts(&self, candidate: &BoundingBox) -> bool {
        let input_area = (self.input_size * self.input_size) as f32;
        candidate.confidence >= self.confidence_threshold
            && candidate.area() >= self.min_box_fraction * input_area
            && (self.document_classes.is_empty()
                || self.document_classes.contains(&candidate.class_id))
    }
}

/// How a frame was fitted into the square network input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Network input edge length
    pub input_size: usize,
    /// Width of the resized frame inside the square (padding is bottom/right)
    pub content_width: usize,
    /// Height of the resized frame inside the square
    pub content_height: usize,
    /// Original frame width
    pub frame_width: usize,
    /// Original frame height
    pub frame_height: usize,
}

impl Letterbox {
    /// Fit a `frame_width x frame_height` frame into `input_size`
    pub fn fit(frame_width: usize, frame_height: usize, input_size: usize) -> Self {
        let scale = input_size as f32 / frame_width.max(frame_height).max(1) as f32;
        Self {
            input_size,
            content_width: ((frame_width as f32 * scale).round() as usize).clamp(1, input_size),
            content_height: ((frame_height as f32 * scale).round() as usize).clamp(1, input_size),
            frame_width,
            frame_height,
        }
    }

    /// Independent per-axis factors from network space back to the frame
    pub fn scale_back(&self) -> (f32, f32) {
        (
            self.frame_width as f32 / self.content_width as f32,
            self.frame_height as f32 / self.content_height as f32,
        )
    }
}

/// Letterbox, normalize to `[0, 1]` and arrange channel-first
pub fn preprocess(frame: &Frame, input_size: usize) -> Result<(Array4<f32>, Letterbox)> {
    if frame.is_empty() || input_size == 0 {
        return Err(ScanError::invalid_image("cannot preprocess an empty frame"));
    }
    let rgb: Vec<u8> = match frame.format() {
        PixelFormat::Rgb => frame.as_bytes().to_vec(),
        PixelFormat::Rgba => frame
            .as_bytes()
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect(),
        PixelFormat::Gray => frame.as_bytes().iter().flat_map(|&v| [v, v, v]).collect(),
    };
    let image: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_raw(frame.width() as u32, frame.height() as u32, rgb)
            .ok_or_else(|| ScanError::invalid_image("frame buffer does not match its size"))?;

    let letterbox = Letterbox::fit(frame.width(), frame.height(), input_size);
    let resized = imageops::resize(
        &image,
        letterbox.content_width as u32,
        letterbox.content_height as u32,
        imageops::FilterType::Triangle,
    );

    let mut input = Array4::from_elem((1, 3, input_size, input_size), PAD_VALUE);
    for (x, y, px) in resized.enumerate_pixels() {
        for c in 0..3 {
            input[[0, c, y as usize, x as usize]] = px[c] as f32 / 255.0;
        }
    }
    Ok((input, letterbox))
}

/// Decode a `[4 + classes, anchors]` prediction into accepted candidates.
///
/// Rows 0..4 hold center x, center y, width and height in network pixels;
/// the remaining rows hold per-class scores. The axis order is taken from
/// `options.layout`, never guessed from the shape.
pub fn decode(output: ArrayView2<f32>, options: &NeuralOptions) -> Vec<BoundingBox> {
    let output = match options.layout {
        OutputLayout::AttributesFirst => output,
        OutputLayout::AnchorsFirst => output.reversed_axes(),
    };
    if output.nrows() < 5 {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    for anchor in output.columns() {
        let (class_id, confidence) = anchor
            .iter()
            .skip(4)
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |best, (i, &score)| {
                if score > best.1 { (i, score) } else { best }
            });
        if !confidence.is_finite() {
            continue;
        }
        let candidate = BoundingBox::from_center(
            anchor[0], anchor[1], anchor[2], anchor[3], confidence, class_id,
        );
        if options.accepts(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

/// Greedy non-maximum suppression.
///
/// Candidates are visited by descending confidence; one is kept only if its
/// IoU against every already-kept box is below `iou_threshold`.
pub fn non_max_suppression(
    mut candidates: Vec<BoundingBox>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<BoundingBox> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<BoundingBox> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        if kept.iter().all(|k| k.iou(&candidate) < iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

/// Neural detection outcome with the suppressed candidate list
pub type NeuralDetection = DetectionResult;

/// Detector context: a loaded backend plus its decoding policy
pub struct NeuralDetector {
    backend: Box<dyn InferenceBackend>,
    options: NeuralOptions,
}

impl NeuralDetector {
    /// Wrap an already loaded backend
    pub fn new(backend: Box<dyn InferenceBackend>, options: NeuralOptions) -> Self {
        Self { backend, options }
    }

    /// Decoding policy in use
    pub fn options(&self) -> &NeuralOptions {
        &self.options
    }

    /// Backend identifier
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Run the full preprocess / infer / decode / suppress / rescale chain.
    ///
    /// `Err` only for backend failures; an empty frame or no accepted box is
    /// a negative result.
    pub fn detect(&mut self, frame: &Frame) -> Result<NeuralDetection> {
        if frame.is_empty() {
            return Ok(DetectionResult::not_detected(DetectionMethod::Neural));
        }
        let (input, letterbox) = preprocess(frame, self.options.input_size)?;
        let output = self.backend.run(input)?;

        let candidates = decode(output.view(), &self.options);
        let accepted = candidates.len();
        let kept = non_max_suppression(
            candidates,
            self.options.iou_threshold,
            self.options.max_detections,
        );

        let (sx, sy) = letterbox.scale_back();
        let (fw, fh) = (frame.width() as f32, frame.height() as f32);
        let kept: Vec<BoundingBox> = kept
            .into_iter()
            .map(|b| b.scale(sx, sy).clamp(fw, fh))
            .collect();
        debug!(
            "neural[{}]: {} accepted, {} after suppression",
            self.backend.name(),
            accepted,
            kept.len()
        );

        // Kept boxes are already sorted by confidence
        let result = match kept.first() {
            Some(best) if best.to_quad().is_well_formed() => {
                DetectionResult::found(best.to_quad(), best.confidence, DetectionMethod::Neural)
            }
            _ => DetectionResult::not_detected(DetectionMethod::Neural),
        };
        Ok(result.with_candidates(kept))
    }
}

/// Outcome of loading a model. A failed load is a state, not a panic: the
/// caller keeps running with the contour strategy.
pub enum ModelStatus {
    /// Model loaded and ready for inference
    Ready(NeuralDetector),
    /// Loading failed; the reason is kept for display
    Failed(String),
}

impl ModelStatus {
    /// Whether a detector is available
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelStatus::Ready(_))
    }

    /// The loaded detector, if any
    pub fn into_detector(self) -> Option<NeuralDetector> {
        match self {
            ModelStatus::Ready(detector) => Some(detector),
            ModelStatus::Failed(_) => None,
        }
    }
}

impl std::fmt::Debug for ModelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelStatus::Ready(detector) => write!(f, "Ready({})", detector.backend_name()),
            ModelStatus::Failed(reason) => write!(f, "Failed({reason})"),
        }
    }
}

/// Load a detection model from a local file
pub fn load_model(path: &Path, options: &NeuralOptions) -> ModelStatus {
    match open_backend(path, options) {
        Ok(backend) => {
            info!("neural: loaded {} with {} backend", path.display(), backend.name());
            ModelStatus::Ready(NeuralDetector::new(backend, options.clone()))
        }
        Err(err) => {
            warn!("neural: model unavailable: {err}");
            ModelStatus::Failed(err.to_string())
        }
    }
}

#[cfg(feature = "backend-tract")]
fn open_backend(path: &Path, options: &NeuralOptions) -> Result<Box<dyn InferenceBackend>> {
    if !path.is_file() {
        return Err(ScanError::ModelLoad {
            path: path.to_path_buf(),
            message: "no such file".to_string(),
        });
    }
    let backend = crate::detector::backends::TractBackend::new(path, options.input_size)?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
fn open_backend(path: &Path, _options: &NeuralOptions) -> Result<Box<dyn InferenceBackend>> {
    Err(ScanError::ModelLoad {
        path: path.to_path_buf(),
        message: "built without an inference backend (enable `backend-tract`)".to_string(),
    })
}
