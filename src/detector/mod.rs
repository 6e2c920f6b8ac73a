//! Document detection
//!
//! Two strategies produce the same [`DetectionResult`](crate::models::DetectionResult):
//! - Classical edge/contour pipeline with corner ordering
//! - Single-shot neural detector behind a pluggable inference backend
//!
//! Live streams pass results through the rolling-history stabilizer.

/// Inference backends for the neural detector
pub mod backends;
/// Connected-component labelling and outer boundary tracing
pub mod connected_components;
/// Edge/contour document detector
pub mod contour;
/// Canonical `[TL, TR, BR, BL]` ordering
pub mod corners;
/// Canny edge detection
pub mod edges;
/// Letterbox, tensor decoding and non-maximum suppression
pub mod neural;
/// Success-ratio gating and corner smoothing over recent attempts
pub mod stabilizer;
