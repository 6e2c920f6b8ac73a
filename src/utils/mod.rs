//! Utility functions for image processing
//!
//! This module provides the raster building blocks the detectors and
//! enhancement filters are assembled from:
//! - Grayscale conversion (RGB/RGBA to luminance)
//! - Adaptive thresholding with integral images
//! - Tiled contrast equalization
//! - Convolution, blur and morphology
//! - Geometry (perspective transforms, polygon simplification)

pub mod binarization;
pub mod clahe;
pub mod filter;
pub mod geometry;
pub mod grayscale;
