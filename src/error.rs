//! Error types for the scanning pipeline.
//!
//! Only construction-time and rectification problems are errors. A frame in
//! which no document can be found is a normal negative
//! [`DetectionResult`](crate::models::DetectionResult), never an `Err`.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::Point;

/// Reasons a quad cannot be rectified.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Two adjacent corners sit on top of each other.
    #[error("corners {a} and {b} coincide ({distance:.3}px apart)")]
    CoincidentCorners {
        /// Index of the first corner
        a: usize,
        /// Index of the second corner
        b: usize,
        /// Measured distance between them
        distance: f32,
    },

    /// The quad encloses (almost) nothing.
    #[error("quad area {area:.3} is below the usable minimum")]
    DegenerateArea {
        /// Absolute shoelace area
        area: f32,
    },

    /// A corner is NaN or infinite.
    #[error("corner {index} is not finite: {point:?}")]
    NonFinite {
        /// Index of the offending corner
        index: usize,
        /// The corner itself
        point: Point,
    },

    /// The 8x8 homography system has no unique solution.
    #[error("perspective transform is singular")]
    SingularTransform,

    /// The destination rectangle would have zero width or height.
    #[error("destination size {width}x{height} is empty")]
    EmptyDestination {
        /// Destination width
        width: usize,
        /// Destination height
        height: usize,
    },
}

/// Errors raised by the scanning core.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Invalid or degenerate quad handed to the rectifier.
    #[error("geometry: {0}")]
    Geometry(#[from] GeometryError),

    /// Raster buffer does not match its declared shape.
    #[error("invalid image: {message}")]
    InvalidImage {
        /// What was wrong with the raster
        message: String,
    },

    /// Neural weights could not be loaded.
    #[error("failed to load model from {}: {message}", path.display())]
    ModelLoad {
        /// Path that was requested
        path: PathBuf,
        /// Backend error text
        message: String,
    },

    /// A single inference call failed.
    #[error("inference: {message}")]
    Inference {
        /// Backend error text
        message: String,
    },

    /// Configuration could not be read or is out of range.
    #[error("configuration: {message}")]
    Config {
        /// What was wrong
        message: String,
    },
}

impl ScanError {
    /// Shorthand for [`ScanError::InvalidImage`].
    pub fn invalid_image(message: impl Into<String>) -> Self {
        Self::InvalidImage {
            message: message.into(),
        }
    }

    /// Shorthand for [`ScanError::Inference`].
    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference {
            message: message.into(),
        }
    }

    /// Shorthand for [`ScanError::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ScanError>;
