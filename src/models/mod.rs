//! Core value types shared by every stage

pub mod detection;
pub mod frame;
pub mod matrix;
pub mod point;
pub mod quad;

pub use detection::{BoundingBox, DetectionMethod, DetectionResult};
pub use frame::{Frame, PixelFormat};
pub use matrix::BitMatrix;
pub use point::{Point, PointI};
pub use quad::Quad;
