//! Perspective rectification of a detected document.
//!
//! The quad is mapped onto an upright `width x height` rectangle whose sides
//! are the longer of each pair of opposite quad edges. Every destination
//! pixel is pulled back through the inverse homography and bilinearly
//! sampled; reads outside the source are black.

use log::debug;
use rayon::prelude::*;

use crate::error::{GeometryError, Result};
use crate::models::{Frame, Point, Quad};
use crate::utils::geometry::PerspectiveTransform;

/// Quad-to-rectangle warper
pub struct PerspectiveRectifier;

impl PerspectiveRectifier {
    /// Output size for a quad in `[TL, TR, BR, BL]` order
    pub fn destination_size(quad: &Quad) -> (usize, usize) {
        let [tl, tr, br, bl] = *quad.corners();
        let width = tl.distance(&tr).max(bl.distance(&br));
        let height = tl.distance(&bl).max(tr.distance(&br));
        (width.round() as usize, height.round() as usize)
    }

    /// Homography taking destination pixels back into the source frame
    pub fn inverse_transform(
        quad: &Quad,
    ) -> std::result::Result<(PerspectiveTransform, usize, usize), GeometryError> {
        quad.validate()?;
        let (width, height) = Self::destination_size(quad);
        if width < 2 || height < 2 {
            return Err(GeometryError::EmptyDestination { width, height });
        }
        let (w, h) = ((width - 1) as f32, (height - 1) as f32);
        let dst = [
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        ];
        let transform = PerspectiveTransform::from_points(&dst, quad.corners())?;
        Ok((transform, width, height))
    }

    /// Warp the quad region of `frame` into a flat rectangle
    pub fn rectify(frame: &Frame, quad: &Quad) -> Result<Frame> {
        let (transform, width, height) = Self::inverse_transform(quad)?;
        debug!("rectify: {}x{} from quad {:?}", width, height, quad.corners());

        let channels = frame.channels();
        let stride = width * channels;
        let mut out = vec![0u8; stride * height];
        out.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
            for x in 0..width {
                if let Some((sx, sy)) = transform.apply(x as f64, y as f64) {
                    sample_bilinear(frame, sx, sy, &mut row[x * channels..(x + 1) * channels]);
                }
            }
        });

        Frame::new(width, height, frame.format(), out)
    }
}

/// Bilinear read with a constant black border
#[inline]
fn sample_bilinear(frame: &Frame, sx: f64, sy: f64, out: &mut [u8]) {
    let (w, h) = (frame.width() as i64, frame.height() as i64);
    if !sx.is_finite() || !sy.is_finite() {
        return;
    }
    if sx <= -1.0 || sy <= -1.0 || sx >= w as f64 || sy >= h as f64 {
        return;
    }
    let x0 = sx.floor() as i64;
    let y0 = sy.floor() as i64;
    let fx = sx - x0 as f64;
    let fy = sy - y0 as f64;
    let channels = frame.channels();
    let data = frame.as_bytes();

    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1, y0, fx * (1.0 - fy)),
        (x0, y0 + 1, (1.0 - fx) * fy),
        (x0 + 1, y0 + 1, fx * fy),
    ];
    for (c, px) in out.iter_mut().enumerate() {
        let mut acc = 0.0f64;
        for &(tx, ty, weight) in &taps {
            if tx < 0 || ty < 0 || tx >= w || ty >= h || weight == 0.0 {
                continue;
            }
            acc += data[(ty as usize * w as usize + tx as usize) * channels + c] as f64 * weight;
        }
        *px = acc.round().clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use crate::models::PixelFormat;

    fn gradient_frame(width: usize, height: usize) -> Frame {
        let data = (0..width * height)
            .flat_map(|i| {
                let (x, y) = (i % width, i / width);
                [(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8]
            })
            .collect();
        Frame::from_rgb(width, height, data).unwrap()
    }

    #[test]
    fn test_destination_size_uses_longer_edges() {
        let quad = Quad::new([
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(120.0, 50.0),
            Point::new(-10.0, 50.0),
        ]);
        assert_eq!(PerspectiveRectifier::destination_size(&quad), (130, 54));
    }

    #[test]
    fn test_axis_aligned_quad_is_a_crop() {
        let frame = gradient_frame(64, 48);
        let quad = Quad::from_box(10.0, 5.0, 41.0, 30.0);
        let out = PerspectiveRectifier::rectify(&frame, &quad).unwrap();
        assert_eq!((out.width(), out.height()), (31, 25));
        // Corners land on the source pixels at the quad corners
        assert_eq!(out.pixel(0, 0), frame.pixel(10, 5));
        assert_eq!(out.pixel(30, 24), frame.pixel(41, 30));
    }

    #[test]
    fn test_outside_reads_are_black() {
        let frame = Frame::filled(20, 20, PixelFormat::Gray, 200);
        let quad = Quad::from_box(-40.0, -40.0, -20.0, -20.0);
        let out = PerspectiveRectifier::rectify(&frame, &quad).unwrap();
        assert!(out.as_bytes().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_rejects_degenerate_quad() {
        let frame = gradient_frame(16, 16);
        let quad = Quad::new([Point::new(3.0, 3.0); 4]);
        let err = PerspectiveRectifier::rectify(&frame, &quad).unwrap_err();
        assert!(matches!(err, ScanError::Geometry(GeometryError::CoincidentCorners { .. })));
    }

    #[test]
    fn test_deterministic() {
        let frame = gradient_frame(80, 60);
        let quad = Quad::new([
            Point::new(7.5, 4.25),
            Point::new(70.0, 9.0),
            Point::new(66.0, 55.5),
            Point::new(3.0, 50.0),
        ]);
        let a = PerspectiveRectifier::rectify(&frame, &quad).unwrap();
        let b = PerspectiveRectifier::rectify(&frame, &quad).unwrap();
        assert_eq!(a, b);
    }
}
