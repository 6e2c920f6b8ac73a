//! Post-rectification enhancement filters.
//!
//! Each mode is computed from the pristine raster it is given. Filters are
//! never chained: [`ScanPage`] keeps the untouched source and recomputes
//! whenever the mode changes.

use crate::models::{Frame, PixelFormat};
use crate::utils::binarization::adaptive_threshold;
use crate::utils::clahe::{ClaheParams, clahe};
use crate::utils::filter::convolve3x3;
use crate::utils::grayscale::{frame_to_grayscale, grayscale_to_format};

/// Light sharpening: center 5, four-neighbours -1
const SHARPEN: [[f32; 3]; 3] = [[0.0, -1.0, 0.0], [-1.0, 5.0, -1.0], [0.0, -1.0, 0.0]];

/// Which filter was last applied to a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnhancementMode {
    /// Passthrough
    #[default]
    Original,
    /// Adaptive local threshold, shadows pushed to white
    BlackAndWhite,
    /// Luminance with tiled contrast equalization
    Grayscale,
    /// Colour kept, lightly sharpened
    Color,
}

/// Filter tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnhanceParams {
    /// Neighbourhood edge length for the black & white threshold
    pub block_size: usize,
    /// Subtracted from the local mean before comparing
    pub offset: i32,
    /// Equalization used by [`EnhancementMode::Grayscale`]
    pub clahe: ClaheParams,
}

impl Default for EnhanceParams {
    fn default() -> Self {
        Self {
            block_size: 15,
            offset: 10,
            clahe: ClaheParams::default(),
        }
    }
}

/// Apply `mode` to a fresh copy of `source` with default parameters
pub fn enhance(source: &Frame, mode: EnhancementMode) -> Frame {
    enhance_with(source, mode, &EnhanceParams::default())
}

/// Apply `mode` to a fresh copy of `source`.
///
/// The output keeps the source pixel layout so pages can be swapped without
/// the caller caring which filter produced them.
pub fn enhance_with(source: &Frame, mode: EnhancementMode, params: &EnhanceParams) -> Frame {
    let (width, height) = (source.width(), source.height());
    let data = match mode {
        EnhancementMode::Original => return source.clone(),
        EnhancementMode::BlackAndWhite => {
            let gray = frame_to_grayscale(source);
            let binary = adaptive_threshold(&gray, width, height, params.block_size, params.offset);
            grayscale_to_format(&binary, source)
        }
        EnhancementMode::Grayscale => {
            let gray = frame_to_grayscale(source);
            grayscale_to_format(&clahe(&gray, width, height, params.clahe), source)
        }
        EnhancementMode::Color => {
            let alpha = (source.format() == PixelFormat::Rgba).then_some(3);
            convolve3x3(source.as_bytes(), width, height, source.channels(), &SHARPEN, alpha)
        }
    };
    // Same shape and layout as the source, so this cannot fail
    Frame::new(width, height, source.format(), data).unwrap_or_else(|_| source.clone())
}

/// A captured page: the pristine raster plus the currently displayed filter
#[derive(Debug, Clone)]
pub struct ScanPage {
    source: Frame,
    mode: EnhancementMode,
    current: Frame,
    params: EnhanceParams,
}

impl ScanPage {
    /// Wrap a rectified raster, initially shown unfiltered
    pub fn new(source: Frame) -> Self {
        Self::with_params(source, EnhanceParams::default())
    }

    /// Wrap a rectified raster with custom filter tuning
    pub fn with_params(source: Frame, params: EnhanceParams) -> Self {
        Self {
            current: source.clone(),
            source,
            mode: EnhancementMode::Original,
            params,
        }
    }

    /// Switch filter, always recomputing from the pristine source
    pub fn set_mode(&mut self, mode: EnhancementMode) -> &Frame {
        if mode != self.mode {
            self.current = enhance_with(&self.source, mode, &self.params);
            self.mode = mode;
        }
        &self.current
    }

    /// Active filter
    pub fn mode(&self) -> EnhancementMode {
        self.mode
    }

    /// Raster as currently filtered
    pub fn current(&self) -> &Frame {
        &self.current
    }

    /// Untouched raster
    pub fn source(&self) -> &Frame {
        &self.source
    }

    /// Consume the page, returning the filtered raster
    pub fn into_current(self) -> Frame {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_frame() -> Frame {
        let width = 48;
        let height = 32;
        let data = (0..width * height)
            .flat_map(|i| {
                let (x, y) = (i % width, i / width);
                // Shadow gradient with a dark stroke
                let base = (150 + x * 2) as u8;
                if (20..23).contains(&x) && (8..24).contains(&y) {
                    [30, 30, 40]
                } else {
                    [base, base, base.saturating_sub(10)]
                }
            })
            .collect();
        Frame::from_rgb(width, height, data).unwrap()
    }

    #[test]
    fn test_original_is_passthrough() {
        let frame = page_frame();
        assert_eq!(enhance(&frame, EnhancementMode::Original), frame);
    }

    #[test]
    fn test_black_and_white_is_binary() {
        let frame = page_frame();
        let out = enhance(&frame, EnhancementMode::BlackAndWhite);
        assert_eq!(out.format(), PixelFormat::Rgb);
        assert!(out.as_bytes().iter().all(|&v| v == 0 || v == 255));
        assert_eq!(out.pixel(21, 16), &[0, 0, 0]);
        assert_eq!(out.pixel(5, 5), &[255, 255, 255]);
    }

    #[test]
    fn test_grayscale_channels_equal() {
        let out = enhance(&page_frame(), EnhancementMode::Grayscale);
        for px in out.as_bytes().chunks_exact(3) {
            assert!(px[0] == px[1] && px[1] == px[2]);
        }
    }

    #[test]
    fn test_sharpen_keeps_flat_color() {
        let frame = Frame::filled(8, 8, PixelFormat::Rgba, 90);
        assert_eq!(enhance(&frame, EnhancementMode::Color), frame);
    }

    #[test]
    fn test_modes_do_not_compound() {
        let frame = page_frame();
        let direct = enhance(&frame, EnhancementMode::Color);

        let mut page = ScanPage::new(frame);
        for _ in 0..2 {
            page.set_mode(EnhancementMode::BlackAndWhite);
            page.set_mode(EnhancementMode::Color);
        }
        assert_eq!(page.mode(), EnhancementMode::Color);
        assert_eq!(page.current(), &direct);
    }
}
