//! Image I/O, statistics and dataset helpers for the CLI and benches

use crate::error::{Result, ScanError};
use crate::models::{BitMatrix, Frame, Point, Quad};
use image::GenericImageView;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn max_dim_from_env() -> Option<u32> {
    match env::var("DOC_SCAN_MAX_DIM") {
        Ok(value) => match value.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(v) => Some(v),
            Err(_) => None,
        },
        Err(_) => None,
    }
}

/// Load an image file as an RGB frame.
///
/// When `DOC_SCAN_MAX_DIM` is set, larger images are downscaled so their
/// longer side matches it.
pub fn load_frame<P: AsRef<Path>>(path: P) -> Result<Frame> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|e| {
        ScanError::invalid_image(format!("failed to open {}: {e}", path.display()))
    })?;
    let rgb = match max_dim_from_env() {
        Some(max_dim) if img.dimensions().0.max(img.dimensions().1) > max_dim => img
            .resize(max_dim, max_dim, image::imageops::FilterType::Triangle)
            .to_rgb8(),
        _ => img.to_rgb8(),
    };
    let (width, height) = rgb.dimensions();
    Frame::from_rgb(width as usize, height as usize, rgb.into_raw())
}

/// Write a frame to disk; the format follows the file extension.
pub fn save_frame<P: AsRef<Path>>(path: P, frame: &Frame) -> Result<()> {
    let path = path.as_ref();
    let color = match frame.format() {
        crate::models::PixelFormat::Gray => image::ColorType::L8,
        crate::models::PixelFormat::Rgb => image::ColorType::Rgb8,
        crate::models::PixelFormat::Rgba => image::ColorType::Rgba8,
    };
    image::save_buffer(
        path,
        frame.as_bytes(),
        frame.width() as u32,
        frame.height() as u32,
        color,
    )
    .map_err(|e| ScanError::invalid_image(format!("failed to write {}: {e}", path.display())))
}

/// Summary statistics for grayscale data.
#[derive(Debug, Clone, Copy)]
pub struct GrayStats {
    /// Minimum grayscale value.
    pub min: u8,
    /// Maximum grayscale value.
    pub max: u8,
    /// Average grayscale value.
    pub avg: u8,
}

/// Summary statistics for an edge map.
#[derive(Debug, Clone, Copy)]
pub struct EdgeStats {
    /// Count of edge pixels.
    pub edge_pixels: usize,
    /// Total pixels in the map.
    pub total_pixels: usize,
    /// Ratio of edge pixels to total pixels.
    pub edge_ratio: f64,
}

/// Compute min/max/avg for grayscale values.
pub fn grayscale_stats(gray: &[u8]) -> GrayStats {
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    let mut sum: u64 = 0;
    for &v in gray {
        min = min.min(v);
        max = max.max(v);
        sum += v as u64;
    }
    let avg = if gray.is_empty() {
        0
    } else {
        (sum / gray.len() as u64) as u8
    };
    GrayStats { min, max, avg }
}

/// Compute edge density for an edge map.
pub fn edge_stats(edges: &BitMatrix) -> EdgeStats {
    let edge_pixels = edges.count_ones();
    let total = edges.width() * edges.height();
    let ratio = if total == 0 {
        0.0
    } else {
        edge_pixels as f64 / total as f64
    };
    EdgeStats {
        edge_pixels,
        total_pixels: total,
        edge_ratio: ratio,
    }
}

/// Default dataset root from environment variables.
pub fn dataset_root_from_env() -> PathBuf {
    env::var("DOC_SCAN_DATASET_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("benches/images"))
}

/// Ground-truth label file next to an image (`page.jpg` -> `page.txt`).
pub fn label_path(image: &Path) -> PathBuf {
    image.with_extension("txt")
}

/// Parse hand-labelled document corners.
///
/// One document per line as eight numbers `x y` for TL, TR, BR, BL; lines
/// starting with `#` are comments. Returns `None` if the file cannot be read
/// or holds no complete quad.
pub fn parse_corner_labels<P: AsRef<Path>>(txt_path: P) -> Option<Vec<Quad>> {
    let content = fs::read_to_string(txt_path).ok()?;
    let mut quads = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let values: Vec<f32> = match trimmed
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(str::parse::<f32>)
            .collect()
        {
            Ok(values) => values,
            Err(_) => continue,
        };
        if values.len() != 8 {
            continue;
        }
        quads.push(Quad::new([
            Point::new(values[0], values[1]),
            Point::new(values[2], values[3]),
            Point::new(values[4], values[5]),
            Point::new(values[6], values[7]),
        ]));
    }
    if quads.is_empty() { None } else { Some(quads) }
}

/// Iterate dataset image paths with an optional limit.
pub fn dataset_iter<P: AsRef<Path>>(
    root: P,
    limit: Option<usize>,
) -> impl Iterator<Item = PathBuf> {
    let mut images = collect_images(root.as_ref());
    images.sort();
    if let Some(limit) = limit {
        images.truncate(limit);
    }
    images.into_iter()
}

fn collect_images(root: &Path) -> Vec<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if let Some(ext) = path.extension() {
                let ext = ext.to_string_lossy().to_lowercase();
                if ext == "png" || ext == "jpg" || ext == "jpeg" || ext == "bmp" {
                    images.push(path);
                }
            }
        }
    }

    images
}
