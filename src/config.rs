//! TOML configuration with environment overrides

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detector::contour::ContourOptions;
use crate::detector::neural::{NeuralOptions, OutputLayout};
use crate::error::{Result, ScanError};
use crate::live::LiveConfig;
use crate::utils::clahe::ClaheParams;

const DEFAULT_MIN_AREA_FRACTION: f32 = 0.1;
const DEFAULT_CANNY_LOW: f32 = 30.0;
const DEFAULT_CANNY_HIGH: f32 = 100.0;
const DEFAULT_CLAHE_CLIP_LIMIT: f32 = 2.0;
const DEFAULT_CLAHE_TILES: usize = 8;
const DEFAULT_BLUR_KERNEL: usize = 5;
const DEFAULT_APPROX_EPSILON_FRACTION: f32 = 0.03;
const DEFAULT_INPUT_SIZE: usize = 640;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
const DEFAULT_MAX_DETECTIONS: usize = 10;
const DEFAULT_MIN_BOX_FRACTION: f32 = 0.05;
const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 600;
const DEFAULT_HISTORY_CAPACITY: usize = 4;
const DEFAULT_STABILITY_RATIO: f32 = 0.75;

/// Env var naming the TOML config file
pub const CONFIG_ENV: &str = "DOC_SCAN_CONFIG";
/// Env var overriding `neural.model_path`
pub const MODEL_ENV: &str = "DOC_SCAN_MODEL";
/// Env var overriding `live.sample_interval_ms`
pub const SAMPLE_INTERVAL_ENV: &str = "DOC_SCAN_SAMPLE_INTERVAL_MS";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ScanConfigFile {
    contour: Option<ContourConfigFile>,
    neural: Option<NeuralConfigFile>,
    live: Option<LiveConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ContourConfigFile {
    min_area_fraction: Option<f32>,
    canny_low: Option<f32>,
    canny_high: Option<f32>,
    clahe_clip_limit: Option<f32>,
    clahe_tiles: Option<usize>,
    blur_kernel: Option<usize>,
    approx_epsilon_fraction: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct NeuralConfigFile {
    model_path: Option<PathBuf>,
    input_size: Option<usize>,
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
    max_detections: Option<usize>,
    min_box_fraction: Option<f32>,
    document_classes: Option<Vec<usize>>,
    layout: Option<OutputLayout>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct LiveConfigFile {
    sample_interval_ms: Option<u64>,
    history_capacity: Option<usize>,
    stability_ratio: Option<f32>,
}

/// Full scanner configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Classical detector tuning
    pub contour: ContourOptions,
    /// Model path and decoding policy
    pub neural: NeuralSettings,
    /// Live sampling cadence and stability rule
    pub live: LiveConfig,
}

/// Neural strategy settings; no model path means contour only
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NeuralSettings {
    /// ONNX model to load at startup
    pub model_path: Option<PathBuf>,
    /// Decoding and acceptance policy
    pub options: NeuralOptions,
}

impl Default for ScanConfig {
    fn default() -> Self {
        // Infallible: an empty file only yields defaults
        Self::from_file(ScanConfigFile::default())
    }
}

impl ScanConfig {
    /// Load from `DOC_SCAN_CONFIG` (if set), apply env overrides and validate
    pub fn load() -> Result<Self> {
        let file_cfg = match std::env::var(CONFIG_ENV).ok().as_deref() {
            Some(path) if !path.trim().is_empty() => read_config_file(Path::new(path))?,
            _ => ScanConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a TOML file without consulting the environment
    pub fn from_path(path: &Path) -> Result<Self> {
        let cfg = Self::from_file(read_config_file(path)?);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse TOML text without consulting the environment
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: ScanConfigFile = toml::from_str(raw)
            .map_err(|e| ScanError::config(format!("failed to parse config: {e}")))?;
        let cfg = Self::from_file(file);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ScanConfigFile) -> Self {
        let contour = file.contour.unwrap_or_default();
        let contour = ContourOptions {
            min_area_fraction: contour
                .min_area_fraction
                .unwrap_or(DEFAULT_MIN_AREA_FRACTION),
            clahe: ClaheParams {
                tiles: contour.clahe_tiles.unwrap_or(DEFAULT_CLAHE_TILES),
                clip_limit: contour.clahe_clip_limit.unwrap_or(DEFAULT_CLAHE_CLIP_LIMIT),
            },
            blur_kernel: contour.blur_kernel.unwrap_or(DEFAULT_BLUR_KERNEL),
            canny_low: contour.canny_low.unwrap_or(DEFAULT_CANNY_LOW),
            canny_high: contour.canny_high.unwrap_or(DEFAULT_CANNY_HIGH),
            approx_epsilon_fraction: contour
                .approx_epsilon_fraction
                .unwrap_or(DEFAULT_APPROX_EPSILON_FRACTION),
            ..ContourOptions::default()
        };

        let neural = file.neural.unwrap_or_default();
        let neural = NeuralSettings {
            model_path: neural.model_path,
            options: NeuralOptions {
                input_size: neural.input_size.unwrap_or(DEFAULT_INPUT_SIZE),
                confidence_threshold: neural
                    .confidence_threshold
                    .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
                iou_threshold: neural.iou_threshold.unwrap_or(DEFAULT_IOU_THRESHOLD),
                max_detections: neural.max_detections.unwrap_or(DEFAULT_MAX_DETECTIONS),
                min_box_fraction: neural.min_box_fraction.unwrap_or(DEFAULT_MIN_BOX_FRACTION),
                document_classes: neural.document_classes.unwrap_or_default(),
                layout: neural.layout.unwrap_or_default(),
            },
        };

        let live = file.live.unwrap_or_default();
        let live = LiveConfig {
            sample_interval: Duration::from_millis(
                live.sample_interval_ms.unwrap_or(DEFAULT_SAMPLE_INTERVAL_MS),
            ),
            history_capacity: live.history_capacity.unwrap_or(DEFAULT_HISTORY_CAPACITY),
            stability_ratio: live.stability_ratio.unwrap_or(DEFAULT_STABILITY_RATIO),
        };

        Self {
            contour,
            neural,
            live,
        }
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(MODEL_ENV) {
            if !path.trim().is_empty() {
                self.neural.model_path = Some(PathBuf::from(path));
            }
        }
        if let Some(interval) = lookup(SAMPLE_INTERVAL_ENV) {
            let millis: u64 = interval.trim().parse().map_err(|_| {
                ScanError::config(format!(
                    "{SAMPLE_INTERVAL_ENV} must be an integer number of milliseconds"
                ))
            })?;
            self.live.sample_interval = Duration::from_millis(millis);
        }
        Ok(())
    }

    /// Reject out-of-range thresholds and inconsistent sizes
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, value: f32| -> Result<()> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ScanError::config(format!("{name} must be within [0, 1], got {value}")))
            }
        };
        unit("contour.min_area_fraction", self.contour.min_area_fraction)?;
        unit("contour.approx_epsilon_fraction", self.contour.approx_epsilon_fraction)?;
        unit("neural.confidence_threshold", self.neural.options.confidence_threshold)?;
        unit("neural.iou_threshold", self.neural.options.iou_threshold)?;
        unit("neural.min_box_fraction", self.neural.options.min_box_fraction)?;
        unit("live.stability_ratio", self.live.stability_ratio)?;

        if self.contour.canny_low >= self.contour.canny_high {
            return Err(ScanError::config("contour.canny_low must be below canny_high"));
        }
        if self.contour.blur_kernel % 2 == 0 {
            return Err(ScanError::config("contour.blur_kernel must be odd"));
        }
        if self.contour.clahe.tiles == 0 {
            return Err(ScanError::config("contour.clahe_tiles must be at least 1"));
        }
        if self.neural.options.input_size == 0 {
            return Err(ScanError::config("neural.input_size must be greater than zero"));
        }
        if self.live.history_capacity == 0 {
            return Err(ScanError::config("live.history_capacity must be at least 1"));
        }
        if self.live.sample_interval.is_zero() {
            return Err(ScanError::config("live.sample_interval_ms must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ScanConfigFile> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ScanError::config(format!("failed to read config file {}: {e}", path.display()))
    })?;
    toml::from_str(&raw).map_err(|e| {
        ScanError::config(format!("failed to parse config file {}: {e}", path.display()))
    })
}
