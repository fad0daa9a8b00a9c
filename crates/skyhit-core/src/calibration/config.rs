use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_FUDGE_FACTOR, DEFAULT_HOTCELL_FRACTION, DEFAULT_HOTCELL_FRAMES,
    DEFAULT_MAX_SAMPLE_AREA, DEFAULT_WEIGHTING_FRAMES,
};
use crate::error::{Result, SkyhitError};
use crate::frame::SampleDepth;
use crate::grid::GridShape;
use crate::weight_map::RoundingMode;

/// Normalization applied to accumulated sums.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightScheme {
    /// `log1p(1 / mean)`, normalized by its maximum.
    #[default]
    Log,
    /// `min_sum / sum`, both offset by the rounding correction.
    Linear,
}

impl std::fmt::Display for WeightScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Log => write!(f, "Log"),
            Self::Linear => write!(f, "Linear"),
        }
    }
}

/// Configuration for one calibration cycle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Frames summed into the weight map.
    #[serde(default = "default_weighting_frames")]
    pub weighting_frames: u32,
    /// Frames scanned for spiking (hot) cells after weighting.
    #[serde(default = "default_hotcell_frames")]
    pub hotcell_frames: u32,
    /// Fraction of the sensor allowed at or above the second-max cutoff.
    #[serde(default = "default_hotcell_fraction")]
    pub hotcell_fraction: f64,
    /// Scale hot cell samples by the preliminary coarse weights.
    #[serde(default = "default_true")]
    pub relative_hotcells: bool,
    #[serde(default)]
    pub scheme: WeightScheme,
    #[serde(default = "default_fudge_factor")]
    pub fudge_factor: f64,
    #[serde(default)]
    pub rounding: RoundingMode,
    /// Downsample block edge in pixels. Derived from the grid when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_size: Option<usize>,
    /// Coarse cell budget used when deriving the block size.
    #[serde(default = "default_max_sample_area")]
    pub max_sample_area: usize,
    #[serde(default)]
    pub track_variance: bool,
    #[serde(default)]
    pub depth: SampleDepth,
}

fn default_weighting_frames() -> u32 {
    DEFAULT_WEIGHTING_FRAMES
}
fn default_hotcell_frames() -> u32 {
    DEFAULT_HOTCELL_FRAMES
}
fn default_hotcell_fraction() -> f64 {
    DEFAULT_HOTCELL_FRACTION
}
fn default_fudge_factor() -> f64 {
    DEFAULT_FUDGE_FACTOR
}
fn default_max_sample_area() -> usize {
    DEFAULT_MAX_SAMPLE_AREA
}
fn default_true() -> bool {
    true
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            weighting_frames: DEFAULT_WEIGHTING_FRAMES,
            hotcell_frames: DEFAULT_HOTCELL_FRAMES,
            hotcell_fraction: DEFAULT_HOTCELL_FRACTION,
            relative_hotcells: true,
            scheme: WeightScheme::default(),
            fudge_factor: DEFAULT_FUDGE_FACTOR,
            rounding: RoundingMode::default(),
            block_size: None,
            max_sample_area: DEFAULT_MAX_SAMPLE_AREA,
            track_variance: false,
            depth: SampleDepth::default(),
        }
    }
}

impl CalibrationConfig {
    /// Check the configuration against the grid it will calibrate.
    pub fn validate(&self, shape: GridShape) -> Result<()> {
        shape.check_index_range()?;
        if self.weighting_frames == 0 {
            return Err(SkyhitError::InvalidConfig(
                "weighting_frames must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.hotcell_fraction) {
            return Err(SkyhitError::InvalidConfig(format!(
                "hotcell_fraction {} is outside [0, 1]",
                self.hotcell_fraction
            )));
        }
        if !self.fudge_factor.is_finite() || self.fudge_factor < 0.0 {
            return Err(SkyhitError::InvalidConfig(format!(
                "fudge_factor {} must be finite and non-negative",
                self.fudge_factor
            )));
        }
        if self.weighting_frames.checked_add(self.hotcell_frames).is_none() {
            return Err(SkyhitError::InvalidConfig(format!(
                "{} weighting + {} hot cell frames overflow the frame counter",
                self.weighting_frames, self.hotcell_frames
            )));
        }
        // Sums of squares are the widest quantity accumulated per pixel.
        let max = self.depth.max_value() as u64;
        if (self.weighting_frames as u64)
            .checked_mul(max * max)
            .is_none()
        {
            return Err(SkyhitError::InvalidConfig(format!(
                "{} frames of {} samples overflow the 64-bit accumulator",
                self.weighting_frames, self.depth
            )));
        }
        if let Some(block_size) = self.block_size {
            crate::downsample::Downsampler::new(shape, block_size)?;
        }
        Ok(())
    }
}
