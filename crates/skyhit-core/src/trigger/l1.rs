use ndarray::Array2;

use crate::calibration::HotcellMask;
use crate::downsample::Downsampler;
use crate::error::Result;

/// Coarse, whole-frame decision taken before the per-pixel scan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct L1Decision {
    pub pass: bool,
    /// Brightest block mean of the weighted frame.
    pub max_block: f64,
    /// Mean weighted value over the frame.
    pub mean: f64,
    /// Brightest weighted pixel.
    pub max_pixel: u16,
}

/// First-level trigger on the downsampled weighted frame.
#[derive(Clone, Copy, Debug)]
pub struct L1Trigger {
    level: u32,
    downsampler: Downsampler,
}

impl L1Trigger {
    pub fn new(level: u32, downsampler: Downsampler) -> Self {
        Self { level, downsampler }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn downsampler(&self) -> &Downsampler {
        &self.downsampler
    }

    pub fn evaluate(&self, weighted: &Array2<u16>, mask: Option<&HotcellMask>) -> Result<L1Decision> {
        let coarse = self.downsampler.reduce(weighted, mask)?;
        let max_block = coarse.iter().copied().fold(0.0f64, f64::max);
        let max_pixel = weighted.iter().copied().max().unwrap_or(0);
        let mean = weighted.iter().map(|&v| v as f64).sum::<f64>() / weighted.len().max(1) as f64;
        Ok(L1Decision {
            pass: max_block > self.level as f64,
            max_block,
            mean,
            max_pixel,
        })
    }
}
