use tracing::{debug, info};

use crate::downsample::Downsampler;
use crate::error::{Result, SkyhitError};
use crate::frame::{RawFrame, SampleDepth};
use crate::grid::GridShape;
use crate::weight_map::{ByteWeightMap, WeightMap};

use super::accumulator::{CalibrationStats, FrameAccumulator};
use super::builder::{WeightMapBuilder, HOT_WEIGHT};
use super::config::CalibrationConfig;
use super::hotcell::{find_spiking_cells, HotcellMask};
use super::order_stats::OrderStatisticsTracker;

/// Stage of a calibration cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationPhase {
    /// Summing frames for the weight map.
    Weighting,
    /// Tracking per-pixel peaks to find spiking cells.
    HotcellSearch,
    /// Every configured frame has been seen; ready to finalize.
    Complete,
}

impl std::fmt::Display for CalibrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weighting => write!(f, "Weighting"),
            Self::HotcellSearch => write!(f, "Hot cell search"),
            Self::Complete => write!(f, "Complete"),
        }
    }
}

/// Output of a calibration cycle.
#[derive(Clone, Debug)]
pub struct Calibration {
    /// Full-resolution weights, hot cells at zero.
    pub weights: WeightMap,
    /// `weights` quantized for the integer trigger path.
    pub byte_weights: ByteWeightMap,
    /// Weights on the coarse grid.
    pub coarse: WeightMap,
    pub mask: HotcellMask,
    pub downsampler: Downsampler,
    /// Frames behind the weight map.
    pub frame_count: u32,
}

/// Drives one calibration cycle: weighting frames, then hot cell frames.
///
/// Frames are taken through `&mut self`, so accumulation is strictly
/// sequential per pixel.
pub struct Calibrator {
    config: CalibrationConfig,
    downsampler: Downsampler,
    builder: WeightMapBuilder,
    accumulator: FrameAccumulator,
    tracker: OrderStatisticsTracker,
    /// Coarse weights from the weighting phase, used to scale hot cell samples.
    preliminary: Option<ByteWeightMap>,
}

impl Calibrator {
    pub fn new(shape: GridShape, config: CalibrationConfig) -> Result<Self> {
        config.validate(shape)?;
        let downsampler = match config.block_size {
            Some(block_size) => Downsampler::new(shape, block_size)?,
            None => Downsampler::auto(shape, config.max_sample_area)?,
        };
        info!(
            shape = %shape,
            block_size = downsampler.block_size(),
            weighting_frames = config.weighting_frames,
            hotcell_frames = config.hotcell_frames,
            "Calibration started"
        );
        Ok(Self {
            builder: WeightMapBuilder::new(config.scheme, config.fudge_factor, config.rounding),
            accumulator: FrameAccumulator::new(shape, config.track_variance),
            tracker: OrderStatisticsTracker::new(shape, config.depth),
            preliminary: None,
            downsampler,
            config,
        })
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn downsampler(&self) -> &Downsampler {
        &self.downsampler
    }

    pub fn accumulator(&self) -> &FrameAccumulator {
        &self.accumulator
    }

    pub fn tracker(&self) -> &OrderStatisticsTracker {
        &self.tracker
    }

    pub fn phase(&self) -> CalibrationPhase {
        if self.accumulator.frame_count() < self.config.weighting_frames {
            CalibrationPhase::Weighting
        } else if self.tracker.frame_count() < self.config.hotcell_frames {
            CalibrationPhase::HotcellSearch
        } else {
            CalibrationPhase::Complete
        }
    }

    /// Feed the next frame. Frames arriving after completion are ignored.
    pub fn add_frame(&mut self, frame: &RawFrame) -> Result<CalibrationPhase> {
        let clamped;
        let frame = if self.config.depth == SampleDepth::Eight && frame.depth != SampleDepth::Eight
        {
            clamped = frame.truncate_to_byte();
            &clamped
        } else {
            frame
        };

        match self.phase() {
            CalibrationPhase::Weighting => {
                self.accumulator.accumulate_frame(frame)?;
                if self.accumulator.frame_count() == self.config.weighting_frames {
                    self.finish_weighting()?;
                }
            }
            CalibrationPhase::HotcellSearch => match &self.preliminary {
                Some(weights) => self.tracker.observe_weighted(frame, weights)?,
                None => self.tracker.observe(frame)?,
            },
            CalibrationPhase::Complete => {
                debug!("Frame received after calibration completed, ignoring");
            }
        }
        Ok(self.phase())
    }

    fn finish_weighting(&mut self) -> Result<()> {
        let zero = self.accumulator.zero_cells();
        info!(
            frames = self.accumulator.frame_count(),
            dead = zero.len(),
            "Weighting phase complete"
        );
        if self.config.relative_hotcells && self.config.hotcell_frames > 0 {
            let (full, _) = self.build_weights(&zero)?;
            self.preliminary = Some(full.quantize());
        }
        Ok(())
    }

    /// Coarse weights over non-hot cells, expanded back to full resolution
    /// with hot cells forced to the sentinel.
    fn build_weights(&self, mask: &HotcellMask) -> Result<(WeightMap, WeightMap)> {
        let stats = self.accumulator.statistics();
        let coarse_stats = CalibrationStats {
            sums: self.downsampler.reduce(&stats.sums, Some(mask))?,
            frame_count: stats.frame_count,
        };
        let coarse_mask = self.downsampler.degenerate_blocks(mask)?;
        let coarse = self.builder.finalize(&coarse_stats, &coarse_mask)?;

        let mut full = WeightMap::new(self.downsampler.expand(&coarse.data)?);
        for (w, &hot) in full.data.iter_mut().zip(mask.as_array().iter()) {
            if hot {
                *w = HOT_WEIGHT;
            }
        }
        Ok((full, coarse))
    }

    /// Close the cycle: collect hot cells and build the final weight maps.
    pub fn finalize(self) -> Result<Calibration> {
        let required = self.config.weighting_frames as u64 + self.config.hotcell_frames as u64;
        if self.phase() != CalibrationPhase::Complete {
            return Err(SkyhitError::CalibrationIncomplete {
                seen: self.accumulator.frame_count() as u64 + self.tracker.frame_count() as u64,
                required,
            });
        }

        let mut mask = self.accumulator.zero_cells();
        if self.config.hotcell_frames > 0 {
            mask.merge(&find_spiking_cells(&self.tracker, self.config.hotcell_fraction));
        }

        let (weights, coarse) = self.build_weights(&mask)?;
        info!(
            hot = mask.len(),
            min_weight = coarse.min(),
            max_weight = coarse.max(),
            "Calibration complete"
        );

        Ok(Calibration {
            byte_weights: weights.quantize(),
            weights,
            coarse,
            mask,
            downsampler: self.downsampler,
            frame_count: self.accumulator.frame_count(),
        })
    }
}
