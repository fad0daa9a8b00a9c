use tracing::{debug, info};

use crate::calibration::{Calibration, HotcellMask};
use crate::error::Result;
use crate::frame::RawFrame;
use crate::weight_map::{ByteWeightMap, WeightMap};

use super::config::{TriggerConfig, WeightPrecision};
use super::histogram::{Histogram, HistogramAccumulator};
use super::l1::{L1Decision, L1Trigger};
use super::l2::{CandidateList, L2Trigger};
use super::weighter::FrameWeighter;

/// Result of processing one live frame.
#[derive(Clone, Debug)]
pub struct FrameOutcome {
    pub frame_index: u64,
    pub l1: L1Decision,
    /// Present when the frame passed L1 and was scanned.
    pub candidates: Option<CandidateList>,
}

/// Running counters over the live phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TriggerStats {
    pub frames: u64,
    pub l1_pass: u64,
    pub l1_skip: u64,
    pub candidates: u64,
    /// Frames whose candidate buffer overflowed.
    pub overflowed: u64,
}

/// Live phase: weighting, histogramming and the two trigger levels, driven
/// one frame at a time by the caller.
pub struct FrameProcessor {
    config: TriggerConfig,
    weights: WeightMap,
    byte_weights: ByteWeightMap,
    mask: HotcellMask,
    weighter: FrameWeighter,
    l1: L1Trigger,
    l2: L2Trigger,
    histogram: HistogramAccumulator,
    stats: TriggerStats,
}

impl FrameProcessor {
    pub fn new(calibration: Calibration, config: TriggerConfig) -> Result<Self> {
        let shape = calibration.weights.shape();
        config.validate(shape)?;
        let l2 = L2Trigger::new(shape, &config)?;
        info!(
            shape = %shape,
            policy = %config.policy,
            l1_level = config.l1_level,
            l2_level = config.l2_level,
            min_adjusted = l2.threshold().min_adjusted(),
            "Trigger armed"
        );
        Ok(Self {
            weighter: FrameWeighter::new(config.rounding, config.output_max),
            l1: L1Trigger::new(config.l1_level, calibration.downsampler),
            l2,
            histogram: HistogramAccumulator::new(config.rounding),
            weights: calibration.weights,
            byte_weights: calibration.byte_weights,
            mask: calibration.mask,
            stats: TriggerStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    pub fn weights(&self) -> &WeightMap {
        &self.weights
    }

    pub fn byte_weights(&self) -> &ByteWeightMap {
        &self.byte_weights
    }

    pub fn mask(&self) -> &HotcellMask {
        &self.mask
    }

    pub fn stats(&self) -> TriggerStats {
        self.stats
    }

    pub fn histogram(&self) -> Histogram {
        self.histogram.snapshot()
    }

    pub fn clear_histogram(&self) {
        self.histogram.clear();
    }

    /// Change the trigger configuration; thresholds and buffers are rebuilt.
    pub fn reconfigure(&mut self, config: TriggerConfig) -> Result<()> {
        let shape = self.weights.shape();
        config.validate(shape)?;
        self.l2 = L2Trigger::new(shape, &config)?;
        self.l1 = L1Trigger::new(config.l1_level, *self.l1.downsampler());
        self.weighter = FrameWeighter::new(config.rounding, config.output_max);
        debug!(l2_level = config.l2_level, policy = %config.policy, "Trigger reconfigured");
        self.config = config;
        Ok(())
    }

    pub fn process(&mut self, frame: &RawFrame) -> Result<FrameOutcome> {
        // Weighting, histogram and L2 all work on samples within the output range.
        let clamped;
        let frame = if frame.depth.max_value() > self.config.output_max {
            clamped = frame.clamp_to(self.config.output_max);
            &clamped
        } else {
            frame
        };

        let weighted = match self.config.precision {
            WeightPrecision::Float => self.weighter.apply_frame(frame, &self.weights)?,
            WeightPrecision::Byte => self.weighter.apply_frame_byte(frame, &self.byte_weights)?,
        };
        self.histogram.record_frame(&weighted);

        let l1 = self.l1.evaluate(&weighted, Some(&self.mask))?;
        let frame_index = self.stats.frames;
        self.stats.frames += 1;

        if !l1.pass {
            self.stats.l1_skip += 1;
            return Ok(FrameOutcome {
                frame_index,
                l1,
                candidates: None,
            });
        }
        self.stats.l1_pass += 1;

        self.l2.reset();
        self.l2.scan(frame, &self.byte_weights)?;
        let candidates = self.l2.candidates();
        self.stats.candidates += candidates.len() as u64;
        if candidates.overflowed() {
            self.stats.overflowed += 1;
        }

        Ok(FrameOutcome {
            frame_index,
            l1,
            candidates: Some(candidates),
        })
    }
}
