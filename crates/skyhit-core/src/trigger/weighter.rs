use ndarray::{Array2, Zip};

use crate::consts::{DEFAULT_OUTPUT_MAX, MAX_BYTE};
use crate::error::Result;
use crate::frame::RawFrame;
use crate::weight_map::{ByteWeightMap, RoundingMode, WeightMap};

/// Applies a weight map to live frames.
///
/// Samples wider than the output are clamped to `output_max` before
/// weighting, so live frames land in the numeric domain used at calibration.
#[derive(Clone, Copy, Debug)]
pub struct FrameWeighter {
    pub rounding: RoundingMode,
    pub output_max: u16,
}

impl Default for FrameWeighter {
    fn default() -> Self {
        Self {
            rounding: RoundingMode::default(),
            output_max: DEFAULT_OUTPUT_MAX,
        }
    }
}

impl FrameWeighter {
    pub fn new(rounding: RoundingMode, output_max: u16) -> Self {
        Self {
            rounding,
            output_max,
        }
    }

    /// `floor(raw * weight + offset)`, clamped to the output range.
    pub fn apply(&self, raw: u16, weight: f32) -> u16 {
        let raw = raw.min(self.output_max) as f32;
        let v = (raw * weight + self.rounding.offset()).max(0.0) as u32;
        v.min(self.output_max as u32) as u16
    }

    /// Fixed-point form: `(raw * w + offset_byte) / 255`. Within one count of
    /// [`apply`](Self::apply) with `weight = w / 255`.
    pub fn apply_byte(&self, raw: u16, weight: u8) -> u16 {
        let raw = raw.min(self.output_max) as u32;
        let v = (raw * weight as u32 + self.rounding.offset_byte()) / MAX_BYTE;
        v.min(self.output_max as u32) as u16
    }

    pub fn apply_frame(&self, frame: &RawFrame, weights: &WeightMap) -> Result<Array2<u16>> {
        frame.shape().check_matches(weights.shape())?;
        let zip = Zip::from(&frame.data).and(&weights.data);
        let weigh = |&raw: &u16, &w: &f32| self.apply(raw, w);
        Ok(if frame.shape().is_parallel() {
            zip.par_map_collect(weigh)
        } else {
            zip.map_collect(weigh)
        })
    }

    pub fn apply_frame_byte(&self, frame: &RawFrame, weights: &ByteWeightMap) -> Result<Array2<u16>> {
        frame.shape().check_matches(weights.shape())?;
        let zip = Zip::from(&frame.data).and(&weights.data);
        let weigh = |&raw: &u16, &w: &u8| self.apply_byte(raw, w);
        Ok(if frame.shape().is_parallel() {
            zip.par_map_collect(weigh)
        } else {
            zip.map_collect(weigh)
        })
    }
}
