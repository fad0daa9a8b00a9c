use std::sync::atomic::{AtomicU32, Ordering};

use ndarray::{Array2, Zip};
use rayon::prelude::*;

use crate::consts::{HISTOGRAM_BINS, MAX_BYTE};
use crate::error::Result;
use crate::frame::RawFrame;
use crate::grid::GridShape;
use crate::weight_map::{ByteWeightMap, RoundingMode};

/// Concurrent 1024-bin histogram of weighted intensities.
///
/// Bin increments are atomic, so any number of workers may record into the
/// same accumulator. Values past the last bin are counted in the last bin.
pub struct HistogramAccumulator {
    bins: Vec<AtomicU32>,
    rounding: RoundingMode,
}

impl Default for HistogramAccumulator {
    fn default() -> Self {
        Self::new(RoundingMode::default())
    }
}

impl HistogramAccumulator {
    pub fn new(rounding: RoundingMode) -> Self {
        Self {
            bins: (0..HISTOGRAM_BINS).map(|_| AtomicU32::new(0)).collect(),
            rounding,
        }
    }

    pub fn record(&self, value: u16) {
        let bin = (value as usize).min(HISTOGRAM_BINS - 1);
        self.bins[bin].fetch_add(1, Ordering::Relaxed);
    }

    /// Record a raw sample weighted on the fly, `(raw * w + offset_byte) / 255`.
    pub fn record_weighted(&self, raw: u16, weight: u8) {
        let adjusted = (raw as u32 * weight as u32 + self.rounding.offset_byte()) / MAX_BYTE;
        self.record(adjusted.min(u16::MAX as u32) as u16);
    }

    /// Record every value of an already weighted frame.
    pub fn record_frame(&self, weighted: &Array2<u16>) {
        let shape = GridShape::of(weighted);
        match weighted.as_slice() {
            Some(values) if shape.is_parallel() => {
                values.par_iter().for_each(|&v| self.record(v));
            }
            _ => weighted.iter().for_each(|&v| self.record(v)),
        }
    }

    /// Record a raw frame against byte weights without materializing the
    /// weighted frame.
    pub fn record_frame_weighted(&self, frame: &RawFrame, weights: &ByteWeightMap) -> Result<()> {
        frame.shape().check_matches(weights.shape())?;
        let zip = Zip::from(&frame.data).and(&weights.data);
        if frame.shape().is_parallel() {
            zip.par_for_each(|&v, &w| self.record_weighted(v, w));
        } else {
            zip.for_each(|&v, &w| self.record_weighted(v, w));
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Histogram {
        Histogram {
            bins: self
                .bins
                .iter()
                .map(|b| b.load(Ordering::Relaxed))
                .collect(),
        }
    }

    /// Zero every bin at the start of a monitoring window.
    pub fn clear(&self) {
        for b in &self.bins {
            b.store(0, Ordering::Relaxed);
        }
    }
}

/// Point-in-time copy of a [`HistogramAccumulator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Histogram {
    pub bins: Vec<u32>,
}

impl Histogram {
    pub fn total(&self) -> u64 {
        self.bins.iter().map(|&c| c as u64).sum()
    }

    pub fn mean(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let weighted: u64 = self
            .bins
            .iter()
            .enumerate()
            .map(|(v, &c)| v as u64 * c as u64)
            .sum();
        weighted as f64 / total as f64
    }

    /// Largest non-empty bin, if any.
    pub fn max_value(&self) -> Option<usize> {
        self.bins.iter().rposition(|&c| c > 0)
    }

    /// Smallest value `v` such that at least `q` of the counts are `<= v`.
    ///
    /// Useful for picking a trigger level that passes a target fraction
    /// `1 - q` of pixels.
    pub fn quantile(&self, q: f64) -> Option<usize> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let target = (q.clamp(0.0, 1.0) * total as f64).ceil() as u64;
        let mut seen = 0u64;
        for (v, &c) in self.bins.iter().enumerate() {
            seen += c as u64;
            if seen >= target.max(1) {
                return Some(v);
            }
        }
        self.max_value()
    }
}
