use ndarray::{Array2, Zip};

use crate::error::Result;
use crate::frame::RawFrame;
use crate::grid::GridShape;

use super::hotcell::HotcellMask;

/// Per-pixel sums gathered over one calibration run.
#[derive(Clone, Debug)]
pub struct FrameAccumulator {
    sum: Array2<u64>,
    sum_sq: Option<Array2<u64>>,
    frame_count: u32,
}

/// Summed intensities and the number of frames behind them.
///
/// `sums` may be full resolution or block-averaged; either way each entry is
/// the total of one pixel over `frame_count` frames.
#[derive(Clone, Debug)]
pub struct CalibrationStats {
    pub sums: Array2<f64>,
    pub frame_count: u32,
}

impl CalibrationStats {
    pub fn shape(&self) -> GridShape {
        GridShape::of(&self.sums)
    }

    /// Mean per frame of the cell at `index`, `None` for excluded cells.
    pub fn mean_at(&self, index: usize, mask: &HotcellMask) -> Option<f64> {
        if mask.contains_index(index) || self.frame_count == 0 {
            return None;
        }
        let (x, y) = self.shape().position(index);
        Some(self.sums[[y, x]] / self.frame_count as f64)
    }
}

impl FrameAccumulator {
    pub fn new(shape: GridShape, track_variance: bool) -> Self {
        Self {
            sum: Array2::zeros(shape.dim()),
            sum_sq: track_variance.then(|| Array2::zeros(shape.dim())),
            frame_count: 0,
        }
    }

    pub fn shape(&self) -> GridShape {
        GridShape::of(&self.sum)
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn tracks_variance(&self) -> bool {
        self.sum_sq.is_some()
    }

    /// Add one raw sample to cell `index`. Call at most once per cell per frame.
    pub fn accumulate(&mut self, index: usize, value: u16) {
        let (x, y) = self.shape().position(index);
        let v = value as u64;
        self.sum[[y, x]] += v;
        if let Some(sq) = self.sum_sq.as_mut() {
            sq[[y, x]] += v * v;
        }
    }

    /// Count a frame whose samples were fed through [`accumulate`](Self::accumulate).
    pub fn finish_frame(&mut self) {
        self.frame_count += 1;
    }

    /// Add every sample of `frame` and count it.
    pub fn accumulate_frame(&mut self, frame: &RawFrame) -> Result<()> {
        self.shape().check_matches(frame.shape())?;
        let parallel = self.shape().is_parallel();

        match self.sum_sq.as_mut() {
            Some(sq) => {
                let zip = Zip::from(&mut self.sum).and(sq).and(&frame.data);
                let add = |s: &mut u64, q: &mut u64, &v: &u16| {
                    let v = v as u64;
                    *s += v;
                    *q += v * v;
                };
                if parallel {
                    zip.par_for_each(add);
                } else {
                    zip.for_each(add);
                }
            }
            None => {
                let zip = Zip::from(&mut self.sum).and(&frame.data);
                let add = |s: &mut u64, &v: &u16| *s += v as u64;
                if parallel {
                    zip.par_for_each(add);
                } else {
                    zip.for_each(add);
                }
            }
        }

        self.frame_count += 1;
        Ok(())
    }

    pub fn sums(&self) -> &Array2<u64> {
        &self.sum
    }

    /// Mean per frame for every pixel (zero before the first frame).
    pub fn mean(&self) -> Array2<f64> {
        let n = self.frame_count.max(1) as f64;
        self.sum.mapv(|s| s as f64 / n)
    }

    /// Population variance per pixel, `None` unless variance is tracked.
    pub fn variance(&self) -> Option<Array2<f64>> {
        let sq = self.sum_sq.as_ref()?;
        let n = self.frame_count.max(1) as f64;
        let variance = Zip::from(&self.sum).and(sq).map_collect(|&s, &q| {
            let mean = s as f64 / n;
            (q as f64 / n - mean * mean).max(0.0)
        });
        Some(variance)
    }

    /// Pixels that never registered a count. A zero mean has no defined weight,
    /// so these must be excluded before normalization.
    pub fn zero_cells(&self) -> HotcellMask {
        let mut mask = HotcellMask::new(self.shape());
        for ((row, col), &s) in self.sum.indexed_iter() {
            if s == 0 {
                mask.insert(col, row);
            }
        }
        mask
    }

    pub fn statistics(&self) -> CalibrationStats {
        CalibrationStats {
            sums: self.sum.mapv(|s| s as f64),
            frame_count: self.frame_count,
        }
    }

    /// Start a new run with the same shape.
    pub fn reset(&mut self) {
        self.sum.fill(0);
        if let Some(sq) = self.sum_sq.as_mut() {
            sq.fill(0);
        }
        self.frame_count = 0;
    }
}
