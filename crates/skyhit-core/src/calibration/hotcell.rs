use ndarray::Array2;
use tracing::debug;

use crate::grid::GridShape;

use super::order_stats::OrderStatisticsTracker;

/// Pixels excluded from calibration statistics.
///
/// Membership only grows: there is no way to unmark a cell, so a mask lives
/// for exactly one calibration cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct HotcellMask {
    cells: Array2<bool>,
    count: usize,
}

impl HotcellMask {
    pub fn new(shape: GridShape) -> Self {
        Self {
            cells: Array2::from_elem(shape.dim(), false),
            count: 0,
        }
    }

    pub fn shape(&self) -> GridShape {
        GridShape::of(&self.cells)
    }

    /// Mark `(x, y)` hot. Returns `true` if it was not already marked.
    pub fn insert(&mut self, x: usize, y: usize) -> bool {
        let cell = &mut self.cells[[y, x]];
        if *cell {
            return false;
        }
        *cell = true;
        self.count += 1;
        true
    }

    pub fn insert_index(&mut self, index: usize) -> bool {
        let (x, y) = self.shape().position(index);
        self.insert(x, y)
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        self.cells[[y, x]]
    }

    pub fn contains_index(&self, index: usize) -> bool {
        let (x, y) = self.shape().position(index);
        self.contains(x, y)
    }

    /// Add every cell of `other` (same shape) to this mask.
    pub fn merge(&mut self, other: &HotcellMask) {
        for ((row, col), &hot) in other.cells.indexed_iter() {
            if hot {
                self.insert(col, row);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Boolean view, row-major, `true` = hot.
    pub fn as_array(&self) -> &Array2<bool> {
        &self.cells
    }

    /// Linear indices of the hot cells in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, &hot)| hot.then_some(i))
    }

    /// `(x, y)` coordinates of the hot cells.
    pub fn coords(&self) -> Vec<(usize, usize)> {
        let shape = self.shape();
        self.indices().map(|i| shape.position(i)).collect()
    }
}

/// Smallest second-max value considered hot, chosen so that at most
/// `fraction * area` pixels are at or above it.
pub fn second_max_cutoff(tracker: &OrderStatisticsTracker, fraction: f64) -> u32 {
    let hist = tracker.second_histogram();
    let area = tracker.shape().cells();
    let target = (fraction.clamp(0.0, 1.0) * area as f64) as usize;

    let mut remaining = area;
    let mut cutoff = 0usize;
    while remaining > target && cutoff < hist.len() {
        remaining -= hist[cutoff] as usize;
        cutoff += 1;
    }
    cutoff as u32
}

/// Flag pixels whose second-largest reading is persistently extreme.
///
/// A pixel is hot when its second max reaches the cutoff. Its 3x3 neighbors
/// are hot too when their own max reaches the cutoff, since charge from a
/// defective cell bleeds into adjacent ones.
pub fn find_spiking_cells(tracker: &OrderStatisticsTracker, fraction: f64) -> HotcellMask {
    let shape = tracker.shape();
    let cutoff = second_max_cutoff(tracker, fraction);
    let max1 = tracker.max();
    let max2 = tracker.second();
    let mut mask = HotcellMask::new(shape);

    for ((row, col), &second) in max2.indexed_iter() {
        let second = second as u32;
        if second == 0 || second < cutoff {
            continue;
        }
        mask.insert(col, row);

        let rows = row.saturating_sub(1)..=(row + 1).min(shape.height - 1);
        for nr in rows {
            let cols = col.saturating_sub(1)..=(col + 1).min(shape.width - 1);
            for nc in cols {
                if max1[[nr, nc]] as u32 >= cutoff {
                    mask.insert(nc, nr);
                }
            }
        }
    }

    debug!(cutoff, hot = mask.len(), "Second-max hot cell search complete");
    mask
}
