use ndarray::{Array2, Zip};
use tracing::{debug, warn};

use crate::error::Result;
use crate::weight_map::{RoundingMode, WeightMap};

use super::accumulator::CalibrationStats;
use super::config::WeightScheme;
use super::hotcell::HotcellMask;

/// Weight given to excluded cells: their weighted output is always zero.
pub const HOT_WEIGHT: f32 = 0.0;

/// Turns accumulated sums into a normalized weight map.
#[derive(Clone, Debug)]
pub struct WeightMapBuilder {
    pub scheme: WeightScheme,
    /// Counts added to every sum before normalization in the log scheme.
    pub fudge_factor: f64,
    pub rounding: RoundingMode,
}

impl WeightMapBuilder {
    pub fn new(scheme: WeightScheme, fudge_factor: f64, rounding: RoundingMode) -> Self {
        Self {
            scheme,
            fudge_factor,
            rounding,
        }
    }

    /// Normalize `stats` into weights in [0, 1], brighter baselines getting
    /// lower weights. Cells in `mask` get [`HOT_WEIGHT`].
    ///
    /// Cells with a zero sum must already be in `mask`.
    pub fn finalize(&self, stats: &CalibrationStats, mask: &HotcellMask) -> Result<WeightMap> {
        let shape = stats.shape();
        shape.check_matches(mask.shape())?;
        debug_assert!(
            Zip::from(&stats.sums)
                .and(mask.as_array())
                .all(|&s, &hot| hot || s > 0.0),
            "zero-sum cells must be masked before normalization"
        );

        let n = stats.frame_count.max(1) as f64;
        // Unnormalized weight per cell; None for hot cells.
        let raw: Array2<Option<f64>> = match self.scheme {
            WeightScheme::Log => {
                let fudge = self.fudge_factor;
                Zip::from(&stats.sums)
                    .and(mask.as_array())
                    .map_collect(|&s, &hot| {
                        (!hot).then(|| {
                            let mean = s / n + fudge / n;
                            (1.0 / mean).ln_1p()
                        })
                    })
            }
            WeightScheme::Linear => {
                let offset = self.rounding.offset() as f64 * n;
                Zip::from(&stats.sums)
                    .and(mask.as_array())
                    .map_collect(|&s, &hot| (!hot).then(|| 1.0 / (s + offset)))
            }
        };

        // Both schemes are monotone in the sum, so the largest raw weight
        // belongs to the dimmest live cell.
        let max_raw = raw
            .iter()
            .flatten()
            .copied()
            .filter(|w| w.is_finite())
            .fold(0.0f64, f64::max);

        if max_raw <= 0.0 {
            warn!(
                hot = mask.len(),
                cells = shape.cells(),
                "No usable cells for normalization, weight map is all sentinel"
            );
            return Ok(WeightMap::uniform(shape, HOT_WEIGHT));
        }

        debug!(scheme = ?self.scheme, max_raw, "Normalizing weight map");
        let data = raw.mapv(|w| match w {
            Some(w) if w.is_finite() => (w / max_raw).clamp(0.0, 1.0) as f32,
            _ => HOT_WEIGHT,
        });
        Ok(WeightMap::new(data))
    }
}
