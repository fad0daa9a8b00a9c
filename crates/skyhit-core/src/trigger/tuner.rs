use std::collections::VecDeque;

use tracing::debug;

use crate::consts::{DEFAULT_TUNING_WINDOW, TUNING_BINS};

use super::config::TriggerConfig;
use super::l1::L1Decision;

/// Trigger levels derived from recent frame maxima.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TunedLevels {
    pub l1_level: u32,
    pub l2_level: u32,
}

impl TunedLevels {
    pub fn apply(&self, config: &mut TriggerConfig) {
        config.l1_level = self.l1_level;
        config.l2_level = self.l2_level;
    }
}

/// Picks trigger levels that keep the fraction of frames passing at or below
/// a target, from a sliding window of per-frame brightest weighted pixels.
#[derive(Clone, Debug)]
pub struct ThresholdTuner {
    window: usize,
    maxima: VecDeque<u16>,
}

impl Default for ThresholdTuner {
    fn default() -> Self {
        Self::new(DEFAULT_TUNING_WINDOW)
    }
}

impl ThresholdTuner {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            maxima: VecDeque::with_capacity(window),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Frames currently in the window.
    pub fn len(&self) -> usize {
        self.maxima.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maxima.is_empty()
    }

    /// Record the brightest weighted pixel of one frame.
    pub fn record(&mut self, max_pixel: u16) {
        if self.maxima.len() == self.window {
            self.maxima.pop_front();
        }
        self.maxima.push_back(max_pixel);
    }

    pub fn record_decision(&mut self, decision: &L1Decision) {
        self.record(decision.max_pixel);
    }

    pub fn clear(&mut self) {
        self.maxima.clear();
    }

    /// Frames per maximum value; values past the last bin land in it.
    pub fn histogram(&self) -> Vec<u32> {
        let mut bins = vec![0u32; TUNING_BINS];
        for &m in &self.maxima {
            bins[(m as usize).min(TUNING_BINS - 1)] += 1;
        }
        bins
    }

    /// Lowest L1 level `t >= 1` such that at most `target` of the recorded
    /// frames have a maximum of `t` or more, or 0 if every level qualifies.
    /// `None` before any frame is recorded.
    pub fn l1_level(&self, target: f64) -> Option<u32> {
        if self.maxima.is_empty() {
            return None;
        }
        let bins = self.histogram();
        let total = self.maxima.len() as f64;

        // Walk down from the top, counting frames at or above the level.
        let mut above = 0u64;
        for level in (1..TUNING_BINS).rev() {
            above += bins[level] as u64;
            if above as f64 / total > target {
                return Some(level as u32 + 1);
            }
        }
        Some(0)
    }

    /// L1 for `target`, with L2 one count below it. Levels of 2 or less are
    /// shared by both triggers so the per-pixel scan does not flood.
    pub fn levels(&self, target: f64) -> Option<TunedLevels> {
        let l1_level = self.l1_level(target)?;
        let l2_level = if l1_level > 2 { l1_level - 1 } else { l1_level };
        debug!(
            target,
            frames = self.maxima.len(),
            l1_level,
            l2_level,
            "Tuned trigger levels"
        );
        Some(TunedLevels { l1_level, l2_level })
    }
}
