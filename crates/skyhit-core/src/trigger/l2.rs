use std::cmp::Reverse;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use ndarray::Axis;
use rayon::prelude::*;
use tracing::debug;

use crate::consts::MAX_BYTE;
use crate::error::Result;
use crate::frame::RawFrame;
use crate::grid::GridShape;
use crate::weight_map::{ByteWeightMap, RoundingMode};

use super::config::{MaxNStrategy, TriggerConfig, TriggerPolicy};
use super::threshold::Threshold;

/// A pixel selected by the L2 trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Linear pixel index, `x + width * y`.
    pub index: u32,
    /// `raw * byte_weight`; recorded only in max-N mode.
    pub adjusted: Option<u32>,
}

impl Candidate {
    pub fn position(&self, shape: GridShape) -> (usize, usize) {
        shape.position(self.index as usize)
    }

    /// Rounded weighted value, when the adjusted value was recorded.
    pub fn weighted(&self, rounding: RoundingMode) -> Option<u32> {
        self.adjusted
            .map(|a| (a + rounding.offset_byte()) / MAX_BYTE)
    }
}

/// Candidates of one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateList {
    pub candidates: Vec<Candidate>,
    /// Threshold policy and best-effort max-N: slot reservations made during
    /// the scan. Best-effort max-N does not reserve for pixels that cannot
    /// beat the last slot once the buffer is full, so those go uncounted.
    /// Exact max-N: every pixel that passed the threshold.
    ///
    /// `count > capacity` always means passing pixels were dropped.
    pub count: usize,
    pub capacity: usize,
}

impl CandidateList {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn overflowed(&self) -> bool {
        self.count > self.capacity
    }

    pub fn dropped(&self) -> usize {
        self.count.saturating_sub(self.capacity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }
}

/// Per-pixel, full-resolution hit finder.
///
/// Buffers are allocated once and reused frame after frame; [`reset`](Self::reset)
/// only rewinds the reservation counter, which alone decides which slots are
/// valid.
pub struct L2Trigger {
    shape: GridShape,
    policy: TriggerPolicy,
    strategy: MaxNStrategy,
    threshold: Threshold,
    capacity: usize,
    count: AtomicUsize,
    pixel_index: Vec<AtomicU32>,
    /// Ranked mode only.
    pixel_value: Option<Vec<AtomicU32>>,
}

impl L2Trigger {
    pub fn new(shape: GridShape, config: &TriggerConfig) -> Result<Self> {
        config.validate(shape)?;
        let slots = |n: usize| (0..n).map(|_| AtomicU32::new(0)).collect::<Vec<_>>();
        Ok(Self {
            shape,
            policy: config.policy,
            strategy: config.max_n_strategy,
            threshold: config.l2_threshold(),
            capacity: config.capacity,
            count: AtomicUsize::new(0),
            pixel_index: slots(config.capacity),
            pixel_value: (config.policy == TriggerPolicy::MaxN).then(|| slots(config.capacity)),
        })
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn policy(&self) -> TriggerPolicy {
        self.policy
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Start a new frame.
    pub fn reset(&self) {
        self.count.store(0, Ordering::Release);
        // Zeroed ranks: a racing insertion that reads a slot before its
        // reserver wrote it sees 0, not last frame's value.
        if let Some(values) = &self.pixel_value {
            for v in values {
                v.store(0, Ordering::Relaxed);
            }
        }
    }

    /// Offer one pixel. Safe to call from any number of threads.
    pub fn offer(&self, x: usize, y: usize, raw: u16, weight: u8) {
        let adjusted = raw as u32 * weight as u32;
        if !self.threshold.passes(adjusted) {
            return;
        }
        let index = self.shape.index(x, y) as u32;
        match &self.pixel_value {
            Some(values) => self.insert_ranked(values, index, adjusted),
            None => {
                let slot = self.count.fetch_add(1, Ordering::AcqRel);
                if slot < self.capacity {
                    self.pixel_index[slot].store(index, Ordering::Relaxed);
                }
            }
        }
    }

    /// Lock-free insertion pass. Each slot is read and written atomically,
    /// but a read-compare-write over the slots is not: concurrent inserters
    /// can interleave, losing or duplicating entries. Serial callers always
    /// get the exact top N in descending order.
    fn insert_ranked(&self, values: &[AtomicU32], index: u32, adjusted: u32) {
        let cap = self.capacity;
        if self.count.load(Ordering::Acquire) >= cap
            && adjusted <= values[cap - 1].load(Ordering::Relaxed)
        {
            return;
        }

        let slot = self.count.fetch_add(1, Ordering::AcqRel);
        let mut carry_index = index;
        let mut carry_value = adjusted;
        for j in 0..slot.min(cap) {
            let held = values[j].load(Ordering::Relaxed);
            if carry_value > held {
                let held_index = self.pixel_index[j].load(Ordering::Relaxed);
                values[j].store(carry_value, Ordering::Relaxed);
                self.pixel_index[j].store(carry_index, Ordering::Relaxed);
                carry_index = held_index;
                carry_value = held;
            }
        }
        if slot < cap {
            values[slot].store(carry_value, Ordering::Relaxed);
            self.pixel_index[slot].store(carry_index, Ordering::Relaxed);
        }
    }

    /// Scan a frame. Call [`reset`](Self::reset) first.
    pub fn scan(&self, frame: &RawFrame, weights: &ByteWeightMap) -> Result<()> {
        self.shape.check_matches(frame.shape())?;
        self.shape.check_matches(weights.shape())?;

        if let (Some(values), MaxNStrategy::Exact) = (&self.pixel_value, self.strategy) {
            self.scan_exact(frame, weights, values);
            return Ok(());
        }

        let scan_row = |y: usize| {
            let raw = frame.data.row(y);
            let wrow = weights.data.row(y);
            for (x, (&r, &w)) in raw.iter().zip(wrow.iter()).enumerate() {
                self.offer(x, y, r, w);
            }
        };
        if self.shape.is_parallel() {
            (0..self.shape.height).into_par_iter().for_each(scan_row);
        } else {
            (0..self.shape.height).for_each(scan_row);
        }

        let count = self.count();
        if count > self.capacity {
            debug!(count, capacity = self.capacity, "L2 candidate buffer overflowed");
        }
        Ok(())
    }

    /// Per-row top N merged serially; the result is exact and deterministic.
    /// `count` becomes the number of passing pixels.
    fn scan_exact(&self, frame: &RawFrame, weights: &ByteWeightMap, values: &[AtomicU32]) {
        let cap = self.capacity;
        let width = self.shape.width;
        let threshold = self.threshold;
        let rows = frame
            .data
            .axis_iter(Axis(0))
            .into_par_iter()
            .zip(weights.data.axis_iter(Axis(0)).into_par_iter())
            .enumerate();

        let top = rows
            .fold(
                || TopN::new(cap),
                |mut acc, (y, (raw, wrow))| {
                    for (x, (&r, &w)) in raw.iter().zip(wrow.iter()).enumerate() {
                        let adjusted = r as u32 * w as u32;
                        if threshold.passes(adjusted) {
                            acc.push((x + width * y) as u32, adjusted);
                        }
                    }
                    acc
                },
            )
            .reduce(|| TopN::new(cap), TopN::merge);

        for (slot, &(adjusted, index)) in top.entries.iter().enumerate() {
            values[slot].store(adjusted, Ordering::Relaxed);
            self.pixel_index[slot].store(index, Ordering::Relaxed);
        }
        self.count.store(top.passed, Ordering::Release);
    }

    /// Snapshot the valid slots of the current frame.
    pub fn candidates(&self) -> CandidateList {
        let count = self.count();
        let valid = count.min(self.capacity);
        let candidates = (0..valid)
            .map(|slot| Candidate {
                index: self.pixel_index[slot].load(Ordering::Relaxed),
                adjusted: self
                    .pixel_value
                    .as_ref()
                    .map(|v| v[slot].load(Ordering::Relaxed)),
            })
            .collect();
        CandidateList {
            candidates,
            count,
            capacity: self.capacity,
        }
    }
}

/// Bounded list of `(adjusted, index)` kept in descending order of value,
/// ties broken by ascending index.
struct TopN {
    entries: Vec<(u32, u32)>,
    capacity: usize,
    passed: usize,
}

impl TopN {
    fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity + 1),
            capacity,
            passed: 0,
        }
    }

    fn push(&mut self, index: u32, adjusted: u32) {
        self.passed += 1;
        let key = (Reverse(adjusted), index);
        let at = self
            .entries
            .partition_point(|&(v, i)| (Reverse(v), i) < key);
        if at < self.capacity {
            self.entries.insert(at, (adjusted, index));
            self.entries.truncate(self.capacity);
        }
    }

    fn merge(mut self, other: TopN) -> TopN {
        let passed = self.passed + other.passed;
        for (adjusted, index) in other.entries {
            self.push(index, adjusted);
        }
        self.passed = passed;
        self
    }
}
