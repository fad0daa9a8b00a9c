use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::consts::{
    DEFAULT_CANDIDATE_CAPACITY, DEFAULT_L1_LEVEL, DEFAULT_L2_LEVEL, DEFAULT_OUTPUT_MAX,
    HISTOGRAM_BINS,
};
use crate::error::{Result, SkyhitError};
use crate::grid::GridShape;
use crate::weight_map::RoundingMode;

use super::threshold::Threshold;

/// How the L2 trigger fills its candidate buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerPolicy {
    /// Every passing pixel reserves the next slot, in no particular order.
    #[default]
    Threshold,
    /// Keep the `capacity` largest passing pixels, ranked.
    MaxN,
}

impl std::fmt::Display for TriggerPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Threshold => write!(f, "Threshold"),
            Self::MaxN => write!(f, "Max-N"),
        }
    }
}

/// Top-N selection algorithm for [`TriggerPolicy::MaxN`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxNStrategy {
    /// Lock-free insertion into shared slots. Exact when scanned serially;
    /// under parallel scans concurrent insertions may interleave and the
    /// buffer is only approximately the top N.
    #[default]
    BestEffort,
    /// Per-worker top N merged serially. Always exact.
    Exact,
}

/// Weight representation used by the weighter (histogram path).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightPrecision {
    Float,
    #[default]
    Byte,
}

/// Configuration for live triggering.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Coarse trigger level: a frame passes L1 when its brightest weighted
    /// block mean exceeds this.
    #[serde(default = "default_l1_level")]
    pub l1_level: u32,
    /// Per-pixel trigger level on the weighted value.
    #[serde(default = "default_l2_level")]
    pub l2_level: u32,
    #[serde(default)]
    pub policy: TriggerPolicy,
    #[serde(default)]
    pub max_n_strategy: MaxNStrategy,
    /// Candidate buffer size; N in max-N mode.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub rounding: RoundingMode,
    #[serde(default)]
    pub precision: WeightPrecision,
    /// Output range of the weighted frame.
    #[serde(default = "default_output_max")]
    pub output_max: u16,
}

fn default_l1_level() -> u32 {
    DEFAULT_L1_LEVEL
}
fn default_l2_level() -> u32 {
    DEFAULT_L2_LEVEL
}
fn default_capacity() -> usize {
    DEFAULT_CANDIDATE_CAPACITY
}
fn default_output_max() -> u16 {
    DEFAULT_OUTPUT_MAX
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            l1_level: DEFAULT_L1_LEVEL,
            l2_level: DEFAULT_L2_LEVEL,
            policy: TriggerPolicy::default(),
            max_n_strategy: MaxNStrategy::default(),
            capacity: DEFAULT_CANDIDATE_CAPACITY,
            rounding: RoundingMode::default(),
            precision: WeightPrecision::default(),
            output_max: DEFAULT_OUTPUT_MAX,
        }
    }
}

impl TriggerConfig {
    pub fn validate(&self, shape: GridShape) -> Result<()> {
        shape.check_index_range()?;
        if self.capacity == 0 {
            return Err(SkyhitError::InvalidConfig(
                "candidate capacity must be at least 1".into(),
            ));
        }
        if self.output_max == 0 || self.output_max as usize >= HISTOGRAM_BINS {
            return Err(SkyhitError::InvalidConfig(format!(
                "output_max {} must be in 1..{}",
                self.output_max, HISTOGRAM_BINS
            )));
        }
        Ok(())
    }

    pub fn l2_threshold(&self) -> Threshold {
        Threshold::from_level(self.l2_level, self.rounding)
    }

    /// Apply a trigger description of the form `name[;key=value...]`.
    ///
    /// `"default"` selects the threshold policy; `"maxn;npix=N"` selects
    /// max-N with capacity N (25 if missing or unparsable). Unknown names
    /// fall back to the threshold policy.
    pub fn apply_trigger_string(&mut self, description: &str) {
        let mut pieces = description.split(';');
        let name = pieces.next().unwrap_or_default().trim();
        match name {
            "default" => self.policy = TriggerPolicy::Threshold,
            "maxn" => {
                let mut npix = DEFAULT_CANDIDATE_CAPACITY;
                for kv in pieces {
                    let Some((key, value)) = kv.split_once('=') else {
                        continue;
                    };
                    if key.trim() != "npix" {
                        continue;
                    }
                    match value.trim().parse::<usize>() {
                        Ok(n) if n > 0 => npix = n,
                        _ => warn!(value, "Could not parse npix for L2 trigger"),
                    }
                }
                self.policy = TriggerPolicy::MaxN;
                self.capacity = npix;
            }
            other => {
                warn!(name = other, "No L2 trigger named this, using default");
                self.policy = TriggerPolicy::Threshold;
            }
        }
    }
}
