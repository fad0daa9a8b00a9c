pub mod config;
pub mod histogram;
pub mod l1;
pub mod l2;
pub mod processor;
pub mod threshold;
pub mod tuner;
pub mod weighter;

pub use config::{MaxNStrategy, TriggerConfig, TriggerPolicy, WeightPrecision};
pub use histogram::{Histogram, HistogramAccumulator};
pub use l1::{L1Decision, L1Trigger};
pub use l2::{Candidate, CandidateList, L2Trigger};
pub use processor::{FrameOutcome, FrameProcessor, TriggerStats};
pub use threshold::Threshold;
pub use tuner::{ThresholdTuner, TunedLevels};
pub use weighter::FrameWeighter;
