pub mod accumulator;
pub mod builder;
pub mod calibrator;
pub mod config;
pub mod hotcell;
pub mod order_stats;

pub use accumulator::{CalibrationStats, FrameAccumulator};
pub use builder::{WeightMapBuilder, HOT_WEIGHT};
pub use calibrator::{Calibration, CalibrationPhase, Calibrator};
pub use config::{CalibrationConfig, WeightScheme};
pub use hotcell::{find_spiking_cells, second_max_cutoff, HotcellMask};
pub use order_stats::OrderStatisticsTracker;
