/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Largest byte value; byte weights are fixed-point fractions of this.
pub const MAX_BYTE: u32 = 255;

/// Offset the sensor is presumed to lose by truncating (not rounding) ADC values.
pub const HALF_UP_OFFSET: f32 = 0.5;

/// Number of bins in the weighted-intensity histogram.
pub const HISTOGRAM_BINS: usize = 1024;

/// Default output range of the frame weighter (8-bit pipeline).
pub const DEFAULT_OUTPUT_MAX: u16 = 255;

/// Default number of frames summed for the weight map.
pub const DEFAULT_WEIGHTING_FRAMES: u32 = 1000;

/// Default number of frames scanned for hot cells.
pub const DEFAULT_HOTCELL_FRAMES: u32 = 1000;

/// Default fraction of the sensor allowed above the second-max hot cell cutoff.
pub const DEFAULT_HOTCELL_FRACTION: f64 = 1e-4;

/// Bias added to sparse means in the log weighting scheme.
///
/// About 150 pixels (10% of a downsample block) could plausibly read zero at
/// 99% confidence, so the smallest credible mean is `-ln(1/150) ~ 5` counts.
pub const DEFAULT_FUDGE_FACTOR: f64 = 5.0;

/// Upper bound on the number of coarse cells when the block size is derived
/// automatically.
pub const DEFAULT_MAX_SAMPLE_AREA: usize = 1500;

/// Default L1 (coarse) trigger level.
pub const DEFAULT_L1_LEVEL: u32 = 0;

/// Default L2 (per-pixel) trigger level.
pub const DEFAULT_L2_LEVEL: u32 = 5;

/// Default candidate buffer capacity (also N in max-N mode).
pub const DEFAULT_CANDIDATE_CAPACITY: usize = 25;

/// Frames of per-frame maxima kept for trigger level tuning.
pub const DEFAULT_TUNING_WINDOW: usize = 1000;

/// Bins of the per-frame maximum histogram used for tuning.
pub const TUNING_BINS: usize = 256;
