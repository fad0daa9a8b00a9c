use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkyhitError {
    #[error("Invalid grid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Grid {width}x{height} is not divisible into {block_size}x{block_size} blocks")]
    BlockSizeMismatch {
        width: usize,
        height: usize,
        block_size: usize,
    },

    #[error("Frame shape {actual_width}x{actual_height} does not match {expected_width}x{expected_height}")]
    ShapeMismatch {
        expected_width: usize,
        expected_height: usize,
        actual_width: usize,
        actual_height: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Calibration incomplete: {seen} of {required} frames observed")]
    CalibrationIncomplete { seen: u64, required: u64 },

    #[error("Grid with {cells} cells exceeds the 32-bit pixel index range")]
    PixelIndexOverflow { cells: usize },

    #[error("Luma plane too short: need {needed} bytes, got {actual}")]
    PlaneTooShort { needed: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, SkyhitError>;
