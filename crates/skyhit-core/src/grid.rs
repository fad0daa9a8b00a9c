use serde::{Deserialize, Serialize};

use crate::error::{Result, SkyhitError};

/// Dimensions of a sensor grid. Cells are stored row-major, so the linear
/// index of `(x, y)` is `x + width * y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub width: usize,
    pub height: usize,
}

impl GridShape {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SkyhitError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    /// Shape of a row-major `(rows, cols)` array.
    pub fn of<T>(data: &ndarray::Array2<T>) -> Self {
        let (height, width) = data.dim();
        Self { width, height }
    }

    pub fn cells(&self) -> usize {
        self.width * self.height
    }

    /// `(rows, cols)` for ndarray constructors.
    pub fn dim(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn index(&self, x: usize, y: usize) -> usize {
        x + self.width * y
    }

    pub fn position(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    /// Fails unless every cell can be addressed by a `u32` pixel index.
    pub fn check_index_range(&self) -> Result<()> {
        if u32::try_from(self.cells()).is_err() {
            return Err(SkyhitError::PixelIndexOverflow {
                cells: self.cells(),
            });
        }
        Ok(())
    }

    /// Fails unless `other` has the same dimensions.
    pub fn check_matches(&self, other: GridShape) -> Result<()> {
        if *self != other {
            return Err(SkyhitError::ShapeMismatch {
                expected_width: self.width,
                expected_height: self.height,
                actual_width: other.width,
                actual_height: other.height,
            });
        }
        Ok(())
    }

    pub fn is_parallel(&self) -> bool {
        self.cells() >= crate::consts::PARALLEL_PIXEL_THRESHOLD
    }
}

impl std::fmt::Display for GridShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
