use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::consts::{HALF_UP_OFFSET, MAX_BYTE};
use crate::grid::GridShape;

/// Rounding convention shared by the weighter, the byte-weight formulas and the
/// trigger threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundingMode {
    /// Add half a count before truncating: the sensor is presumed to truncate
    /// its ADC output, so half a count is added back.
    #[default]
    HalfUp,
    /// Plain truncation.
    Truncate,
}

impl RoundingMode {
    pub fn offset(&self) -> f32 {
        match self {
            Self::HalfUp => HALF_UP_OFFSET,
            Self::Truncate => 0.0,
        }
    }

    /// The offset in byte-weight fixed point (127 for half-up).
    pub fn offset_byte(&self) -> u32 {
        (self.offset() * MAX_BYTE as f32) as u32
    }
}

impl std::fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HalfUp => write!(f, "Half-up"),
            Self::Truncate => write!(f, "Truncate"),
        }
    }
}

/// Per-pixel gain correction in [0, 1]. Hot cells carry weight 0.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightMap {
    /// Weights, row-major, shape = (height, width)
    pub data: Array2<f32>,
}

impl WeightMap {
    pub fn new(data: Array2<f32>) -> Self {
        Self { data }
    }

    pub fn uniform(shape: GridShape, weight: f32) -> Self {
        Self::new(Array2::from_elem(shape.dim(), weight))
    }

    pub fn shape(&self) -> GridShape {
        GridShape::of(&self.data)
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[[y, x]]
    }

    /// Quantize to byte weights by truncating `255 * w`.
    pub fn quantize(&self) -> ByteWeightMap {
        ByteWeightMap::new(
            self.data
                .mapv(|w| (w.clamp(0.0, 1.0) * MAX_BYTE as f32) as u8),
        )
    }

    pub fn min(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }
}

/// Byte-quantized weight map: `w / 255` is the effective weight.
#[derive(Clone, Debug, PartialEq)]
pub struct ByteWeightMap {
    pub data: Array2<u8>,
}

impl ByteWeightMap {
    pub fn new(data: Array2<u8>) -> Self {
        Self { data }
    }

    pub fn uniform(shape: GridShape, weight: u8) -> Self {
        Self::new(Array2::from_elem(shape.dim(), weight))
    }

    pub fn shape(&self) -> GridShape {
        GridShape::of(&self.data)
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[[y, x]]
    }

    pub fn to_float(&self) -> WeightMap {
        WeightMap::new(self.data.mapv(|w| w as f32 / MAX_BYTE as f32))
    }
}
