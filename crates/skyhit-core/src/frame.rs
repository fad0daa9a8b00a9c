use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SkyhitError};
use crate::grid::GridShape;

/// Native sample width of the sensor readout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleDepth {
    /// 8-bit samples, e.g. the luma plane of a preview stream.
    #[default]
    Eight,
    /// Up to 16-bit samples from a RAW readout.
    Sixteen,
}

impl SampleDepth {
    pub fn max_value(&self) -> u16 {
        match self {
            Self::Eight => u8::MAX as u16,
            Self::Sixteen => u16::MAX,
        }
    }
}

impl std::fmt::Display for SampleDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eight => write!(f, "8-bit"),
            Self::Sixteen => write!(f, "16-bit"),
        }
    }
}

/// A single raw sensor frame.
#[derive(Clone, Debug)]
pub struct RawFrame {
    /// Raw samples, row-major, shape = (height, width)
    pub data: Array2<u16>,
    pub depth: SampleDepth,
}

impl RawFrame {
    pub fn new(data: Array2<u16>, depth: SampleDepth) -> Self {
        Self { data, depth }
    }

    pub fn from_u8(data: Array2<u8>) -> Self {
        Self::new(data.mapv(u16::from), SampleDepth::Eight)
    }

    /// View the luma plane of a planar luma/chroma buffer (NV21, YUV420p, ...).
    ///
    /// The luma plane comes first, one byte per pixel, `row_stride` bytes per
    /// row; anything after it is ignored.
    pub fn from_luma_plane(
        buffer: &[u8],
        width: usize,
        height: usize,
        row_stride: usize,
    ) -> Result<Self> {
        let shape = GridShape::new(width, height)?;
        if row_stride < width {
            return Err(SkyhitError::InvalidConfig(format!(
                "row stride {row_stride} is narrower than width {width}"
            )));
        }
        let needed = row_stride * (height - 1) + width;
        if buffer.len() < needed {
            return Err(SkyhitError::PlaneTooShort {
                needed,
                actual: buffer.len(),
            });
        }
        let data = Array2::from_shape_fn(shape.dim(), |(row, col)| {
            u16::from(buffer[row * row_stride + col])
        });
        Ok(Self::new(data, SampleDepth::Eight))
    }

    /// Clamp a wide readout into the 8-bit domain.
    pub fn truncate_to_byte(&self) -> RawFrame {
        self.clamp_to(u8::MAX as u16)
    }

    /// Clamp every sample to `max`. The result is 8-bit when `max` fits a byte.
    pub fn clamp_to(&self, max: u16) -> RawFrame {
        let depth = if max <= u8::MAX as u16 {
            SampleDepth::Eight
        } else {
            self.depth
        };
        RawFrame::new(self.data.mapv(|v| v.min(max)), depth)
    }

    pub fn shape(&self) -> GridShape {
        GridShape::of(&self.data)
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }
}
