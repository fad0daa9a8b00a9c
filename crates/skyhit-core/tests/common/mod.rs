#![allow(dead_code)]

use ndarray::Array2;

use skyhit_core::frame::RawFrame;
use skyhit_core::grid::GridShape;

/// Build an 8-bit frame where every pixel reads `value`.
pub fn uniform_frame(width: usize, height: usize, value: u16) -> RawFrame {
    RawFrame::from_u8(Array2::from_elem((height, width), value as u8))
}

/// Build an 8-bit frame from a per-pixel function of `(x, y)`.
pub fn frame_from_fn(
    width: usize,
    height: usize,
    f: impl Fn(usize, usize) -> u8,
) -> RawFrame {
    RawFrame::from_u8(Array2::from_shape_fn((height, width), |(y, x)| f(x, y)))
}

/// Uniform frame with a few pixels overridden.
pub fn frame_with_hits(
    width: usize,
    height: usize,
    background: u8,
    hits: &[(usize, usize, u8)],
) -> RawFrame {
    let mut data = Array2::from_elem((height, width), background);
    for &(x, y, v) in hits {
        data[[y, x]] = v;
    }
    RawFrame::from_u8(data)
}

pub fn shape(width: usize, height: usize) -> GridShape {
    GridShape::new(width, height).expect("valid shape")
}

/// Sum of a frame's samples.
pub fn frame_sum(frame: &RawFrame) -> u64 {
    frame.data.iter().map(|&v| v as u64).sum()
}
