use ndarray::{Array2, Zip};

use crate::consts::MAX_BYTE;
use crate::error::Result;
use crate::frame::{RawFrame, SampleDepth};
use crate::grid::GridShape;
use crate::weight_map::ByteWeightMap;

/// Running largest and second-largest value per pixel.
///
/// Only the two peaks survive: earlier history is discarded as soon as it is
/// displaced.
#[derive(Clone, Debug)]
pub struct OrderStatisticsTracker {
    max1: Array2<u16>,
    max2: Array2<u16>,
    depth: SampleDepth,
    frame_count: u32,
}

impl OrderStatisticsTracker {
    pub fn new(shape: GridShape, depth: SampleDepth) -> Self {
        Self {
            max1: Array2::zeros(shape.dim()),
            max2: Array2::zeros(shape.dim()),
            depth,
            frame_count: 0,
        }
    }

    pub fn shape(&self) -> GridShape {
        GridShape::of(&self.max1)
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Feed one value for cell `index`, returning the updated `(max1, max2)`.
    pub fn update(&mut self, index: usize, value: u16) -> (u16, u16) {
        let (x, y) = self.shape().position(index);
        let one = &mut self.max1[[y, x]];
        let two = &mut self.max2[[y, x]];
        order(one, two, value);
        (*one, *two)
    }

    /// Feed the raw samples of a whole frame.
    pub fn observe(&mut self, frame: &RawFrame) -> Result<()> {
        self.shape().check_matches(frame.shape())?;
        let ceiling = self.depth.max_value();
        let parallel = self.shape().is_parallel();
        let zip = Zip::from(&mut self.max1)
            .and(&mut self.max2)
            .and(&frame.data);
        if parallel {
            zip.par_for_each(|one, two, &v| order(one, two, v.min(ceiling)));
        } else {
            zip.for_each(|one, two, &v| order(one, two, v.min(ceiling)));
        }
        self.frame_count += 1;
        Ok(())
    }

    /// Feed a frame scaled by byte weights, `min(raw * w / 255, max_sample)`.
    ///
    /// With weights derived from the coarse (neighborhood) baseline this flags
    /// pixels that are hot relative to their surroundings rather than pixels
    /// that are merely in a bright region.
    pub fn observe_weighted(&mut self, frame: &RawFrame, weights: &ByteWeightMap) -> Result<()> {
        self.shape().check_matches(frame.shape())?;
        self.shape().check_matches(weights.shape())?;
        let ceiling = self.depth.max_value() as u32;
        let scale = |raw: u16, w: u8| ((raw as u32 * w as u32 / MAX_BYTE).min(ceiling)) as u16;
        let parallel = self.shape().is_parallel();
        let zip = Zip::from(&mut self.max1)
            .and(&mut self.max2)
            .and(&frame.data)
            .and(&weights.data);
        if parallel {
            zip.par_for_each(|one, two, &v, &w| order(one, two, scale(v, w)));
        } else {
            zip.for_each(|one, two, &v, &w| order(one, two, scale(v, w)));
        }
        self.frame_count += 1;
        Ok(())
    }

    pub fn max(&self) -> &Array2<u16> {
        &self.max1
    }

    pub fn second(&self) -> &Array2<u16> {
        &self.max2
    }

    /// Count of pixels per second-max value, `max_sample + 1` bins.
    pub fn second_histogram(&self) -> Vec<u32> {
        let last = self.depth.max_value() as usize;
        let mut hist = vec![0u32; last + 1];
        for &v in self.max2.iter() {
            hist[(v as usize).min(last)] += 1;
        }
        hist
    }
}

fn order(one: &mut u16, two: &mut u16, value: u16) {
    if value > *two {
        *two = value;
        if *two > *one {
            *two = *one;
            *one = value;
        }
    }
}
