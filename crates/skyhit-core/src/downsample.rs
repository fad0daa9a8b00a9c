use ndarray::{Array2, Zip};
use num_traits::AsPrimitive;
use tracing::debug;

use crate::calibration::HotcellMask;
use crate::error::{Result, SkyhitError};
use crate::grid::GridShape;

/// Block reduction between the sensor grid and a coarse grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Downsampler {
    shape: GridShape,
    block_size: usize,
}

impl Downsampler {
    /// Fails unless `shape` divides evenly into `block_size` blocks.
    pub fn new(shape: GridShape, block_size: usize) -> Result<Self> {
        if block_size == 0
            || shape.width % block_size != 0
            || shape.height % block_size != 0
        {
            return Err(SkyhitError::BlockSizeMismatch {
                width: shape.width,
                height: shape.height,
                block_size,
            });
        }
        Ok(Self { shape, block_size })
    }

    /// Pick the block size for a grid automatically.
    ///
    /// Blocks must tile both axes, so candidates are divisors of
    /// `gcd(width, height)`; the smallest one keeping the coarse grid within
    /// `max_area` cells wins.
    pub fn auto(shape: GridShape, max_area: usize) -> Result<Self> {
        let tile = gcd(shape.width, shape.height);
        let mut step = ((shape.cells() / max_area.max(1)) as f64).sqrt() as usize;
        step = step.max(1);
        while tile % step != 0 {
            step += 1;
            if step > tile {
                return Err(SkyhitError::InvalidConfig(format!(
                    "no block size tiles {shape} within {max_area} coarse cells"
                )));
            }
        }
        debug!(block_size = step, "Derived downsample block size");
        Self::new(shape, step)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn coarse_shape(&self) -> GridShape {
        GridShape {
            width: self.shape.width / self.block_size,
            height: self.shape.height / self.block_size,
        }
    }

    /// Mean of each block over cells not in `mask`.
    ///
    /// A block whose cells are all hot has no defined mean; it reduces to
    /// exactly `0.0` (see [`degenerate_blocks`](Self::degenerate_blocks)).
    pub fn reduce<T>(&self, grid: &Array2<T>, mask: Option<&HotcellMask>) -> Result<Array2<f64>>
    where
        T: AsPrimitive<f64> + Sync,
    {
        self.shape.check_matches(GridShape::of(grid))?;
        if let Some(mask) = mask {
            self.shape.check_matches(mask.shape())?;
        }

        let b = self.block_size;
        let hot = mask.map(HotcellMask::as_array);
        let block_mean = |(row, col): (usize, usize), out: &mut f64| {
            let mut sum = 0.0f64;
            let mut count = 0usize;
            for y in row * b..(row + 1) * b {
                for x in col * b..(col + 1) * b {
                    if hot.is_some_and(|h| h[[y, x]]) {
                        continue;
                    }
                    sum += grid[[y, x]].as_();
                    count += 1;
                }
            }
            *out = if count > 0 { sum / count as f64 } else { 0.0 };
        };

        let mut coarse = Array2::<f64>::zeros(self.coarse_shape().dim());
        let zip = Zip::indexed(&mut coarse);
        if self.shape.is_parallel() {
            zip.par_for_each(block_mean);
        } else {
            zip.for_each(block_mean);
        }
        Ok(coarse)
    }

    /// Coarse mask of blocks whose every cell is in `mask`.
    pub fn degenerate_blocks(&self, mask: &HotcellMask) -> Result<HotcellMask> {
        self.shape.check_matches(mask.shape())?;
        let b = self.block_size;
        let hot = mask.as_array();
        let coarse_shape = self.coarse_shape();
        let mut degenerate = HotcellMask::new(coarse_shape);
        for row in 0..coarse_shape.height {
            for col in 0..coarse_shape.width {
                let all_hot = (row * b..(row + 1) * b)
                    .all(|y| (col * b..(col + 1) * b).all(|x| hot[[y, x]]));
                if all_hot {
                    degenerate.insert(col, row);
                }
            }
        }
        Ok(degenerate)
    }

    /// Expand a coarse grid back to full resolution, each cell taking the value
    /// of its block.
    pub fn expand<T: Clone>(&self, coarse: &Array2<T>) -> Result<Array2<T>> {
        self.coarse_shape().check_matches(GridShape::of(coarse))?;
        let b = self.block_size;
        Ok(Array2::from_shape_fn(self.shape.dim(), |(y, x)| {
            coarse[[y / b, x / b]].clone()
        }))
    }
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}
