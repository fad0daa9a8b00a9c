use crate::consts::MAX_BYTE;
use crate::weight_map::RoundingMode;

/// Comparison threshold for `raw * byte_weight` products.
///
/// Level `L` means "the rounded weighted value exceeds `L`". In byte fixed
/// point the rounded value is `(adjusted + offset_byte) / 255`, so a pixel
/// passes iff `adjusted >= (L + 1) * 255 - offset_byte`. Derived once per
/// configuration change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Threshold {
    level: u32,
    min_adjusted: u32,
}

impl Threshold {
    pub fn from_level(level: u32, rounding: RoundingMode) -> Self {
        let min_adjusted = (level.saturating_add(1))
            .saturating_mul(MAX_BYTE)
            .saturating_sub(rounding.offset_byte());
        Self {
            level,
            min_adjusted,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Smallest passing `raw * byte_weight` product.
    pub fn min_adjusted(&self) -> u32 {
        self.min_adjusted
    }

    pub fn passes(&self, adjusted: u32) -> bool {
        adjusted >= self.min_adjusted
    }

    /// Threshold test for an already weighted (rounded) value.
    pub fn passes_weighted(&self, weighted: u32) -> bool {
        weighted > self.level
    }
}
