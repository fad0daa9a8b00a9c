mod common;

use approx::assert_relative_eq;
use ndarray::{array, Array2};

use common::shape;
use skyhit_core::calibration::{
    CalibrationStats, HotcellMask, WeightMapBuilder, WeightScheme, HOT_WEIGHT,
};
use skyhit_core::weight_map::{ByteWeightMap, RoundingMode, WeightMap};

fn builder(scheme: WeightScheme, fudge: f64) -> WeightMapBuilder {
    WeightMapBuilder::new(scheme, fudge, RoundingMode::HalfUp)
}

#[test]
fn test_uniform_sums_give_unit_weights() {
    for scheme in [WeightScheme::Log, WeightScheme::Linear] {
        let stats = CalibrationStats {
            sums: Array2::from_elem((3, 4), 5000.0),
            frame_count: 100,
        };
        let weights = builder(scheme, 5.0)
            .finalize(&stats, &HotcellMask::new(shape(4, 3)))
            .unwrap();
        for &w in weights.data.iter() {
            assert_relative_eq!(w, 1.0);
        }
    }
}

#[test]
fn test_brighter_cells_get_lower_weight() {
    let stats = CalibrationStats {
        sums: array![[100.0, 200.0, 400.0, 800.0]],
        frame_count: 10,
    };
    let mask = HotcellMask::new(shape(4, 1));
    for scheme in [WeightScheme::Log, WeightScheme::Linear] {
        let weights = builder(scheme, 5.0).finalize(&stats, &mask).unwrap();
        assert_relative_eq!(weights.get(0, 0), 1.0);
        for x in 1..4 {
            assert!(weights.get(x, 0) < weights.get(x - 1, 0));
            assert!(weights.get(x, 0) > 0.0);
        }
    }
}

#[test]
fn test_linear_weights_use_offset_sums() {
    let stats = CalibrationStats {
        sums: array![[100.0, 200.0]],
        frame_count: 1,
    };
    let weights = builder(WeightScheme::Linear, 0.0)
        .finalize(&stats, &HotcellMask::new(shape(2, 1)))
        .unwrap();
    assert_relative_eq!(weights.get(1, 0), (100.5 / 200.5) as f32, epsilon = 1e-6);

    let truncating = WeightMapBuilder::new(WeightScheme::Linear, 0.0, RoundingMode::Truncate)
        .finalize(&stats, &HotcellMask::new(shape(2, 1)))
        .unwrap();
    assert_relative_eq!(truncating.get(1, 0), 0.5, epsilon = 1e-6);
}

#[test]
fn test_log_weights() {
    let stats = CalibrationStats {
        sums: array![[1.0, 3.0]],
        frame_count: 1,
    };
    let weights = builder(WeightScheme::Log, 0.0)
        .finalize(&stats, &HotcellMask::new(shape(2, 1)))
        .unwrap();
    let expected = (1.0f64 / 3.0).ln_1p() / 1.0f64.ln_1p();
    assert_relative_eq!(weights.get(1, 0), expected as f32, epsilon = 1e-6);
}

#[test]
fn test_hot_cells_get_sentinel_and_do_not_normalize() {
    // The hot cell is the dimmest; it must not set the normalization.
    let stats = CalibrationStats {
        sums: array![[0.0, 200.0, 400.0]],
        frame_count: 10,
    };
    let mut mask = HotcellMask::new(shape(3, 1));
    mask.insert(0, 0);
    let weights = builder(WeightScheme::Linear, 0.0).finalize(&stats, &mask).unwrap();
    assert_eq!(weights.get(0, 0), HOT_WEIGHT);
    assert_relative_eq!(weights.get(1, 0), 1.0);
    assert!(weights.get(2, 0) < 1.0);
}

#[test]
fn test_all_hot_map_is_all_sentinel() {
    let stats = CalibrationStats {
        sums: Array2::zeros((2, 2)),
        frame_count: 4,
    };
    let mut mask = HotcellMask::new(shape(2, 2));
    for i in 0..4 {
        mask.insert_index(i);
    }
    let weights = builder(WeightScheme::Log, 5.0).finalize(&stats, &mask).unwrap();
    assert!(weights.data.iter().all(|&w| w == HOT_WEIGHT));
}

#[test]
fn test_quantize_truncates() {
    let weights = WeightMap::new(array![[1.0f32, 0.5, 0.0, 0.999]]);
    let bytes = weights.quantize();
    assert_eq!(bytes.data, array![[255u8, 127, 0, 254]]);
}

#[test]
fn test_byte_weights_back_to_float() {
    let bytes = ByteWeightMap::new(array![[255u8, 51]]);
    let weights = bytes.to_float();
    assert_relative_eq!(weights.get(0, 0), 1.0);
    assert_relative_eq!(weights.get(1, 0), 0.2, epsilon = 1e-6);
}

#[test]
fn test_rounding_offsets() {
    assert_eq!(RoundingMode::HalfUp.offset_byte(), 127);
    assert_eq!(RoundingMode::Truncate.offset_byte(), 0);
    assert_relative_eq!(RoundingMode::HalfUp.offset(), 0.5);
}
