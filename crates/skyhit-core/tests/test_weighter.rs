mod common;

use ndarray::Array2;

use common::{frame_from_fn, shape};
use skyhit_core::error::SkyhitError;
use skyhit_core::trigger::FrameWeighter;
use skyhit_core::weight_map::{ByteWeightMap, RoundingMode, WeightMap};

#[test]
fn test_unit_weight_is_identity() {
    let weighter = FrameWeighter::default();
    for raw in 0..=255u16 {
        assert_eq!(weighter.apply(raw, 1.0), raw);
        assert_eq!(weighter.apply_byte(raw, 255), raw);
    }
}

#[test]
fn test_half_up_rounding() {
    let weighter = FrameWeighter::default();
    assert_eq!(weighter.apply(200, 0.5), 100);
    assert_eq!(weighter.apply(201, 0.5), 101);

    let truncating = FrameWeighter::new(RoundingMode::Truncate, 255);
    assert_eq!(truncating.apply(201, 0.5), 100);
    assert_eq!(truncating.apply_byte(201, 127), 100);
}

#[test]
fn test_zero_weight_silences_pixel() {
    let weighter = FrameWeighter::default();
    assert_eq!(weighter.apply(255, 0.0), 0);
    assert_eq!(weighter.apply_byte(255, 0), 0);
}

#[test]
fn test_wide_samples_are_clamped() {
    let weighter = FrameWeighter::default();
    assert_eq!(weighter.apply(1000, 1.0), 255);
    assert_eq!(weighter.apply(1000, 0.5), 128);
    assert_eq!(weighter.apply_byte(1000, 255), 255);

    let wide = FrameWeighter::new(RoundingMode::HalfUp, 1023);
    assert_eq!(wide.apply(1000, 1.0), 1000);
    assert_eq!(wide.apply(4000, 1.0), 1023);
}

#[test]
fn test_byte_weights_track_float_weights() {
    let weighter = FrameWeighter::default();
    for raw in (0..=255u16).step_by(3) {
        for w in 0..=255u8 {
            let float = weighter.apply(raw, w as f32 / 255.0) as i32;
            let byte = weighter.apply_byte(raw, w) as i32;
            assert!(
                (float - byte).abs() <= 1,
                "raw {raw} weight {w}: float {float} byte {byte}"
            );
        }
    }
}

#[test]
fn test_apply_frame() {
    let frame = frame_from_fn(4, 2, |x, y| (10 * (x + y)) as u8);
    let mut weights = WeightMap::uniform(shape(4, 2), 1.0);
    weights.data[[1, 3]] = 0.5;

    let weighted = FrameWeighter::default().apply_frame(&frame, &weights).unwrap();
    assert_eq!(weighted[[0, 2]], 20);
    assert_eq!(weighted[[1, 3]], 20);

    let bytes = FrameWeighter::default()
        .apply_frame_byte(&frame, &weights.quantize())
        .unwrap();
    // 40 * 127 / 255 + half a count.
    assert_eq!(bytes[[1, 3]], 20);
    assert_eq!(bytes[[1, 0]], 10);
}

#[test]
fn test_large_frame_parallel_path() {
    let frame = frame_from_fn(512, 256, |x, _| (x % 256) as u8);
    let weights = ByteWeightMap::uniform(shape(512, 256), 255);
    let weighted = FrameWeighter::default()
        .apply_frame_byte(&frame, &weights)
        .unwrap();
    assert_eq!(weighted, frame.data);
}

#[test]
fn test_shape_mismatch() {
    let frame = frame_from_fn(4, 4, |_, _| 1);
    let weights = WeightMap::new(Array2::from_elem((2, 2), 1.0));
    assert!(matches!(
        FrameWeighter::default().apply_frame(&frame, &weights),
        Err(SkyhitError::ShapeMismatch { .. })
    ));
}
