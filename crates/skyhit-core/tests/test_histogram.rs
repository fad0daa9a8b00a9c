mod common;

use approx::assert_relative_eq;
use ndarray::Array2;

use common::{frame_from_fn, shape, uniform_frame};
use skyhit_core::trigger::{FrameWeighter, HistogramAccumulator};
use skyhit_core::weight_map::{ByteWeightMap, RoundingMode};

#[test]
fn test_uniform_weighted_frame_fills_one_bin() {
    let hist = HistogramAccumulator::default();
    hist.record_frame(&Array2::from_elem((4, 4), 5u16));
    let snap = hist.snapshot();
    assert_eq!(snap.bins.len(), 1024);
    assert_eq!(snap.bins[5], 16);
    assert_eq!(snap.total(), 16);
    assert!(snap
        .bins
        .iter()
        .enumerate()
        .all(|(v, &c)| v == 5 || c == 0));
}

#[test]
fn test_total_equals_pixel_count() {
    let frame = frame_from_fn(32, 16, |x, y| ((x * y) % 256) as u8);
    let weights = ByteWeightMap::uniform(shape(32, 16), 200);
    let hist = HistogramAccumulator::default();
    hist.record_frame_weighted(&frame, &weights).unwrap();
    assert_eq!(hist.snapshot().total(), 32 * 16);
}

#[test]
fn test_weighted_recording_matches_weighter() {
    let frame = frame_from_fn(16, 16, |x, y| (x * 16 + y) as u8);
    let weights = ByteWeightMap::new(Array2::from_shape_fn((16, 16), |(y, x)| {
        (x * 13 + y * 7) as u8
    }));

    let on_the_fly = HistogramAccumulator::default();
    on_the_fly.record_frame_weighted(&frame, &weights).unwrap();

    let materialized = HistogramAccumulator::default();
    let weighted = FrameWeighter::default()
        .apply_frame_byte(&frame, &weights)
        .unwrap();
    materialized.record_frame(&weighted);

    assert_eq!(on_the_fly.snapshot(), materialized.snapshot());
}

#[test]
fn test_record_weighted_rounding() {
    let hist = HistogramAccumulator::new(RoundingMode::HalfUp);
    // 10 * 128 = 1280, (1280 + 127) / 255 = 5
    hist.record_weighted(10, 128);
    let truncating = HistogramAccumulator::new(RoundingMode::Truncate);
    // 11 * 255 / 255 = 11
    truncating.record_weighted(11, 255);
    assert_eq!(hist.snapshot().bins[5], 1);
    assert_eq!(truncating.snapshot().bins[11], 1);
}

#[test]
fn test_overflow_goes_to_last_bin() {
    let hist = HistogramAccumulator::default();
    hist.record(1023);
    hist.record(5000);
    assert_eq!(hist.snapshot().bins[1023], 2);
}

#[test]
fn test_concurrent_recording() {
    let hist = HistogramAccumulator::default();
    std::thread::scope(|s| {
        for t in 0..4u16 {
            let hist = &hist;
            s.spawn(move || {
                for i in 0..1000u16 {
                    hist.record((i + t) % 8);
                }
            });
        }
    });
    let snap = hist.snapshot();
    assert_eq!(snap.total(), 4000);
    assert_eq!(snap.bins[..8].iter().sum::<u32>(), 4000);
}

#[test]
fn test_large_frame_parallel_recording() {
    let hist = HistogramAccumulator::default();
    hist.record_frame(&Array2::from_elem((256, 512), 3u16));
    assert_eq!(hist.snapshot().bins[3], 256 * 512);
}

#[test]
fn test_clear() {
    let hist = HistogramAccumulator::default();
    hist.record_frame(&uniform_frame(4, 4, 9).data);
    hist.clear();
    assert_eq!(hist.snapshot().total(), 0);
}

#[test]
fn test_summary_statistics() {
    let hist = HistogramAccumulator::default();
    for _ in 0..50 {
        hist.record(0);
        hist.record(10);
    }
    let snap = hist.snapshot();
    assert_relative_eq!(snap.mean(), 5.0);
    assert_eq!(snap.max_value(), Some(10));
    assert_eq!(snap.quantile(0.5), Some(0));
    assert_eq!(snap.quantile(0.9), Some(10));

    let empty = HistogramAccumulator::default().snapshot();
    assert_eq!(empty.quantile(0.5), None);
    assert_eq!(empty.max_value(), None);
    assert_relative_eq!(empty.mean(), 0.0);
}
