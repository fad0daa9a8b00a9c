mod common;

use approx::assert_relative_eq;

use common::{frame_from_fn, shape, uniform_frame};
use skyhit_core::calibration::{FrameAccumulator, HotcellMask};

#[test]
fn test_sums_over_frames() {
    let mut acc = FrameAccumulator::new(shape(4, 4), false);
    for v in [10, 20, 30] {
        acc.accumulate_frame(&uniform_frame(4, 4, v)).unwrap();
    }
    assert_eq!(acc.frame_count(), 3);
    assert!(acc.sums().iter().all(|&s| s == 60));
    assert_relative_eq!(acc.mean()[[2, 3]], 20.0);
}

#[test]
fn test_variance_requires_tracking() {
    let mut acc = FrameAccumulator::new(shape(2, 2), false);
    acc.accumulate_frame(&uniform_frame(2, 2, 5)).unwrap();
    assert!(acc.variance().is_none());
}

#[test]
fn test_variance_of_alternating_frames() {
    let mut acc = FrameAccumulator::new(shape(2, 2), true);
    for v in [10, 30, 10, 30] {
        acc.accumulate_frame(&uniform_frame(2, 2, v)).unwrap();
    }
    let var = acc.variance().unwrap();
    // Population variance of {10, 30, 10, 30}.
    assert_relative_eq!(var[[0, 0]], 100.0);
}

#[test]
fn test_per_cell_accumulate() {
    let mut acc = FrameAccumulator::new(shape(3, 2), true);
    acc.accumulate(4, 7);
    acc.finish_frame();
    acc.accumulate(4, 9);
    acc.finish_frame();
    // Index 4 is (x=1, y=1).
    assert_eq!(acc.sums()[[1, 1]], 16);
    assert_eq!(acc.sums()[[0, 0]], 0);
    assert_eq!(acc.frame_count(), 2);
}

#[test]
fn test_zero_cells_marks_dead_pixels() {
    let mut acc = FrameAccumulator::new(shape(4, 4), false);
    let frame = frame_from_fn(4, 4, |x, y| if (x, y) == (2, 1) { 0 } else { 50 });
    for _ in 0..5 {
        acc.accumulate_frame(&frame).unwrap();
    }
    let zero = acc.zero_cells();
    assert_eq!(zero.len(), 1);
    assert!(zero.contains(2, 1));
}

#[test]
fn test_shape_mismatch_is_rejected() {
    let mut acc = FrameAccumulator::new(shape(4, 4), false);
    assert!(acc.accumulate_frame(&uniform_frame(4, 2, 1)).is_err());
    assert_eq!(acc.frame_count(), 0);
}

#[test]
fn test_reset_clears_run() {
    let mut acc = FrameAccumulator::new(shape(2, 2), true);
    acc.accumulate_frame(&uniform_frame(2, 2, 9)).unwrap();
    acc.reset();
    assert_eq!(acc.frame_count(), 0);
    assert!(acc.sums().iter().all(|&s| s == 0));
    assert_relative_eq!(acc.variance().unwrap()[[1, 1]], 0.0);
}

#[test]
fn test_large_frame_parallel_path() {
    // 256x256 crosses the parallel threshold.
    let mut acc = FrameAccumulator::new(shape(256, 256), false);
    let frame = frame_from_fn(256, 256, |x, _| (x % 200) as u8);
    acc.accumulate_frame(&frame).unwrap();
    acc.accumulate_frame(&frame).unwrap();
    assert_eq!(acc.sums()[[10, 150]], 300);
    assert_eq!(acc.sums()[[255, 255]], 110);
}

#[test]
fn test_statistics_mean_skips_masked_cells() {
    let mut acc = FrameAccumulator::new(shape(3, 2), false);
    assert!(!acc.tracks_variance());
    for v in [4, 8] {
        acc.accumulate_frame(&uniform_frame(3, 2, v)).unwrap();
    }
    let stats = acc.statistics();
    assert_eq!(stats.frame_count, 2);
    assert_eq!(stats.shape(), shape(3, 2));

    let mut mask = HotcellMask::new(shape(3, 2));
    mask.insert(2, 1);
    assert_relative_eq!(stats.mean_at(4, &mask).unwrap(), 6.0);
    assert_eq!(stats.mean_at(5, &mask), None);
}

#[test]
fn test_tracks_variance_flag() {
    assert!(FrameAccumulator::new(shape(2, 2), true).tracks_variance());
}
