mod common;

use ndarray::Array2;

use common::{frame_with_hits, shape, uniform_frame};
use skyhit_core::calibration::{Calibration, CalibrationConfig, Calibrator};
use skyhit_core::frame::{RawFrame, SampleDepth};
use skyhit_core::weight_map::RoundingMode;
use skyhit_core::trigger::{
    FrameProcessor, MaxNStrategy, TriggerConfig, TriggerPolicy, WeightPrecision,
};

fn calibrate(width: usize, height: usize) -> Calibration {
    let config = CalibrationConfig {
        weighting_frames: 20,
        hotcell_frames: 0,
        block_size: Some(4),
        ..CalibrationConfig::default()
    };
    let mut calibrator = Calibrator::new(shape(width, height), config).unwrap();
    for _ in 0..20 {
        calibrator.add_frame(&uniform_frame(width, height, 50)).unwrap();
    }
    calibrator.finalize().unwrap()
}

#[test]
fn test_dark_frame_skips_l2() {
    let mut processor = FrameProcessor::new(calibrate(16, 16), TriggerConfig::default()).unwrap();
    let outcome = processor.process(&uniform_frame(16, 16, 0)).unwrap();
    assert!(!outcome.l1.pass);
    assert!(outcome.candidates.is_none());
    assert_eq!(outcome.l1.max_pixel, 0);

    let stats = processor.stats();
    assert_eq!(stats.frames, 1);
    assert_eq!(stats.l1_skip, 1);
    assert_eq!(stats.l1_pass, 0);
}

#[test]
fn test_hit_passes_both_levels() {
    let mut processor = FrameProcessor::new(calibrate(16, 16), TriggerConfig::default()).unwrap();
    processor.process(&uniform_frame(16, 16, 0)).unwrap();
    let outcome = processor
        .process(&frame_with_hits(16, 16, 0, &[(5, 5, 200)]))
        .unwrap();

    assert_eq!(outcome.frame_index, 1);
    assert!(outcome.l1.pass);
    assert_eq!(outcome.l1.max_block, 12.5);
    assert_eq!(outcome.l1.max_pixel, 200);
    let list = outcome.candidates.unwrap();
    assert_eq!(list.count, 1);
    assert_eq!(list.candidates[0].index, 5 + 16 * 5);

    let stats = processor.stats();
    assert_eq!(stats.frames, 2);
    assert_eq!(stats.l1_pass, 1);
    assert_eq!(stats.candidates, 1);
    assert_eq!(stats.overflowed, 0);
}

#[test]
fn test_histogram_counts_every_pixel() {
    let mut processor = FrameProcessor::new(calibrate(8, 8), TriggerConfig::default()).unwrap();
    for _ in 0..3 {
        processor.process(&uniform_frame(8, 8, 5)).unwrap();
    }
    let hist = processor.histogram();
    assert_eq!(hist.total(), 3 * 64);
    assert_eq!(hist.bins[5], 3 * 64);

    processor.clear_histogram();
    assert_eq!(processor.histogram().total(), 0);
}

#[test]
fn test_float_precision_path() {
    let config = TriggerConfig {
        precision: WeightPrecision::Float,
        ..TriggerConfig::default()
    };
    let mut processor = FrameProcessor::new(calibrate(8, 8), config).unwrap();
    processor.process(&uniform_frame(8, 8, 7)).unwrap();
    assert_eq!(processor.histogram().bins[7], 64);
}

#[test]
fn test_sixteen_bit_frames_are_clamped() {
    let mut processor = FrameProcessor::new(calibrate(8, 8), TriggerConfig::default()).unwrap();
    let frame = RawFrame::new(Array2::from_elem((8, 8), 3000u16), SampleDepth::Sixteen);
    let outcome = processor.process(&frame).unwrap();
    assert_eq!(outcome.l1.max_pixel, 255);
    assert_eq!(processor.histogram().bins[255], 64);
}

#[test]
fn test_reconfigure_to_max_n() {
    let mut processor = FrameProcessor::new(calibrate(16, 16), TriggerConfig::default()).unwrap();
    let hits = [(1, 1, 60), (9, 2, 180), (14, 12, 120)];
    let frame = frame_with_hits(16, 16, 0, &hits);

    processor
        .reconfigure(TriggerConfig {
            policy: TriggerPolicy::MaxN,
            max_n_strategy: MaxNStrategy::Exact,
            capacity: 2,
            ..TriggerConfig::default()
        })
        .unwrap();
    assert_eq!(processor.config().policy, TriggerPolicy::MaxN);

    let list = processor.process(&frame).unwrap().candidates.unwrap();
    let indices: Vec<u32> = list.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![9 + 16 * 2, 14 + 16 * 12]);
    assert_eq!(processor.stats().overflowed, 1);
}

#[test]
fn test_reconfigure_rejects_bad_config() {
    let mut processor = FrameProcessor::new(calibrate(8, 8), TriggerConfig::default()).unwrap();
    let bad = TriggerConfig {
        capacity: 0,
        ..TriggerConfig::default()
    };
    assert!(processor.reconfigure(bad).is_err());
    assert_eq!(processor.config().capacity, 25);
}

#[test]
fn test_wrong_frame_shape_is_an_error() {
    let mut processor = FrameProcessor::new(calibrate(8, 8), TriggerConfig::default()).unwrap();
    assert!(processor.process(&uniform_frame(16, 8, 1)).is_err());
    assert_eq!(processor.stats().frames, 0);
}

#[test]
fn test_wide_output_clamps_before_l2() {
    let config = TriggerConfig {
        output_max: 1023,
        policy: TriggerPolicy::MaxN,
        ..TriggerConfig::default()
    };
    let mut processor = FrameProcessor::new(calibrate(4, 4), config).unwrap();
    let mut data = Array2::zeros((4, 4));
    data[[1, 2]] = 5000u16;
    let outcome = processor
        .process(&RawFrame::new(data, SampleDepth::Sixteen))
        .unwrap();

    assert_eq!(outcome.l1.max_pixel, 1023);
    assert_eq!(processor.histogram().max_value(), Some(1023));
    let list = outcome.candidates.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list.candidates[0].index, 2 + 4);
    assert_eq!(list.candidates[0].weighted(RoundingMode::HalfUp), Some(1023));
}
