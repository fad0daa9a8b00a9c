use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use skyhit_core::calibration::{CalibrationPhase, Calibrator};
use skyhit_core::config::CoreConfig;
use skyhit_core::frame::RawFrame;
use skyhit_core::grid::GridShape;
use skyhit_core::trigger::{FrameProcessor, ThresholdTuner};
use tracing::info;

use crate::summary::{print_calibration_summary, print_trigger_summary, HitRecovery};

#[derive(Args)]
pub struct SimulateArgs {
    /// Sensor width in pixels
    #[arg(long, default_value = "320")]
    pub width: usize,

    /// Sensor height in pixels
    #[arg(long, default_value = "240")]
    pub height: usize,

    /// Live frames to trigger on after calibration
    #[arg(short, long, default_value = "500")]
    pub frames: u32,

    /// Frames per calibration phase, overriding the config
    #[arg(long)]
    pub calibration_frames: Option<u32>,

    /// Number of defective pixels stuck near saturation
    #[arg(long, default_value = "5")]
    pub hot_pixels: usize,

    /// Probability that a live frame carries a particle hit
    #[arg(long, default_value = "0.1")]
    pub hit_rate: f64,

    /// Random seed
    #[arg(long, default_value = "1")]
    pub seed: u64,

    /// L2 trigger description, e.g. "default" or "maxn;npix=10"
    #[arg(long)]
    pub trigger: Option<String>,

    /// Target fraction of live frames passing L1, used to suggest trigger levels
    #[arg(long, default_value = "0.05")]
    pub target_pass: f64,

    /// TOML config file (see `skyhit config`)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Synthetic dark sensor: a dim pedestal under vignetting plus noise, with a
/// few pixels that always read near saturation.
struct SyntheticSensor {
    pedestal: Array2<f32>,
    hot: Vec<(usize, usize)>,
}

const PEDESTAL: f32 = 1.5;
const NOISE: f32 = 3.0;

impl SyntheticSensor {
    fn new(shape: GridShape, hot_pixels: usize, rng: &mut StdRng) -> Self {
        let (cx, cy) = (shape.width as f32 / 2.0, shape.height as f32 / 2.0);
        let r_max = cx * cx + cy * cy;
        let pedestal = Array2::from_shape_fn(shape.dim(), |(y, x)| {
            let (dx, dy) = (x as f32 - cx, y as f32 - cy);
            let vignette = 1.0 - 0.6 * (dx * dx + dy * dy) / r_max;
            PEDESTAL * vignette * rng.random_range(0.9..1.1)
        });
        let hot = (0..hot_pixels)
            .map(|_| {
                (
                    rng.random_range(0..shape.width),
                    rng.random_range(0..shape.height),
                )
            })
            .collect();
        Self { pedestal, hot }
    }

    fn frame(&self, rng: &mut StdRng, hits: &[(usize, usize, u8)]) -> RawFrame {
        let mut data = self
            .pedestal
            .mapv(|p| (p + rng.random_range(0.0..NOISE)).clamp(0.0, 255.0) as u8);
        for &(x, y) in &self.hot {
            data[[y, x]] = rng.random_range(240..=255);
        }
        for &(x, y, v) in hits {
            data[[y, x]] = data[[y, x]].max(v);
        }
        RawFrame::from_u8(data)
    }
}

fn progress_bar(len: u64, label: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!("{label:<12}[{{bar:40}}] {{pos}}/{{len}}"))?
            .progress_chars("=> "),
    );
    Ok(pb)
}

pub fn run(args: &SimulateArgs) -> Result<()> {
    let mut config = match args.config {
        Some(ref path) => super::config::load(path)?,
        None => CoreConfig::default(),
    };
    if let Some(n) = args.calibration_frames {
        config.calibration.weighting_frames = n;
        config.calibration.hotcell_frames = n;
    }
    if let Some(ref description) = args.trigger {
        config.trigger.apply_trigger_string(description);
    }

    let shape = GridShape::new(args.width, args.height)?;
    config.validate(shape)?;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let sensor = SyntheticSensor::new(shape, args.hot_pixels, &mut rng);
    info!(shape = %shape, hot = sensor.hot.len(), seed = args.seed, "Synthetic sensor ready");

    let calibration_len =
        config.calibration.weighting_frames as u64 + config.calibration.hotcell_frames as u64;
    let mut calibrator = Calibrator::new(shape, config.calibration.clone())?;
    let pb = progress_bar(calibration_len, "Calibrating")?;
    let mut phase = calibrator.phase();
    while phase != CalibrationPhase::Complete {
        phase = calibrator.add_frame(&sensor.frame(&mut rng, &[]))?;
        pb.inc(1);
    }
    pb.finish();

    let calibration = calibrator.finalize().context("Calibration failed")?;
    let flagged = sensor
        .hot
        .iter()
        .filter(|&&(x, y)| calibration.mask.contains(x, y))
        .count();
    print_calibration_summary(&config.calibration, &calibration, sensor.hot.len(), flagged);

    let shape_for_hits = calibration.weights.shape();
    let mut processor = FrameProcessor::new(calibration, config.trigger.clone())?;
    let mut recovery = HitRecovery::default();
    let mut tuner = ThresholdTuner::default();
    let pb = progress_bar(args.frames as u64, "Triggering")?;
    for _ in 0..args.frames {
        let hit = rng.random_bool(args.hit_rate.clamp(0.0, 1.0)).then(|| {
            (
                rng.random_range(0..shape_for_hits.width),
                rng.random_range(0..shape_for_hits.height),
                rng.random_range(80..=255u8),
            )
        });
        let frame = match hit {
            Some(h) => sensor.frame(&mut rng, &[h]),
            None => sensor.frame(&mut rng, &[]),
        };
        let outcome = processor.process(&frame)?;
        tuner.record_decision(&outcome.l1);

        if let Some((x, y, _)) = hit {
            recovery.injected += 1;
            let index = shape_for_hits.index(x, y) as u32;
            let found = outcome
                .candidates
                .as_ref()
                .is_some_and(|list| list.iter().any(|c| c.index == index));
            if found {
                recovery.recovered += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish();

    print_trigger_summary(
        &config.trigger,
        &processor.stats(),
        &processor.histogram(),
        &recovery,
        tuner.levels(args.target_pass).map(|levels| (args.target_pass, levels)),
    );
    Ok(())
}
