use console::Style;
use skyhit_core::calibration::{Calibration, CalibrationConfig};
use skyhit_core::trigger::{
    Histogram, MaxNStrategy, TriggerConfig, TriggerPolicy, TriggerStats, TunedLevels,
};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    warn: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            warn: Style::new().yellow(),
        }
    }
}

/// Injected hits against hits found by the L2 trigger.
#[derive(Default)]
pub struct HitRecovery {
    pub injected: u64,
    pub recovered: u64,
}

pub fn print_calibration_summary(
    config: &CalibrationConfig,
    calibration: &Calibration,
    defects: usize,
    defects_flagged: usize,
) {
    let s = Styles::new();
    let ds = &calibration.downsampler;

    println!();
    println!("  {}", s.title.apply_to("Calibration"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(11)));
    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Sensor"),
        s.value.apply_to(ds.shape())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(format!(
            "{} weighting + {} hot cell",
            config.weighting_frames, config.hotcell_frames
        ))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Scheme"),
        s.method.apply_to(format!("{} ({})", config.scheme, config.rounding))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Blocks"),
        s.value.apply_to(format!(
            "{} px -> {}",
            ds.block_size(),
            ds.coarse_shape()
        ))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Weights"),
        s.value.apply_to(format!(
            "{:.3} .. {:.3}",
            calibration.coarse.min(),
            calibration.coarse.max()
        ))
    );

    let hot = format!("{} masked", calibration.mask.len());
    if defects_flagged < defects {
        println!(
            "  {:<14}{} {}",
            s.label.apply_to("Hot cells"),
            s.value.apply_to(hot),
            s.warn.apply_to(format!("({defects_flagged} of {defects} defects)"))
        );
    } else {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Hot cells"),
            s.value.apply_to(hot)
        );
    }
    println!();
}

pub fn print_trigger_summary(
    config: &TriggerConfig,
    stats: &TriggerStats,
    histogram: &Histogram,
    recovery: &HitRecovery,
    suggested: Option<(f64, TunedLevels)>,
) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Trigger"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(7)));
    println!();

    let policy = match (config.policy, config.max_n_strategy) {
        (TriggerPolicy::MaxN, MaxNStrategy::Exact) => format!("Max-N exact, N = {}", config.capacity),
        (TriggerPolicy::MaxN, MaxNStrategy::BestEffort) => format!("Max-N, N = {}", config.capacity),
        (TriggerPolicy::Threshold, _) => format!("Threshold, {} slots", config.capacity),
    };
    println!("  {:<14}{}", s.label.apply_to("Policy"), s.method.apply_to(policy));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Levels"),
        s.value.apply_to(format!("L1 > {}, L2 > {}", config.l1_level, config.l2_level))
    );
    println!();

    println!("  {}", s.header.apply_to("Frames"));
    println!("    {:<12}{}", s.label.apply_to("Processed"), s.value.apply_to(stats.frames));
    println!("    {:<12}{}", s.label.apply_to("L1 pass"), s.value.apply_to(stats.l1_pass));
    println!("    {:<12}{}", s.label.apply_to("L1 skip"), s.value.apply_to(stats.l1_skip));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Candidates"),
        s.value.apply_to(stats.candidates)
    );
    if stats.overflowed > 0 {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Overflowed"),
            s.warn.apply_to(stats.overflowed)
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Weighted pixels"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Mean"),
        s.value.apply_to(format!("{:.2}", histogram.mean()))
    );
    if let Some(q) = histogram.quantile(0.999) {
        println!("    {:<12}{}", s.label.apply_to("99.9%"), s.value.apply_to(q));
    }
    if let Some(max) = histogram.max_value() {
        println!("    {:<12}{}", s.label.apply_to("Max"), s.value.apply_to(max));
    }
    println!();

    if let Some((target, levels)) = suggested {
        println!(
            "  {:<14}{} {}",
            s.label.apply_to("Suggested"),
            s.value.apply_to(format!("L1 > {}, L2 > {}", levels.l1_level, levels.l2_level)),
            s.label.apply_to(format!("(<= {:.1}% of frames)", target * 100.0))
        );
        println!();
    }

    if recovery.injected > 0 {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Hits found"),
            s.value.apply_to(format!("{} / {}", recovery.recovered, recovery.injected))
        );
        println!();
    }
}
