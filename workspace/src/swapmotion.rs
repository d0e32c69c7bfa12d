//! Sawtooth-wave adiabatic passage cooling of a three-level atom with recoil
//! momentum, integrated period by period.

use std::{ path::PathBuf, time::Instant };
use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{ fmt, prelude::*, EnvFilter };
use swapcool::{
    mkdir,
    config::{ ParamTable, RunParams },
    cycle::CycleIntegrator,
    init::ThermalScale,
    master::{ MasterEquation, MotionOperator },
};
use lib::systems::swapmotion::*;

#[derive(Parser, Debug)]
#[command(author, version)]
#[command(about = "Density-matrix simulation of sawtooth-wave adiabatic passage cooling")]
struct Cli {
    /// Output directory
    #[arg(default_value = DEF_OUTDIR)]
    output_dir: PathBuf,

    /// TOML file of simulation parameters
    #[arg(default_value = DEF_CONFIG)]
    config: PathBuf,

    /// Only log warnings and errors
    #[arg(short, long)]
    batch_mode: bool,

    /// Log level (trace, debug, info, warn, error); overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter
        = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.batch_mode { "warn" } else { cli.log_level.as_str() });

    let table
        = ParamTable::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let run = RunParams::from_table(&table)?;
    let op = MotionOperator::from_table(&table)?;
    let decay_rate = table.get_f64("spontaneous_decay_rate")?;
    let index = *op.state_index();

    let scale = ThermalScale { recoil_freq: op.recoil_freq(), decay_rate };
    let rho0 = initial_state(&index, &run, scale)?;
    log_system_info(&op, &run, decay_rate, &rho0);

    mkdir!(cli.output_dir)
        .with_context(|| format!("creating {}", cli.output_dir.display()))?;
    let tag = run_tag(&op, &run);

    let mut recorder = Recorder::new(index, decay_rate);
    let mut integ
        = CycleIntegrator::new(op, run.tolerance)?
        .with_points_per_cycle(run.output_points_per_cycle);
    let start = Instant::now();
    let summary
        = integ.run(&rho0, run.duration, |gt, rho| recorder.record(gt, rho))?;
    info!(
        elapsed_s = start.elapsed().as_secs_f64(),
        passes = summary.passes,
        steps = summary.steps,
        samples = summary.samples,
        "simulation finished"
    );
    if let Some(last) = recorder.last_info() {
        info!(
            trace = last.trace,
            k_rms = last.k_rms,
            k_rms_unleaked = last.k_rms_unleaked,
            "final state"
        );
    }

    recorder.write(&cli.output_dir, &tag)
        .with_context(|| format!("writing output to {}", cli.output_dir.display()))?;
    info!(tag = tag.as_str(), "wrote output");
    Ok(())
}
