use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use cadence_config::CadenceConfig;
use cadence_core::deterministic::TickPolicy;
use cadence_core::timing::Timing;
use cadence_simulator::{Scenario, SimulationSettings, Simulator, Trace};
use cadence_telemetry::logging::EventLogger;
use cadence_telemetry::metrics::MetricsRecorder;

use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "cadence", version, about)]
pub struct Cli {
    /// Configuration file; defaults to config/cadence.yaml plus CADENCE_* overrides
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scenario on the deterministic scheduler and print its state hash
    Simulate(SimulateArgs),
    /// Run a scenario against wall-clock time
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Scenario file; the built-in demo scenario is used when omitted
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,
    #[arg(long)]
    pub steps: Option<usize>,
    #[arg(long)]
    pub step_ms: Option<i64>,
    #[arg(long)]
    pub seed: Option<u64>,
    /// Replay every elapsed period inside a single step
    #[arg(long)]
    pub catch_up: bool,
    #[arg(long)]
    pub validate_hash: Option<String>,
    /// Print Prometheus metrics after the run
    #[arg(long)]
    pub metrics: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,
    #[arg(long, default_value_t = 5_000)]
    pub duration_ms: u64,
}

pub fn load_config(cli: &Cli) -> Result<CadenceConfig, CliError> {
    Ok(match &cli.config {
        Some(path) => CadenceConfig::load_from_path(path)?,
        None => CadenceConfig::load()?,
    })
}

fn load_scenario(path: Option<&PathBuf>) -> Result<Scenario, CliError> {
    Ok(match path {
        Some(path) => Scenario::load_from_path(path)?,
        None => Scenario::demo(),
    })
}

pub fn simulation_settings(config: &CadenceConfig, args: &SimulateArgs) -> SimulationSettings {
    let mut settings = SimulationSettings::from_config(config);
    if let Some(steps) = args.steps {
        settings.steps = steps;
    }
    if let Some(step_ms) = args.step_ms {
        settings.step_ms = step_ms;
    }
    if let Some(seed) = args.seed {
        settings.seed = seed;
    }
    if args.catch_up {
        settings.policy = TickPolicy::CatchUp;
    }
    settings
}

pub fn run_simulation_mode(config: &CadenceConfig, args: SimulateArgs) -> Result<(), CliError> {
    let scenario = load_scenario(args.scenario.as_ref())?;
    let simulator = Simulator::new(simulation_settings(config, &args));
    let metrics = if args.metrics || config.telemetry.metrics {
        Some(MetricsRecorder::new()?)
    } else {
        None
    };

    let report = simulator.run_with(&scenario, |stats| {
        if let Some(metrics) = &metrics {
            metrics.observe(stats);
        }
    })?;

    for event in &report.events {
        EventLogger::log_timer_event(&event.timer, event.kind.as_str(), event.at);
    }
    println!(
        "steps: {} final time: {} ms events: {}",
        report.steps,
        report.final_time,
        report.events.len()
    );
    println!("state hash: {}", report.state_hash);

    if let Some(expected) = args.validate_hash.as_deref() {
        report.validate_hash(expected)?;
        println!("hash validated");
    }
    if let Some(metrics) = &metrics {
        print!("{}", metrics.gather_metrics()?);
    }
    Ok(())
}

pub async fn run_host_mode(args: RunArgs) -> Result<(), CliError> {
    let scenario = load_scenario(args.scenario.as_ref())?;
    let timing = Timing::host()?;
    let started = timing.now();
    let trace = Trace::new();
    let mut installation = scenario.install(&timing, &trace);
    info!(duration_ms = args.duration_ms, "running scenario in real time");

    let deadline = tokio::time::Instant::now() + Duration::from_millis(args.duration_ms);
    let mut poll = tokio::time::interval(Duration::from_millis(10));
    let mut reported = 0;
    while tokio::time::Instant::now() < deadline {
        poll.tick().await;
        installation.observe(timing.now(), &trace);
        let events = trace.events();
        for event in &events[reported..] {
            EventLogger::log_timer_event(&event.timer, event.kind.as_str(), event.at - started);
        }
        reported = events.len();
        if installation.is_quiescent() {
            break;
        }
    }
    installation.shutdown();

    println!(
        "elapsed: {} ms events: {}",
        timing.now() - started,
        trace.len()
    );
    Ok(())
}
