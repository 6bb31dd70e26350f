#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Gridlock simulation.

use std::{fs, path::PathBuf, thread};

use anyhow::{Context, Result};
use clap::Parser;
use gridlock_core::CellKind;
use gridlock_simulation::{RunSummary, Simulation, SimulationConfig, StopHandle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gridlock")]
#[command(about = "Runs a headless grid tower-defence simulation")]
struct Args {
    /// TOML file overriding the default configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks to simulate
    #[arg(long, default_value = "600")]
    ticks: u64,

    /// Seed of the spawn generator
    #[arg(long)]
    seed: Option<u64>,

    /// Board columns including the border walls
    #[arg(long)]
    width: Option<u32>,

    /// Board rows including the border walls
    #[arg(long)]
    height: Option<u32>,

    /// Attacker placement as `column,row`; may be repeated
    #[arg(long = "tower", value_parser = parse_cell)]
    towers: Vec<(i64, i64)>,

    /// Sleep for the configured tick period between ticks
    #[arg(long)]
    realtime: bool,

    /// Print the final board
    #[arg(long)]
    render: bool,
}

fn parse_cell(value: &str) -> Result<(i64, i64), String> {
    let (column, row) = value
        .split_once(',')
        .ok_or_else(|| format!("expected `column,row`, got `{value}`"))?;
    let column = column
        .trim()
        .parse()
        .map_err(|error| format!("invalid column `{column}`: {error}"))?;
    let row = row
        .trim()
        .parse()
        .map_err(|error| format!("invalid row `{row}`: {error}"))?;
    Ok((column, row))
}

/// Entry point for the Gridlock command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let mut simulation = Simulation::new(config).context("failed to build simulation")?;

    for &(column, row) in &args.towers {
        match simulation.request_obstruction(column, row) {
            Ok(attacker) => info!(?attacker, column, row, "placed attacker"),
            Err(reason) => warn!(column, row, %reason, "attacker placement rejected"),
        }
    }

    let stop = StopHandle::new();
    let summary = if args.realtime {
        run_paced(&mut simulation, args.ticks, &stop)?
    } else {
        simulation.run(args.ticks, &stop)?
    };

    if args.render {
        print!("{}", render(&simulation));
    }
    println!(
        "ticks={} spawned={} killed={} arrived={}",
        summary.ticks, summary.spawned, summary.killed, summary.arrived
    );
    Ok(())
}

fn load_config(args: &Args) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            SimulationConfig::from_toml_str(&contents)
                .with_context(|| format!("failed to load config {}", path.display()))?
        }
        None => SimulationConfig::default(),
    };

    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(columns) = args.width {
        config.board.columns = columns;
    }
    if let Some(rows) = args.height {
        config.board.rows = rows;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn run_paced(simulation: &mut Simulation, ticks: u64, stop: &StopHandle) -> Result<RunSummary> {
    let period = simulation.tick_period();
    let mut summary = RunSummary::default();
    while summary.ticks < ticks && !stop.is_stopped() {
        let events = simulation.tick()?;
        summary.record(events);
        thread::sleep(period);
    }
    info!(
        ticks = summary.ticks,
        spawned = summary.spawned,
        killed = summary.killed,
        arrived = summary.arrived,
        "paced run finished"
    );
    Ok(summary)
}

fn render(simulation: &Simulation) -> String {
    let snapshot = simulation.snapshot();
    let mut output = String::with_capacity(snapshot.cells.len() + snapshot.rows as usize);
    for row in snapshot.cells.chunks(snapshot.columns as usize) {
        for cell in row {
            output.push(match cell.kind {
                CellKind::Wall => '#',
                CellKind::Empty => '.',
                CellKind::Path => '+',
                CellKind::Occupied(_) => 'm',
                CellKind::Start => 'S',
                CellKind::End => 'E',
                CellKind::Obstruction => 'T',
            });
        }
        output.push('\n');
    }
    output
}
