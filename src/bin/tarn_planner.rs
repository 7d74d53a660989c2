//! Tour Planner binary: loads the map artifacts, plans a tour per the JSON
//! configuration, and writes the leg CSVs plus a combined GPX document.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use tarn_tour_planner::conf::Config;
use tarn_tour_planner::logging;
use tarn_tour_planner::maploader;
use tarn_tour_planner::tourplanner;
use tarn_tour_planner::writer;

/// Plans a multi-day tarn tour from a prebuilt map and a JSON configuration.
#[derive(Parser)]
struct Args {
    /// Path to the JSON configuration file, per the filenames/tarn_constraints/
    /// path_cost/path_constraints/map_constraints schema.
    #[arg(short = 'c', long = "config")]
    config: PathBuf,
}

fn main() -> ExitCode {
    if let Err(e) = run() {
        error!("tarn planner failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run() -> anyhow::Result<()> {
    logging::init()?;
    let args = Args::parse();

    let mut stopwatch = benchmark_rs::stopwatch::StopWatch::new();
    stopwatch.start();

    let config = Config::from_file(&args.config)?;

    let (graph, pois) = maploader::load(
        &PathBuf::from(&config.filenames.map_nodes),
        &PathBuf::from(&config.filenames.map_edges),
        &PathBuf::from(&config.filenames.map_tarns),
    )?;

    let seed = stable_seed(&config);
    let tour = tourplanner::plan(&graph, &pois, &config, seed)?;

    writer::write_tour(
        &PathBuf::from(&config.filenames.output_dir),
        &PathBuf::from(&config.filenames.gpx),
        &tour,
        &graph,
    )?;

    info!("tarn planner finished, {} legs, time: {}", tour.legs.len(), stopwatch);
    Ok(())
}

/// A fixed seed keeps simulated annealing reproducible across runs of the
/// same configuration.
fn stable_seed(config: &Config) -> u64 {
    let _ = config;
    0x7461_726e_746f_7572
}
