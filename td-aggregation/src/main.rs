use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use td_aggregation::general::input::load_inputs;
use td_aggregation::general::{ScalingTable, SeriesSet};
use td_aggregation::{Pipeline, RunConfig};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the raw and normalized weight of every configured series
    Weights {
        #[arg(long)]
        config: PathBuf,
    },
    /// Select typical days and write the model data
    Run {
        #[arg(long)]
        config: PathBuf,
        /// Run the day selection even if an assignment is persisted
        #[arg(long)]
        force: bool,
    },
    /// Rewrite the model data from the persisted day assignment
    Serialize {
        #[arg(long)]
        config: PathBuf,
    },
}

fn load(config_path: &Path) -> Result<(Pipeline, SeriesSet, ScalingTable)> {
    let config = RunConfig::load(config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;
    let (series, scaling) = load_inputs(&config.inputs)?;
    info!(series = series.len(), nbr_tds = config.nbr_tds, "inputs loaded");
    Ok((Pipeline::new(config), series, scaling))
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Weights { config } => {
            let (pipeline, series, scaling) = load(&config)?;
            let weights = pipeline.weights(&series, &scaling);
            println!("{:<24} {:<12} {:>16} {:>12}", "series", "role", "raw", "normalized");
            for weight in weights.iter() {
                let name = series
                    .get(weight.series)
                    .map(|ts| ts.name())
                    .unwrap_or("?");
                let normalized = weight
                    .normalized
                    .map(|n| format!("{:.6}", n))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<24} {:<12} {:>16.4} {:>12}",
                    name,
                    weight.role.label(),
                    weight.raw,
                    normalized
                );
            }
        }
        Commands::Run { config, force } => {
            let (pipeline, series, scaling) = load(&config)?;
            let selector = pipeline.selector();
            let summary = pipeline.run(&series, &scaling, selector.as_ref(), force)?;
            println!(
                "{} typical days, peak_sh_factor = {:.4}",
                summary.nbr_tds, summary.peak_sh_factor
            );
            for (td, (day, count)) in summary
                .representative_days
                .iter()
                .zip(&summary.day_counts)
                .enumerate()
            {
                println!(
                    "TD {:>3}: {:<7} stands for {:>3} days",
                    td + 1,
                    ems_model::general::calendar::date_label(*day),
                    count
                );
            }
            println!("Model data written to {}", pipeline.model_data_path().display());
        }
        Commands::Serialize { config } => {
            let (pipeline, series, scaling) = load(&config)?;
            let format = pipeline.selector().assignment_format();
            pipeline.reserialize(&series, &scaling, format)?;
            println!("Model data written to {}", pipeline.model_data_path().display());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install logger: {}", e);
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
