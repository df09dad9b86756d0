use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use relay_link_scheduler::domain::config::ExperimentConfig;
use relay_link_scheduler::domain::simulation::simulation_driver::{format_comparison_table, run_experiment};
use relay_link_scheduler::domain::strategy::strategy::{Strategy, StrategyType};
use relay_link_scheduler::domain::utils::statistics::StatsWriter;
use relay_link_scheduler::{load_experiment_config, logger};

/// Compares transmission schedulers on a GEO relay to LEO orbiter link.
#[derive(Debug, Parser)]
#[command(name = "relay-sim", version, about)]
struct Cli {
    /// Experiment configuration (JSON). The standard scenario is used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Strategy to evaluate, repeatable. All strategies by default.
    #[arg(long = "strategy", value_name = "NAME")]
    strategies: Vec<StrategyType>,

    /// Overrides the random seed of the configuration.
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides the number of evaluated steps.
    #[arg(long)]
    steps: Option<u64>,

    /// Writes per-step statistics as CSV.
    #[arg(long)]
    stats_file: Option<PathBuf>,

    /// Stores the trained DQN parameters.
    #[arg(long)]
    save_model: Option<PathBuf>,

    /// Loads DQN parameters instead of training.
    #[arg(long)]
    load_model: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init();

    let mut config = match &cli.config {
        Some(path) => load_experiment_config(path).with_context(|| format!("could not load configuration '{}'", path.display()))?,
        None => {
            log::info!("No configuration given, using the standard scenario.");
            ExperimentConfig::default()
        }
    };
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    if let Some(steps) = cli.steps {
        config = config.with_simulation_steps(steps);
    }

    let strategy_types = if cli.strategies.is_empty() { StrategyType::all() } else { cli.strategies.clone() };
    let mut strategies: Vec<Strategy> = strategy_types.iter().map(|typ| typ.get_instance(&config)).collect();

    if let Some(path) = &cli.load_model {
        for agent in strategies.iter_mut().filter_map(Strategy::as_agent_mut) {
            agent.load_parameters(path).with_context(|| format!("could not load model '{}'", path.display()))?;
            log::info!("Loaded DQN parameters from '{}', training is skipped.", path.display());
        }
    }

    let mut stats_writer = match &cli.stats_file {
        Some(path) => Some(StatsWriter::create(path).with_context(|| format!("could not create statistics file '{}'", path.display()))?),
        None => None,
    };

    let results = run_experiment(&config, &mut strategies, stats_writer.as_mut())?;

    if let Some(path) = &cli.save_model {
        for agent in strategies.iter_mut().filter_map(Strategy::as_agent_mut) {
            agent.save_parameters(path).with_context(|| format!("could not save model '{}'", path.display()))?;
            log::info!("Saved DQN parameters to '{}'.", path.display());
        }
    }

    println!("{}", format_comparison_table(&results));
    println!("*** Simulation ended.");

    Ok(())
}
