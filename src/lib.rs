use std::path::Path;

use crate::api::experiment_config_dto::ExperimentConfigDto;
use crate::domain::config::ExperimentConfig;
use crate::error::Result;
use crate::loader::parser::parse_json_file;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Reads and validates an experiment configuration file.
pub fn load_experiment_config(file_path: impl AsRef<Path>) -> Result<ExperimentConfig> {
    let path = file_path.as_ref();
    log::info!("Loading experiment configuration from '{}'.", path.display());

    let root_dto: ExperimentConfigDto = parse_json_file::<ExperimentConfigDto>(path)?;
    log::info!("JSON file parsed successfully.");

    let config = ExperimentConfig::try_from(root_dto)?;
    log::info!("Experiment '{}' validated: {} steps, seed {}.", config.name, config.simulation_steps, config.seed);

    Ok(config)
}
