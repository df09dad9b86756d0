use serde::{Deserialize, Serialize};

/// Root of an experiment configuration file.
///
/// Every field except `name` has a default, so a file only needs to list the
/// parameters that differ from the standard scenario.
#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentConfigDto {
    pub name: String,
    #[serde(default = "default_simulation_steps")]
    pub simulation_steps: u64,
    #[serde(default = "default_max_arrivals_per_step")]
    pub max_arrivals_per_step: u32,
    #[serde(default = "default_size_range")]
    pub size_range: RangeDto,
    #[serde(default = "default_lifetime_range")]
    pub lifetime_range: RangeDto,
    #[serde(default = "default_buffer_unit_limit")]
    pub buffer_unit_limit: usize,
    #[serde(default)]
    pub buffer_byte_limit: Option<u64>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub capacity_model: CapacityModelDto,
    #[serde(default)]
    pub link_budget: LinkBudgetDto,
    #[serde(default)]
    pub rewards: RewardDto,
    #[serde(default)]
    pub dqn: Option<DqnDto>,
}

#[derive(Debug, Deserialize, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeDto {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityModelDto {
    pub typ: String,
    #[serde(default)]
    pub max_capacity: Option<f64>,
    #[serde(default)]
    pub capacity: Option<f64>,
}

impl Default for CapacityModelDto {
    fn default() -> Self {
        CapacityModelDto { typ: "ShannonHartley".to_string(), max_capacity: None, capacity: None }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkBudgetDto {
    pub earth_radius_km: f64,
    pub relay_altitude_km: f64,
    pub orbiter_altitude_km: f64,
    pub orbital_period_steps: u64,
    pub transmit_power_w: f64,
    pub transmit_antenna_gain_dbi: f64,
    pub receive_antenna_gain_dbi: f64,
    pub frequency_ghz: f64,
    pub channel_bandwidth_mhz: f64,
    pub system_noise_temperature_k: f64,
}

impl Default for LinkBudgetDto {
    fn default() -> Self {
        LinkBudgetDto {
            earth_radius_km: 6371.0,
            relay_altitude_km: 35786.0,
            orbiter_altitude_km: 550.0,
            orbital_period_steps: 2000,
            transmit_power_w: 10.0,
            transmit_antenna_gain_dbi: 40.0,
            receive_antenna_gain_dbi: 40.0,
            frequency_ghz: 12.0,
            channel_bandwidth_mhz: 500.0,
            system_noise_temperature_k: 150.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RewardDto {
    pub step_cost: f64,
    pub expiry_penalty: f64,
    pub transmit_reward: f64,
    pub invalid_action_penalty: f64,
    pub insufficient_capacity_penalty: f64,
}

impl Default for RewardDto {
    fn default() -> Self {
        RewardDto { step_cost: -1.0, expiry_penalty: -100.0, transmit_reward: 10.0, invalid_action_penalty: -20.0, insufficient_capacity_penalty: -5.0 }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DqnDto {
    pub hidden_layer_sizes: Vec<usize>,
    pub replay_buffer_capacity: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub gamma: f64,
    pub epsilon_start: f64,
    pub epsilon_end: f64,
    pub epsilon_decay: f64,
    pub target_update_frequency: u64,
    pub training_steps: u64,
    pub device: String,
}

impl Default for DqnDto {
    fn default() -> Self {
        DqnDto {
            hidden_layer_sizes: vec![128, 128],
            replay_buffer_capacity: 10000,
            learning_rate: 1e-4,
            batch_size: 128,
            gamma: 0.99,
            epsilon_start: 0.9,
            epsilon_end: 0.05,
            epsilon_decay: 20000.0,
            target_update_frequency: 15,
            training_steps: 50000,
            device: "cpu".to_string(),
        }
    }
}

fn default_simulation_steps() -> u64 {
    100
}

fn default_max_arrivals_per_step() -> u32 {
    20
}

fn default_size_range() -> RangeDto {
    RangeDto { min: 5, max: 10 }
}

fn default_lifetime_range() -> RangeDto {
    RangeDto { min: 5, max: 5 }
}

fn default_buffer_unit_limit() -> usize {
    20
}

fn default_seed() -> u64 {
    12345
}
