use std::fmt;
use std::str::FromStr;

use crate::api::experiment_config_dto::{CapacityModelDto, DqnDto, ExperimentConfigDto, LinkBudgetDto, RangeDto, RewardDto};
use crate::domain::link::capacity_model::CapacityModel;
use crate::error::ConversionError;

/// Inclusive integer range used for the uniform draws of unit sizes and lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRange {
    pub min: i64,
    pub max: i64,
}

impl IntRange {
    pub fn new(min: i64, max: i64) -> Self {
        IntRange { min, max }
    }

    fn try_positive(dto: RangeDto, name: &'static str) -> Result<Self, ConversionError> {
        if dto.min <= 0 {
            return Err(ConversionError::NonPositive(name));
        }
        if dto.min > dto.max {
            return Err(ConversionError::InvalidRange { name, min: dto.min, max: dto.max });
        }
        Ok(IntRange::new(dto.min, dto.max))
    }
}

/// Physical constants of the GEO relay / LEO orbiter link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkBudgetConfig {
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

impl TryFrom<LinkBudgetDto> for LinkBudgetConfig {
    type Error = ConversionError;

    fn try_from(dto: LinkBudgetDto) -> Result<Self, Self::Error> {
        let positives = [
            ("earthRadiusKm", dto.earth_radius_km),
            ("relayAltitudeKm", dto.relay_altitude_km),
            ("orbiterAltitudeKm", dto.orbiter_altitude_km),
            ("transmitPowerW", dto.transmit_power_w),
            ("frequencyGhz", dto.frequency_ghz),
            ("channelBandwidthMhz", dto.channel_bandwidth_mhz),
            ("systemNoiseTemperatureK", dto.system_noise_temperature_k),
        ];
        for (name, value) in positives {
            if !(value > 0.0) {
                return Err(ConversionError::NonPositive(name));
            }
        }
        if dto.orbital_period_steps == 0 {
            return Err(ConversionError::NonPositive("orbitalPeriodSteps"));
        }
        // The orbiter must stay strictly below the relay, otherwise the slant range can reach zero.
        if dto.orbiter_altitude_km >= dto.relay_altitude_km {
            return Err(ConversionError::OutOfRange { name: "orbiterAltitudeKm", value: dto.orbiter_altitude_km });
        }

        Ok(LinkBudgetConfig {
            earth_radius_km: dto.earth_radius_km,
            relay_altitude_km: dto.relay_altitude_km,
            orbiter_altitude_km: dto.orbiter_altitude_km,
            orbital_period_steps: dto.orbital_period_steps,
            transmit_power_w: dto.transmit_power_w,
            transmit_antenna_gain_dbi: dto.transmit_antenna_gain_dbi,
            receive_antenna_gain_dbi: dto.receive_antenna_gain_dbi,
            frequency_ghz: dto.frequency_ghz,
            channel_bandwidth_mhz: dto.channel_bandwidth_mhz,
            system_noise_temperature_k: dto.system_noise_temperature_k,
        })
    }
}

impl Default for LinkBudgetConfig {
    fn default() -> Self {
        // Defaults of the DTO are known to be valid.
        match LinkBudgetConfig::try_from(LinkBudgetDto::default()) {
            Ok(config) => config,
            Err(e) => unreachable!("default link budget is invalid: {}", e),
        }
    }
}

/// Reward shaping applied by the environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardConfig {
    /// Charged once per `advance_time` call.
    pub step_cost: f64,
    /// Charged per expired unit.
    pub expiry_penalty: f64,
    pub transmit_reward: f64,
    pub invalid_action_penalty: f64,
    pub insufficient_capacity_penalty: f64,
}

impl From<RewardDto> for RewardConfig {
    fn from(dto: RewardDto) -> Self {
        RewardConfig {
            step_cost: dto.step_cost,
            expiry_penalty: dto.expiry_penalty,
            transmit_reward: dto.transmit_reward,
            invalid_action_penalty: dto.invalid_action_penalty,
            insufficient_capacity_penalty: dto.insufficient_capacity_penalty,
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        RewardConfig::from(RewardDto::default())
    }
}

/// Compute backend the value estimators are built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,
}

impl FromStr for Device {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            _ => Err(ConversionError::UnknownDevice(s.to_string())),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
        }
    }
}

/// Hyperparameters of the learned scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct DqnConfig {
    pub hidden_layer_sizes: Vec<usize>,
    pub replay_buffer_capacity: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub gamma: f64,
    pub epsilon_start: f64,
    pub epsilon_end: f64,
    pub epsilon_decay: f64,
    /// Hard target synchronization interval in environment steps.
    pub target_update_frequency: u64,
    pub training_steps: u64,
    pub device: Device,
}

impl TryFrom<DqnDto> for DqnConfig {
    type Error = ConversionError;

    fn try_from(dto: DqnDto) -> Result<Self, Self::Error> {
        if dto.hidden_layer_sizes.iter().any(|size| *size == 0) {
            return Err(ConversionError::NonPositive("hiddenLayerSizes"));
        }
        if dto.replay_buffer_capacity == 0 {
            return Err(ConversionError::NonPositive("replayBufferCapacity"));
        }
        if dto.batch_size == 0 {
            return Err(ConversionError::NonPositive("batchSize"));
        }
        if dto.target_update_frequency == 0 {
            return Err(ConversionError::NonPositive("targetUpdateFrequency"));
        }
        if !(dto.learning_rate > 0.0) {
            return Err(ConversionError::NonPositive("learningRate"));
        }
        if !(dto.epsilon_decay > 0.0) {
            return Err(ConversionError::NonPositive("epsilonDecay"));
        }
        if !(0.0..=1.0).contains(&dto.gamma) {
            return Err(ConversionError::OutOfRange { name: "gamma", value: dto.gamma });
        }
        if !(0.0..=1.0).contains(&dto.epsilon_start) {
            return Err(ConversionError::OutOfRange { name: "epsilonStart", value: dto.epsilon_start });
        }
        if !(0.0..=dto.epsilon_start).contains(&dto.epsilon_end) {
            return Err(ConversionError::OutOfRange { name: "epsilonEnd", value: dto.epsilon_end });
        }

        let device = Device::from_str(&dto.device)?;

        Ok(DqnConfig {
            hidden_layer_sizes: dto.hidden_layer_sizes,
            replay_buffer_capacity: dto.replay_buffer_capacity,
            learning_rate: dto.learning_rate,
            batch_size: dto.batch_size,
            gamma: dto.gamma,
            epsilon_start: dto.epsilon_start,
            epsilon_end: dto.epsilon_end,
            epsilon_decay: dto.epsilon_decay,
            target_update_frequency: dto.target_update_frequency,
            training_steps: dto.training_steps,
            device,
        })
    }
}

impl Default for DqnConfig {
    fn default() -> Self {
        match DqnConfig::try_from(DqnDto::default()) {
            Ok(config) => config,
            Err(e) => unreachable!("default DQN configuration is invalid: {}", e),
        }
    }
}

/// Immutable parameter set of one experiment run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    pub name: String,
    pub simulation_steps: u64,
    pub max_arrivals_per_step: u32,
    pub size_range: IntRange,
    pub lifetime_range: IntRange,
    pub buffer_unit_limit: usize,
    pub buffer_byte_limit: Option<u64>,
    /// Random seed for deterministic runs.
    pub seed: u64,
    pub capacity_model: CapacityModel,
    pub link_budget: LinkBudgetConfig,
    pub rewards: RewardConfig,
    pub dqn: DqnConfig,
}

impl ExperimentConfig {
    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of evaluated simulation steps.
    pub fn with_simulation_steps(mut self, steps: u64) -> Self {
        self.simulation_steps = steps;
        self
    }

    /// Set the upper bound of arrivals per step.
    pub fn with_max_arrivals_per_step(mut self, max_arrivals: u32) -> Self {
        self.max_arrivals_per_step = max_arrivals;
        self
    }

    /// Set the buffer limits.
    pub fn with_buffer_limits(mut self, unit_limit: usize, byte_limit: Option<u64>) -> Self {
        self.buffer_unit_limit = unit_limit;
        self.buffer_byte_limit = byte_limit;
        self
    }

    /// Set the size and lifetime ranges of arriving units.
    pub fn with_unit_ranges(mut self, size_range: IntRange, lifetime_range: IntRange) -> Self {
        self.size_range = size_range;
        self.lifetime_range = lifetime_range;
        self
    }

    /// Set the capacity model.
    pub fn with_capacity_model(mut self, capacity_model: CapacityModel) -> Self {
        self.capacity_model = capacity_model;
        self
    }

    /// Set the learned scheduler hyperparameters.
    pub fn with_dqn(mut self, dqn: DqnConfig) -> Self {
        self.dqn = dqn;
        self
    }

    /// Length of the observed state vector: two features per buffer slot.
    pub fn state_size(&self) -> usize {
        self.buffer_unit_limit * 2
    }

    /// One action per buffer slot.
    pub fn action_size(&self) -> usize {
        self.buffer_unit_limit
    }
}

impl TryFrom<ExperimentConfigDto> for ExperimentConfig {
    type Error = ConversionError;

    fn try_from(dto: ExperimentConfigDto) -> Result<Self, Self::Error> {
        if dto.buffer_unit_limit == 0 {
            return Err(ConversionError::NonPositive("bufferUnitLimit"));
        }
        if dto.buffer_byte_limit == Some(0) {
            return Err(ConversionError::NonPositive("bufferByteLimit"));
        }

        let size_range = IntRange::try_positive(dto.size_range, "sizeRange")?;
        let lifetime_range = IntRange::try_positive(dto.lifetime_range, "lifetimeRange")?;
        let capacity_model = CapacityModel::try_from(dto.capacity_model)?;
        let link_budget = LinkBudgetConfig::try_from(dto.link_budget)?;
        let dqn = DqnConfig::try_from(dto.dqn.unwrap_or_default())?;

        Ok(ExperimentConfig {
            name: dto.name,
            simulation_steps: dto.simulation_steps,
            max_arrivals_per_step: dto.max_arrivals_per_step,
            size_range,
            lifetime_range,
            buffer_unit_limit: dto.buffer_unit_limit,
            buffer_byte_limit: dto.buffer_byte_limit,
            seed: dto.seed,
            capacity_model,
            link_budget,
            rewards: RewardConfig::from(dto.rewards),
            dqn,
        })
    }
}

impl Default for ExperimentConfig {
    /// Standard scenario: Shannon-Hartley link, 20 unit slots, 100 byte buffer.
    fn default() -> Self {
        let dto = ExperimentConfigDto {
            name: "Standard scenario".to_string(),
            simulation_steps: 100,
            max_arrivals_per_step: 20,
            size_range: RangeDto { min: 5, max: 10 },
            lifetime_range: RangeDto { min: 5, max: 5 },
            buffer_unit_limit: 20,
            buffer_byte_limit: Some(100),
            seed: 12345,
            capacity_model: CapacityModelDto::default(),
            link_budget: LinkBudgetDto::default(),
            rewards: RewardDto::default(),
            dqn: None,
        };

        match ExperimentConfig::try_from(dto) {
            Ok(config) => config,
            Err(e) => unreachable!("default experiment configuration is invalid: {}", e),
        }
    }
}
