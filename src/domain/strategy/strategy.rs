use std::fmt;
use std::str::FromStr;

use crate::domain::config::ExperimentConfig;
use crate::domain::dqn::agent::{DqnAgent, TrainingReport};
use crate::domain::environment::node_environment::NodeEnvironment;
use crate::domain::strategy::simple_strategies::{select_min_lifetime_first, select_oldest_first};
use crate::error::ConversionError;

/// Offset between the arrival seed of an experiment and the seed of its learned agents.
const AGENT_SEED_OFFSET: u64 = 0x9E37_79B9_7F4A_7C15;

/// Seed of the random draws of a learned agent, kept apart from the arrival stream.
pub fn agent_seed(experiment_seed: u64) -> u64 {
    experiment_seed.wrapping_add(AGENT_SEED_OFFSET)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyType {
    OldestFirst,
    MinLifetimeFirst,
    Dqn,
}

impl StrategyType {
    pub fn all() -> Vec<StrategyType> {
        vec![StrategyType::OldestFirst, StrategyType::MinLifetimeFirst, StrategyType::Dqn]
    }

    /// Factory method to create the strategy for the given experiment.
    pub fn get_instance(&self, config: &ExperimentConfig) -> Strategy {
        match self {
            StrategyType::OldestFirst => Strategy::OldestFirst,
            StrategyType::MinLifetimeFirst => Strategy::MinLifetimeFirst,
            StrategyType::Dqn => {
                let agent = DqnAgent::new(config.state_size(), config.action_size(), config.dqn.clone(), agent_seed(config.seed));
                Strategy::Learned(Box::new(agent))
            }
        }
    }
}

impl FromStr for StrategyType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "oldest-first" | "fifo" => Ok(StrategyType::OldestFirst),
            "min-lifetime-first" | "shortest-ttl-first" => Ok(StrategyType::MinLifetimeFirst),
            "dqn" => Ok(StrategyType::Dqn),
            _ => Err(ConversionError::UnknownStrategyType(s.to_string())),
        }
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyType::OldestFirst => write!(f, "oldest-first"),
            StrategyType::MinLifetimeFirst => write!(f, "min-lifetime-first"),
            StrategyType::Dqn => write!(f, "dqn"),
        }
    }
}

/// Decision rule choosing the buffer index to transmit next.
#[derive(Debug, Clone)]
pub enum Strategy {
    OldestFirst,
    MinLifetimeFirst,
    Learned(Box<DqnAgent>),
}

impl Strategy {
    pub fn strategy_type(&self) -> StrategyType {
        match self {
            Strategy::OldestFirst => StrategyType::OldestFirst,
            Strategy::MinLifetimeFirst => StrategyType::MinLifetimeFirst,
            Strategy::Learned(_) => StrategyType::Dqn,
        }
    }

    pub fn name(&self) -> String {
        self.strategy_type().to_string()
    }

    /// Index of the unit to transmit, `None` if nothing should be sent.
    ///
    /// Never mutates the environment. The learned variant answers greedily and
    /// may return an index beyond the occupied slots.
    pub fn select_action(&self, env: &NodeEnvironment) -> Option<usize> {
        match self {
            Strategy::OldestFirst => select_oldest_first(env.buffer()),
            Strategy::MinLifetimeFirst => select_min_lifetime_first(env.buffer()),
            Strategy::Learned(agent) => {
                if env.is_empty() {
                    return None;
                }
                Some(agent.greedy_action(&env.observe_state()))
            }
        }
    }

    /// True for a learned strategy that was neither trained nor loaded yet.
    pub fn requires_training(&self) -> bool {
        match self {
            Strategy::Learned(agent) => !agent.is_trained(),
            _ => false,
        }
    }

    /// Training campaign for learned strategies, a no-op for the static ones.
    pub fn train(&mut self, env: &mut NodeEnvironment) -> Option<TrainingReport> {
        match self {
            Strategy::OldestFirst | Strategy::MinLifetimeFirst => None,
            Strategy::Learned(agent) => Some(agent.train(env)),
        }
    }

    pub fn as_agent_mut(&mut self) -> Option<&mut DqnAgent> {
        match self {
            Strategy::Learned(agent) => Some(agent.as_mut()),
            _ => None,
        }
    }
}
