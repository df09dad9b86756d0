use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

use crate::domain::config::ExperimentConfig;
use crate::domain::environment::data_unit::DataUnit;
use crate::domain::environment::step_stats::StepStats;
use crate::domain::utils::id::DataUnitId;

/// Result category of a transmission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitOutcome {
    Transmitted,
    RejectedInsufficientCapacity,
    RejectedInvalidSelection,
}

/// Reward and counters of one transmission attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransmitResult {
    pub reward: f64,
    /// Either 0 or 1.
    pub transmitted: u64,
    pub success: bool,
    pub outcome: TransmitOutcome,
}

/// The node buffering data units in front of the time-varying link.
///
/// Owns the buffer, the per-step capacity counter and the random generator
/// used for arrivals. A step is driven from outside:
/// 1. `advance_time` recomputes the capacity, admits arrivals and expires units.
/// 2. `attempt_transmit` is called until the capacity is exhausted, the buffer
///    is empty or an attempt is rejected.
#[derive(Debug, Clone)]
pub struct NodeEnvironment {
    config: ExperimentConfig,

    /// Live units in insertion order.
    buffer: VecDeque<DataUnit>,

    /// Aggregate size of all units in `buffer`.
    buffer_load: u64,

    next_unit_id: DataUnitId,

    /// Budget computed by the capacity model for the current step.
    step_capacity: u64,

    remaining_capacity: u64,

    rng: StdRng,
}

impl NodeEnvironment {
    pub fn new(config: ExperimentConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);

        NodeEnvironment {
            config,
            buffer: VecDeque::new(),
            buffer_load: 0,
            next_unit_id: DataUnitId::new(0),
            step_capacity: 0,
            remaining_capacity: 0,
            rng,
        }
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Clears buffer, unit ids and capacity. The random generator keeps its position, see `reseed`.
    pub fn reset(&mut self) -> Vec<f32> {
        self.buffer.clear();
        self.buffer_load = 0;
        self.next_unit_id = DataUnitId::new(0);
        self.step_capacity = 0;
        self.remaining_capacity = 0;

        self.observe_state()
    }

    /// Restarts the arrival generator from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Moves the environment to `step`.
    ///
    /// Arrivals are checked against the buffer as it was before this call, then
    /// every resident unit, including the ones just admitted, ages by one step.
    /// A unit with lifetime `t` is therefore available for `t - 1` transmission
    /// rounds. Returns the time reward (step cost plus expiry penalties) and the counters.
    pub fn advance_time(&mut self, step: u64) -> (f64, StepStats) {
        let mut stats = StepStats::default();

        self.step_capacity = self.config.capacity_model.capacity_budget(step, &self.config.link_budget);
        self.remaining_capacity = self.step_capacity;

        let arrivals = self.rng.random_range(0..=self.config.max_arrivals_per_step);
        for _ in 0..arrivals {
            let size = self.rng.random_range(self.config.size_range.min..=self.config.size_range.max) as u64;
            let lifetime = self.rng.random_range(self.config.lifetime_range.min..=self.config.lifetime_range.max);
            stats.generated += 1;

            if self.admit(size, lifetime).is_none() {
                stats.dropped += 1;
            }
        }

        for unit in self.buffer.iter_mut() {
            unit.decrement_lifetime();
        }

        // Compaction after the aging pass, the buffer is never modified while it is scanned.
        let expired_load: u64 = self.buffer.iter().filter(|unit| unit.is_expired()).map(|unit| unit.size).sum();
        let count_before = self.buffer.len();
        self.buffer.retain(|unit| !unit.is_expired());
        stats.expired = (count_before - self.buffer.len()) as u64;
        self.buffer_load -= expired_load;

        let rewards = &self.config.rewards;
        let time_reward = rewards.step_cost + rewards.expiry_penalty * stats.expired as f64;

        log::debug!(
            "Step {}: capacity {}, generated {}, dropped {}, expired {}, buffered {} units ({} bytes).",
            step,
            self.step_capacity,
            stats.generated,
            stats.dropped,
            stats.expired,
            self.buffer.len(),
            self.buffer_load
        );

        (time_reward, stats)
    }

    /// Appends a unit if both buffer limits still hold afterwards.
    ///
    /// # Returns
    /// The id of the admitted unit, `None` if it was dropped.
    pub fn admit(&mut self, size: u64, lifetime: i64) -> Option<DataUnitId> {
        if !self.can_admit(size) {
            return None;
        }

        let id = self.next_unit_id;
        self.next_unit_id = id.next();
        self.buffer.push_back(DataUnit::new(id, size, lifetime));
        self.buffer_load += size;

        Some(id)
    }

    fn can_admit(&self, size: u64) -> bool {
        let fits_count = self.buffer.len() < self.config.buffer_unit_limit;
        let fits_bytes = self.config.buffer_byte_limit.is_none_or(|limit| self.buffer_load + size <= limit);

        fits_count && fits_bytes
    }

    /// Tries to send the unit at buffer index `action`.
    ///
    /// Invalid selections and units larger than the remaining capacity leave
    /// the buffer untouched and are answered with a penalty.
    pub fn attempt_transmit(&mut self, action: Option<usize>) -> TransmitResult {
        let rewards = self.config.rewards;

        let index = match action {
            Some(index) if index < self.buffer.len() => index,
            _ => {
                return TransmitResult {
                    reward: rewards.invalid_action_penalty,
                    transmitted: 0,
                    success: false,
                    outcome: TransmitOutcome::RejectedInvalidSelection,
                };
            }
        };

        let size = self.buffer[index].size;
        if size > self.remaining_capacity {
            return TransmitResult {
                reward: rewards.insufficient_capacity_penalty,
                transmitted: 0,
                success: false,
                outcome: TransmitOutcome::RejectedInsufficientCapacity,
            };
        }

        if let Some(unit) = self.buffer.remove(index) {
            log::trace!("Transmitted {}.", unit);
        }
        self.remaining_capacity -= size;
        self.buffer_load -= size;

        TransmitResult { reward: rewards.transmit_reward, transmitted: 1, success: true, outcome: TransmitOutcome::Transmitted }
    }

    /// Fixed length encoding of the buffer: `(remaining_lifetime / max_lifetime, size / max_size)`
    /// per resident unit in insertion order, zero padded to the unit limit.
    pub fn observe_state(&self) -> Vec<f32> {
        let limit = self.config.buffer_unit_limit;
        let max_lifetime = self.config.lifetime_range.max as f32;
        let max_size = self.config.size_range.max as f32;

        let mut state = vec![0.0f32; limit * 2];
        for (slot, unit) in self.buffer.iter().take(limit).enumerate() {
            state[slot * 2] = unit.remaining_lifetime as f32 / max_lifetime;
            state[slot * 2 + 1] = unit.size as f32 / max_size;
        }

        state
    }

    pub fn state_size(&self) -> usize {
        self.config.state_size()
    }

    pub fn buffer(&self) -> &VecDeque<DataUnit> {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn buffer_load(&self) -> u64 {
        self.buffer_load
    }

    pub fn step_capacity(&self) -> u64 {
        self.step_capacity
    }

    pub fn remaining_capacity(&self) -> u64 {
        self.remaining_capacity
    }
}
