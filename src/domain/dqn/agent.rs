use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::path::Path;

use crate::domain::config::DqnConfig;
use crate::domain::dqn::optimizer::AdamOptimizer;
use crate::domain::dqn::q_network::{QNetwork, TrainingSample};
use crate::domain::dqn::replay_buffer::{ReplayBuffer, Transition};
use crate::domain::environment::node_environment::NodeEnvironment;
use crate::error::Result;

/// Window of the moving average reward reported during training.
const REWARD_LOG_WINDOW: usize = 1000;

/// `ε = ε_end + (ε_start − ε_end)·exp(−steps_done / ε_decay)`
pub fn epsilon_at(config: &DqnConfig, steps_done: u64) -> f64 {
    config.epsilon_end + (config.epsilon_start - config.epsilon_end) * (-(steps_done as f64) / config.epsilon_decay).exp()
}

/// Summary of a training campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrainingReport {
    pub environment_steps: u64,
    pub decisions: u64,
    pub learning_updates: u64,
    pub target_syncs: u64,
    pub total_reward: f64,
    /// Mean loss of the last learning update, if any happened.
    pub last_loss: Option<f32>,
}

/// Deep Q-learning scheduler.
///
/// Holds an online estimator, updated on every `learn` call, and a target
/// estimator that only changes at explicit `sync_target` points.
#[derive(Debug, Clone)]
pub struct DqnAgent {
    config: DqnConfig,
    action_size: usize,
    online: QNetwork,
    target: QNetwork,
    optimizer: AdamOptimizer,
    memory: ReplayBuffer,
    /// Number of ε-greedy decisions taken so far.
    steps_done: u64,
    /// Set after a training campaign or after loading stored parameters.
    trained: bool,
    rng: StdRng,
}

impl DqnAgent {
    pub fn new(state_size: usize, action_size: usize, config: DqnConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let online = QNetwork::new(state_size, action_size, &config.hidden_layer_sizes, config.device, &mut rng);
        let target = online.clone();
        let optimizer = AdamOptimizer::new(config.learning_rate, online.layers());
        let memory = ReplayBuffer::new(config.replay_buffer_capacity);

        log::debug!("DQN agent created on {} with layer sizes {:?}.", config.device, online.layer_sizes());

        DqnAgent { config, action_size, online, target, optimizer, memory, steps_done: 0, trained: false, rng }
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    pub fn online(&self) -> &QNetwork {
        &self.online
    }

    pub fn target(&self) -> &QNetwork {
        &self.target
    }

    pub fn memory(&self) -> &ReplayBuffer {
        &self.memory
    }

    pub fn steps_done(&self) -> u64 {
        self.steps_done
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Exploration probability of the next decision.
    pub fn epsilon(&self) -> f64 {
        epsilon_at(&self.config, self.steps_done)
    }

    /// ε-greedy decision. Counts towards the ε decay.
    pub fn select_action(&mut self, state: &[f32]) -> usize {
        let epsilon = self.epsilon();
        self.steps_done += 1;

        if self.rng.random::<f64>() > epsilon { self.online.best_action(state) } else { self.rng.random_range(0..self.action_size) }
    }

    /// Decision of the online estimator without exploration.
    pub fn greedy_action(&self, state: &[f32]) -> usize {
        self.online.best_action(state)
    }

    pub fn remember(&mut self, transition: Transition) {
        self.memory.push(transition);
    }

    /// One update of the online estimator from a sampled batch.
    ///
    /// Targets are `reward + γ·max_a target(next_state)`.
    ///
    /// # Returns
    /// The batch loss, `None` while the experience store holds fewer than `batch_size` transitions.
    pub fn learn(&mut self) -> Option<f32> {
        let batch = self.memory.sample(self.config.batch_size, &mut self.rng)?;
        let gamma = self.config.gamma as f32;

        let samples: Vec<TrainingSample<'_>> = batch
            .iter()
            .map(|transition| TrainingSample {
                state: &transition.state,
                action: transition.action,
                target: transition.reward + gamma * self.target.max_value(&transition.next_state),
            })
            .collect();

        Some(self.online.fit_batch(&samples, &mut self.optimizer))
    }

    /// Hard copy of the online parameters into the target estimator.
    pub fn sync_target(&mut self) {
        self.target.clone_from(&self.online);
    }

    /// Runs a full training campaign of `training_steps` environment steps on `env`.
    ///
    /// Every transmission attempt is stored as a transition. The time reward of a
    /// step (step cost and expiry penalties) is added to the next decision, so it is
    /// carried over steps in which the buffer stays empty.
    pub fn train(&mut self, env: &mut NodeEnvironment) -> TrainingReport {
        let training_steps = self.config.training_steps;
        let mut report = TrainingReport::default();
        let mut recent_rewards: VecDeque<f64> = VecDeque::with_capacity(REWARD_LOG_WINDOW);
        let mut pending_time_reward = 0.0;

        log::info!("Training DQN for {} steps (batch size {}, target sync every {} steps).", training_steps, self.config.batch_size, self.config.target_update_frequency);

        env.reset();
        for step in 0..training_steps {
            let (time_reward, _) = env.advance_time(step);
            pending_time_reward += time_reward;
            let mut step_reward = time_reward;

            let mut state = env.observe_state();
            while env.remaining_capacity() > 0 && !env.is_empty() {
                let action = self.select_action(&state);
                let result = env.attempt_transmit(Some(action));
                let next_state = env.observe_state();

                let reward = result.reward + pending_time_reward;
                pending_time_reward = 0.0;
                step_reward += result.reward;

                self.remember(Transition { state, action, reward: reward as f32, next_state: next_state.clone() });
                report.decisions += 1;

                if let Some(loss) = self.learn() {
                    report.learning_updates += 1;
                    report.last_loss = Some(loss);
                }

                state = next_state;
                if !result.success {
                    break;
                }
            }

            if (step + 1) % self.config.target_update_frequency == 0 {
                self.sync_target();
                report.target_syncs += 1;
            }

            report.environment_steps += 1;
            report.total_reward += step_reward;
            if recent_rewards.len() == REWARD_LOG_WINDOW {
                recent_rewards.pop_front();
            }
            recent_rewards.push_back(step_reward);

            if (step + 1) % REWARD_LOG_WINDOW as u64 == 0 {
                let average = recent_rewards.iter().sum::<f64>() / recent_rewards.len() as f64;
                log::info!("Step {}/{}: average reward (last {}) {:.2}, epsilon {:.3}.", step + 1, training_steps, recent_rewards.len(), average, self.epsilon());
            }
        }

        log::info!(
            "Training finished: {} decisions, {} updates, {} target syncs, total reward {:.1}.",
            report.decisions,
            report.learning_updates,
            report.target_syncs,
            report.total_reward
        );

        self.trained = true;
        report
    }

    /// Writes the online parameters to `path`.
    pub fn save_parameters(&self, path: impl AsRef<Path>) -> Result<()> {
        self.online.save_parameters(path)
    }

    /// Loads parameters into the online estimator and synchronizes the target.
    pub fn load_parameters(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.online.load_parameters(path)?;
        self.sync_target();
        self.trained = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::{ExperimentConfig, IntRange};
    use crate::domain::link::capacity_model::CapacityModel;

    fn small_config() -> DqnConfig {
        DqnConfig {
            hidden_layer_sizes: vec![16],
            replay_buffer_capacity: 64,
            batch_size: 8,
            training_steps: 60,
            target_update_frequency: 5,
            epsilon_decay: 50.0,
            ..DqnConfig::default()
        }
    }

    fn transition(action: usize, reward: f32) -> Transition {
        Transition { state: vec![0.5, 0.5, 0.0, 0.0], action, reward, next_state: vec![0.0; 4] }
    }

    #[test]
    fn epsilon_starts_at_start_value_and_decays() {
        let config = DqnConfig::default();

        assert!((epsilon_at(&config, 0) - 0.9).abs() < 1e-12);
        assert!(epsilon_at(&config, 1000) < epsilon_at(&config, 10));
        assert!(epsilon_at(&config, 10_000_000) >= config.epsilon_end);
        assert!((epsilon_at(&config, 10_000_000) - config.epsilon_end).abs() < 1e-9);
    }

    #[test]
    fn every_decision_advances_the_decay() {
        let mut agent = DqnAgent::new(4, 2, small_config(), 1);
        let before = agent.epsilon();

        for _ in 0..10 {
            let action = agent.select_action(&[0.0; 4]);
            assert!(action < 2);
        }

        assert_eq!(agent.steps_done(), 10);
        assert!(agent.epsilon() < before);
    }

    #[test]
    fn learning_is_skipped_without_enough_transitions() {
        let mut agent = DqnAgent::new(4, 2, small_config(), 2);
        for _ in 0..7 {
            agent.remember(transition(0, 1.0));
        }

        assert!(agent.learn().is_none());

        agent.remember(transition(1, 1.0));
        assert!(agent.learn().is_some());
    }

    #[test]
    fn learning_changes_only_the_online_estimator() {
        let mut agent = DqnAgent::new(4, 2, small_config(), 3);
        for action in 0..8 {
            agent.remember(transition(action % 2, 10.0));
        }
        let state = [0.5, 0.5, 0.0, 0.0];
        let target_before = agent.target().predict(&state);

        agent.learn();

        assert_eq!(agent.target().predict(&state), target_before);
        assert_ne!(agent.online().predict(&state), target_before);
    }

    #[test]
    fn sync_makes_estimators_identical() {
        let mut agent = DqnAgent::new(4, 2, small_config(), 4);
        for action in 0..8 {
            agent.remember(transition(action % 2, -5.0));
        }
        agent.learn();

        agent.sync_target();

        for state in [[0.0; 4], [1.0, 0.2, 0.3, 0.9], [0.5, 0.5, 0.5, 0.5]] {
            assert_eq!(agent.online().predict(&state), agent.target().predict(&state));
        }
    }

    #[test]
    fn training_campaign_runs_requested_steps() {
        let env_config = ExperimentConfig::default()
            .with_buffer_limits(2, None)
            .with_unit_ranges(IntRange::new(1, 4), IntRange::new(1, 3))
            .with_max_arrivals_per_step(2)
            .with_capacity_model(CapacityModel::Constant { capacity: 3.0 });
        let mut env = NodeEnvironment::new(env_config);
        let mut agent = DqnAgent::new(env.state_size(), 2, small_config(), 5);

        let report = agent.train(&mut env);

        assert!(agent.is_trained());
        assert_eq!(report.environment_steps, 60);
        assert_eq!(report.target_syncs, 12);
        assert_eq!(report.decisions, agent.steps_done());
        assert_eq!(agent.memory().len() as u64, report.decisions.min(64));
        if report.decisions >= 8 {
            assert!(report.learning_updates > 0);
        }
    }
}
