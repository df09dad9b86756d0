use proptest::prelude::*;

use relay_link_scheduler::domain::config::{DqnConfig, ExperimentConfig, IntRange};
use relay_link_scheduler::domain::dqn::agent::{DqnAgent, epsilon_at};
use relay_link_scheduler::domain::dqn::replay_buffer::Transition;
use relay_link_scheduler::domain::environment::node_environment::NodeEnvironment;
use relay_link_scheduler::domain::link::capacity_model::CapacityModel;
use relay_link_scheduler::domain::simulation::simulation_driver::run_experiment;
use relay_link_scheduler::domain::strategy::strategy::{Strategy, StrategyType};
use relay_link_scheduler::domain::utils::statistics::StatsWriter;

fn small_dqn() -> DqnConfig {
    DqnConfig {
        hidden_layer_sizes: vec![16, 16],
        replay_buffer_capacity: 200,
        batch_size: 8,
        epsilon_decay: 100.0,
        target_update_frequency: 5,
        training_steps: 80,
        ..DqnConfig::default()
    }
}

fn small_config() -> ExperimentConfig {
    ExperimentConfig::default()
        .with_simulation_steps(40)
        .with_max_arrivals_per_step(4)
        .with_unit_ranges(IntRange::new(2, 6), IntRange::new(1, 3))
        .with_buffer_limits(6, Some(24))
        .with_capacity_model(CapacityModel::Constant { capacity: 8.0 })
        .with_dqn(small_dqn())
}

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("{}_{}", std::process::id(), name))
}

#[test]
fn test_target_changes_only_at_sync() {
    let config = small_config();
    let mut agent = DqnAgent::new(config.state_size(), config.action_size(), config.dqn.clone(), 1);
    let state = vec![0.3; config.state_size()];
    for action in 0..16 {
        agent.remember(Transition { state: state.clone(), action: action % 6, reward: 10.0, next_state: vec![0.0; config.state_size()] });
    }
    let target_before = agent.target().predict(&state);

    for _ in 0..4 {
        agent.learn();
    }
    assert_eq!(agent.target().predict(&state), target_before);

    agent.sync_target();
    assert_eq!(agent.target().predict(&state), agent.online().predict(&state));
    assert_ne!(agent.target().predict(&state), target_before);
}

#[test]
fn test_training_then_evaluation() {
    let config = small_config();
    let mut strategies: Vec<Strategy> = StrategyType::all().iter().map(|typ| typ.get_instance(&config)).collect();
    let stats_path = temp_path("relay_experiment.csv");

    let results = {
        let mut writer = StatsWriter::create(&stats_path).unwrap();
        let results = run_experiment(&config, &mut strategies, Some(&mut writer)).unwrap();
        assert_eq!(writer.rows(), 3 * config.simulation_steps);
        results
    };
    let content = std::fs::read_to_string(&stats_path).unwrap();
    let _ = std::fs::remove_file(&stats_path);

    assert_eq!(results.len(), 3);
    let report = results[2].training.expect("dqn is trained");
    assert_eq!(report.environment_steps, 80);
    assert_eq!(report.target_syncs, 16);
    assert!(!strategies[2].requires_training());

    let generated = results[0].statistics.generated;
    assert!(results.iter().all(|result| result.statistics.generated == generated));
    for result in &results {
        let stats = &result.statistics;
        assert!(stats.transmitted + stats.expired + stats.dropped <= stats.generated);
    }

    assert_eq!(content.lines().count() as u64, 1 + 3 * config.simulation_steps);
    assert!(content.lines().nth(1).unwrap().starts_with("oldest-first;0;8;"));
}

#[test]
fn test_loaded_model_skips_training() {
    let config = small_config();
    let model_path = temp_path("relay_model.json");

    let mut trained = StrategyType::Dqn.get_instance(&config);
    let mut env = NodeEnvironment::new(config.clone());
    trained.train(&mut env).unwrap();
    trained.as_agent_mut().unwrap().save_parameters(&model_path).unwrap();

    let mut loaded = StrategyType::Dqn.get_instance(&config);
    loaded.as_agent_mut().unwrap().load_parameters(&model_path).unwrap();
    let _ = std::fs::remove_file(&model_path);

    assert!(!loaded.requires_training());
    let state = vec![0.5; config.state_size()];
    let expected = trained.as_agent_mut().unwrap().online().predict(&state);
    let restored = loaded.as_agent_mut().unwrap().online().predict(&state);
    for (a, b) in expected.iter().zip(&restored) {
        assert!((a - b).abs() < 1e-5);
    }

    let mut strategies = vec![loaded];
    let results = run_experiment(&config, &mut strategies, None).unwrap();
    assert!(results[0].training.is_none());
}

proptest! {
    #[test]
    fn epsilon_never_increases(a in 0u64..1_000_000, b in 0u64..1_000_000) {
        let config = DqnConfig::default();
        let (earlier, later) = if a <= b { (a, b) } else { (b, a) };

        let eps_earlier = epsilon_at(&config, earlier);
        let eps_later = epsilon_at(&config, later);

        prop_assert!(eps_later <= eps_earlier);
        prop_assert!(eps_later >= config.epsilon_end);
        prop_assert!(eps_earlier <= config.epsilon_start);
    }
}
