use crate::domain::config::ExperimentConfig;
use crate::domain::dqn::agent::TrainingReport;
use crate::domain::environment::node_environment::{NodeEnvironment, TransmitOutcome};
use crate::domain::environment::step_stats::RunStatistics;
use crate::domain::strategy::strategy::Strategy;
use crate::domain::utils::statistics::{StatParameter, StatisticEvent, StatsWriter};
use crate::error::Result;

/// Outcome of one strategy in an experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyResult {
    pub strategy_name: String,
    pub statistics: RunStatistics,
    /// Present if the strategy was trained as part of the experiment.
    pub training: Option<TrainingReport>,
}

/// Runs `steps` simulation steps with `strategy` deciding every transmission.
///
/// Per step the link capacity is recomputed and arrivals and expiry are applied,
/// then units are sent until the capacity is used up, the buffer is empty or an
/// attempt is rejected. The environment is used as is; reset it beforehand for a
/// fresh run.
pub fn run_evaluation(env: &mut NodeEnvironment, strategy: &Strategy, steps: u64, mut stats_sink: Option<&mut StatsWriter>) -> Result<RunStatistics> {
    let name = strategy.name();
    let mut run = RunStatistics::default();
    let mut invalid_selections = 0u64;

    for step in 0..steps {
        let (_, step_stats) = env.advance_time(step);
        run += step_stats;

        let mut transmitted = 0;
        while env.remaining_capacity() > 0 && !env.is_empty() {
            let action = strategy.select_action(env);
            let result = env.attempt_transmit(action);
            transmitted += result.transmitted;

            if !result.success {
                if result.outcome == TransmitOutcome::RejectedInvalidSelection {
                    invalid_selections += 1;
                }
                break;
            }
        }
        run.record_transmissions(transmitted);

        if let Some(sink) = stats_sink.as_deref_mut() {
            let mut event = StatisticEvent::new();
            event
                .set(StatParameter::Strategy, name.as_str())
                .set(StatParameter::Step, step)
                .set(StatParameter::Capacity, env.step_capacity())
                .set(StatParameter::Generated, step_stats.generated)
                .set(StatParameter::Transmitted, transmitted)
                .set(StatParameter::Expired, step_stats.expired)
                .set(StatParameter::Dropped, step_stats.dropped)
                .set(StatParameter::BufferUnits, env.len())
                .set(StatParameter::BufferLoad, env.buffer_load());
            sink.add_event(&event)?;
        }
    }

    if invalid_selections > 0 {
        log::warn!("Strategy '{}' selected an empty or out of range slot in {} of {} steps.", name, invalid_selections, steps);
    }

    Ok(run)
}

/// Evaluates every strategy on the same arrival sequence.
///
/// Learned strategies that were not trained or loaded before are trained first
/// on a separate environment. Each evaluation starts from a reset environment
/// reseeded with `config.seed`.
pub fn run_experiment(config: &ExperimentConfig, strategies: &mut [Strategy], mut stats_sink: Option<&mut StatsWriter>) -> Result<Vec<StrategyResult>> {
    log::info!("Starting experiment '{}' with {} strategies over {} steps.", config.name, strategies.len(), config.simulation_steps);

    let mut env = NodeEnvironment::new(config.clone());
    let mut results = Vec::with_capacity(strategies.len());

    for strategy in strategies.iter_mut() {
        let training = if strategy.requires_training() {
            let mut training_env = NodeEnvironment::new(config.clone());
            strategy.train(&mut training_env)
        } else {
            None
        };

        env.reset();
        env.reseed(config.seed);

        log::info!("Evaluating strategy '{}'.", strategy.name());
        let statistics = run_evaluation(&mut env, strategy, config.simulation_steps, stats_sink.as_deref_mut())?;

        log::info!(
            "Strategy '{}': generated {}, transmitted {}, expired {}, dropped {}, success rate {:.2}%.",
            strategy.name(),
            statistics.generated,
            statistics.transmitted,
            statistics.expired,
            statistics.dropped,
            statistics.success_rate()
        );

        results.push(StrategyResult { strategy_name: strategy.name(), statistics, training });
    }

    if let Some(sink) = stats_sink {
        sink.flush()?;
    }

    log::info!("Experiment finished.\n{}", format_comparison_table(&results));
    Ok(results)
}

/// Fixed width comparison of all results, one row per strategy.
pub fn format_comparison_table(results: &[StrategyResult]) -> String {
    let mut table = format!(
        "{:<20} {:>10} {:>12} {:>10} {:>10} {:>10}\n",
        "Strategy", "Generated", "Transmitted", "Expired", "Dropped", "Success %"
    );

    for result in results {
        let stats = &result.statistics;
        table.push_str(&format!(
            "{:<20} {:>10} {:>12} {:>10} {:>10} {:>10.2}\n",
            result.strategy_name,
            stats.generated,
            stats.transmitted,
            stats.expired,
            stats.dropped,
            stats.success_rate()
        ));
    }

    table
}
