pub mod data_unit;
pub mod node_environment;
pub mod step_stats;
