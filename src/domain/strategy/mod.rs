pub mod simple_strategies;
pub mod strategy;
