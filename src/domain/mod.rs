pub mod config;
pub mod dqn;
pub mod environment;
pub mod link;
pub mod simulation;
pub mod strategy;
pub mod utils;
