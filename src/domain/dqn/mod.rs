pub mod agent;
pub mod optimizer;
pub mod q_network;
pub mod replay_buffer;
