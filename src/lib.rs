pub mod action_log;
pub mod compass;
pub mod constants;
pub mod engine;
pub mod reward;
pub mod rng;
pub mod server_protocol;
pub mod server_utils;
pub mod service;
pub mod types;
