pub mod config;
pub mod constants;
pub mod entity;
pub mod error;
pub mod grid;
pub mod policy;
pub mod resolver;
pub mod rng;
pub mod round;
pub mod server_protocol;
pub mod server_utils;
pub mod snapshot;
pub mod types;
