use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::policy::{GreedyChase, MoveSource, RandomWalk};
use crate::rng::Rng;
use crate::server_utils::normalize_epsilon;
use crate::types::Role;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ControlMode {
    /// Moves arrive from the connected client.
    Human,
    /// Moves are produced server-side by a policy.
    Auto,
}

#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Two-role Pac-Man round server")]
pub struct ServerConfig {
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Directory with index.html and client assets.
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "PLAYER_MODE", value_enum, default_value_t = ControlMode::Human)]
    pub player_mode: ControlMode,

    #[arg(long, env = "GHOST_MODE", value_enum, default_value_t = ControlMode::Human)]
    pub ghost_mode: ControlMode,

    /// Exploration rate for automated ghosts.
    #[arg(long, env = "GHOST_EPSILON")]
    pub ghost_epsilon: Option<f32>,

    /// Interval between server-driven ticks when both roles are automated.
    #[arg(long, env = "AUTO_TICK_MS", default_value_t = 250)]
    pub auto_tick_ms: u64,

    /// Seed for automated policies; random when omitted.
    #[arg(long, env = "SEED")]
    pub seed: Option<u32>,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn fully_automated(&self) -> bool {
        self.player_mode == ControlMode::Auto && self.ghost_mode == ControlMode::Auto
    }

    pub fn mode_for(&self, role: Role) -> ControlMode {
        match role {
            Role::Player => self.player_mode,
            Role::Ghost => self.ghost_mode,
        }
    }

    /// Move source handed to the round when `role` connects.
    pub fn move_source(&self, role: Role) -> MoveSource {
        if self.mode_for(role) == ControlMode::Human {
            return MoveSource::HumanSubmitted;
        }
        let rng = match (self.seed, role) {
            (Some(seed), Role::Player) => Rng::new(seed),
            (Some(seed), Role::Ghost) => Rng::new(seed.wrapping_add(1)),
            (None, _) => Rng::from_entropy(),
        };
        match role {
            Role::Player => MoveSource::PolicyDriven(Box::new(RandomWalk::new(rng))),
            Role::Ghost => MoveSource::PolicyDriven(Box::new(GreedyChase::new(
                normalize_epsilon(self.ghost_epsilon),
                rng,
            ))),
        }
    }
}
