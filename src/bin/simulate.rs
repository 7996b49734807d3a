use std::fs;
use std::path::PathBuf;

use clap::Parser;
use duel_packman_server::error::GameError;
use duel_packman_server::policy::{GreedyChase, MoveSource, RandomWalk};
use duel_packman_server::rng::Rng;
use duel_packman_server::round::Round;
use duel_packman_server::server_utils::normalize_epsilon;
use duel_packman_server::snapshot::{SnapshotMessage, SnapshotPublisher};
use duel_packman_server::types::{EndCause, Role, RoundPhase};
use serde::Serialize;
use tracing::{info, warn};

/// Plays policy-vs-policy rounds headlessly and prints one JSON line each.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long, default_value_t = 1)]
    seed: u32,
    #[arg(long, default_value_t = 10)]
    rounds: u32,
    #[arg(long, default_value_t = 2_000)]
    max_ticks: u64,
    #[arg(long)]
    epsilon: Option<f32>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Default)]
struct CountingPublisher {
    published: u64,
}

impl SnapshotPublisher for CountingPublisher {
    fn publish(&mut self, _message: &SnapshotMessage) {
        self.published += 1;
    }
}

#[derive(Clone, Debug, Serialize)]
struct RoundResultLine {
    seed: u32,
    cause: Option<EndCause>,
    score: u32,
    ticks: u64,
    moves: u64,
    #[serde(rename = "pelletsRemaining")]
    pellets_remaining: usize,
    snapshots: u64,
}

#[derive(Clone, Debug, Serialize)]
struct Summary {
    epsilon: f32,
    rounds: usize,
    caught: usize,
    cleared: usize,
    unfinished: usize,
    #[serde(rename = "avgScore")]
    avg_score: f64,
    results: Vec<RoundResultLine>,
}

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    let epsilon = normalize_epsilon(cli.epsilon);

    let mut results = Vec::new();
    for offset in 0..cli.rounds {
        let seed = cli.seed.wrapping_add(offset.wrapping_mul(7_919));
        match play_round(seed, epsilon, cli.max_ticks) {
            Ok(line) => {
                match serde_json::to_string(&line) {
                    Ok(text) => println!("{text}"),
                    Err(err) => warn!(%err, "failed to serialize round result"),
                }
                results.push(line);
            }
            Err(err) => warn!(seed, %err, "round aborted"),
        }
    }

    let summary = summarize(epsilon, results);
    info!(
        rounds = summary.rounds,
        caught = summary.caught,
        cleared = summary.cleared,
        avg_score = summary.avg_score,
        "simulation finished"
    );
    if let Some(path) = cli.summary_out {
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => {
                if let Err(err) = fs::write(&path, text) {
                    warn!(path = %path.display(), %err, "failed to write summary");
                }
            }
            Err(err) => warn!(%err, "failed to serialize summary"),
        }
    }
}

fn play_round(seed: u32, epsilon: f32, max_ticks: u64) -> Result<RoundResultLine, GameError> {
    let mut round = Round::classic(CountingPublisher::default())?;
    round.connect(
        Role::Player,
        MoveSource::PolicyDriven(Box::new(RandomWalk::new(Rng::new(seed)))),
    )?;
    round.connect(
        Role::Ghost,
        MoveSource::PolicyDriven(Box::new(GreedyChase::new(
            epsilon,
            Rng::new(seed.wrapping_add(1)),
        ))),
    )?;

    while round.tick() < max_ticks {
        match round.advance_autonomous() {
            Ok(_) => {}
            Err(GameError::RoundEnded) => break,
            Err(err) => return Err(err),
        }
        if matches!(round.phase(), RoundPhase::Ended(_)) {
            break;
        }
    }

    let cause = match round.phase() {
        RoundPhase::Ended(cause) => Some(cause),
        _ => None,
    };
    Ok(RoundResultLine {
        seed,
        cause,
        score: round.player().score,
        ticks: round.tick(),
        moves: round.moves(),
        pellets_remaining: round.pellets_remaining(),
        snapshots: round.publisher().published,
    })
}

fn summarize(epsilon: f32, results: Vec<RoundResultLine>) -> Summary {
    let count = |cause: Option<EndCause>| results.iter().filter(|line| line.cause == cause).count();
    let caught = count(Some(EndCause::PlayerCaught));
    let cleared = count(Some(EndCause::AllPelletsCleared));
    let unfinished = count(None);
    let avg_score = if results.is_empty() {
        0.0
    } else {
        results.iter().map(|line| line.score as f64).sum::<f64>() / results.len() as f64
    };
    Summary {
        epsilon,
        rounds: results.len(),
        caught,
        cleared,
        unfinished,
        avg_score,
        results,
    }
}
