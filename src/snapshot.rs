use serde::Serialize;

use crate::grid::Grid;
use crate::types::{EndCause, RoundPhase};

/// Observer-facing view of a round after a resolved tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SnapshotMessage {
    pub board: Vec<Vec<char>>,
    pub score: u32,
    pub tick: u64,
    pub phase: RoundPhase,
    pub outcome: Option<EndCause>,
}

pub fn build_snapshot(grid: &Grid, score: u32, tick: u64, phase: RoundPhase) -> SnapshotMessage {
    let outcome = match phase {
        RoundPhase::Ended(cause) => Some(cause),
        _ => None,
    };
    SnapshotMessage {
        board: grid.symbol_rows(),
        score,
        tick,
        phase,
        outcome,
    }
}

/// Egress for snapshots. The round calls this after each resolved tick and
/// when a round starts.
pub trait SnapshotPublisher {
    fn publish(&mut self, message: &SnapshotMessage);
}

/// Keeps every published snapshot in memory.
#[derive(Clone, Debug, Default)]
pub struct SnapshotLog {
    pub messages: Vec<SnapshotMessage>,
}

impl SnapshotLog {
    pub fn last(&self) -> Option<&SnapshotMessage> {
        self.messages.last()
    }
}

impl SnapshotPublisher for SnapshotLog {
    fn publish(&mut self, message: &SnapshotMessage) {
        self.messages.push(message.clone());
    }
}
