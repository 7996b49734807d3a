use std::collections::VecDeque;
use std::fmt;

use crate::constants::DEFAULT_GHOST_EPSILON;
use crate::grid::Grid;
use crate::rng::Rng;
use crate::types::{CellKind, Direction, Pos};

/// Automated move producer. Sees a read-only grid, the cell of the entity it
/// moves, and the player's cell. `None` means "stay put".
pub trait MovePolicy: Send {
    fn choose(&mut self, grid: &Grid, from: Pos, player: Pos) -> Option<Direction>;
}

/// Who supplies a role's moves, fixed when the role connects.
pub enum MoveSource {
    HumanSubmitted,
    PolicyDriven(Box<dyn MovePolicy>),
}

impl MoveSource {
    pub fn is_policy(&self) -> bool {
        matches!(self, MoveSource::PolicyDriven(_))
    }
}

impl fmt::Debug for MoveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveSource::HumanSubmitted => f.write_str("HumanSubmitted"),
            MoveSource::PolicyDriven(_) => f.write_str("PolicyDriven"),
        }
    }
}

/// Directions a ghost may take from `from`: in bounds, not a wall and not
/// another ghost. The player's cell counts as legal.
pub fn ghost_legal_directions(grid: &Grid, from: Pos) -> Vec<Direction> {
    Direction::ALL
        .into_iter()
        .filter(|dir| {
            matches!(
                grid.cell_at(from.step(*dir)),
                Ok(cell) if cell != CellKind::Wall && !cell.is_ghost()
            )
        })
        .collect()
}

/// Chases the player by Manhattan distance, exploring with probability
/// `epsilon`.
#[derive(Clone, Debug)]
pub struct GreedyChase {
    epsilon: f32,
    rng: Rng,
}

impl GreedyChase {
    pub fn new(epsilon: f32, rng: Rng) -> Self {
        Self {
            epsilon: epsilon.clamp(0.0, 1.0),
            rng,
        }
    }
}

impl Default for GreedyChase {
    fn default() -> Self {
        Self::new(DEFAULT_GHOST_EPSILON, Rng::from_entropy())
    }
}

impl MovePolicy for GreedyChase {
    fn choose(&mut self, grid: &Grid, from: Pos, player: Pos) -> Option<Direction> {
        let legal = ghost_legal_directions(grid, from);
        if legal.is_empty() {
            return None;
        }
        if self.rng.chance(self.epsilon) {
            return self.rng.pick(&legal);
        }
        legal
            .into_iter()
            .min_by_key(|dir| from.step(*dir).manhattan(player))
    }
}

/// Wanders at random, avoiding walls and ghost-occupied cells when it can.
#[derive(Clone, Debug)]
pub struct RandomWalk {
    rng: Rng,
}

impl RandomWalk {
    pub fn new(rng: Rng) -> Self {
        Self { rng }
    }
}

impl MovePolicy for RandomWalk {
    fn choose(&mut self, grid: &Grid, from: Pos, _player: Pos) -> Option<Direction> {
        let open: Vec<Direction> = Direction::ALL
            .into_iter()
            .filter(|dir| matches!(grid.cell_at(from.step(*dir)), Ok(cell) if cell != CellKind::Wall))
            .collect();
        let safe: Vec<Direction> = open
            .iter()
            .copied()
            .filter(|dir| matches!(grid.cell_at(from.step(*dir)), Ok(cell) if !cell.is_ghost()))
            .collect();
        if safe.is_empty() {
            self.rng.pick(&open)
        } else {
            self.rng.pick(&safe)
        }
    }
}

/// Replays a fixed list of moves, then stays put.
#[derive(Clone, Debug, Default)]
pub struct Scripted {
    moves: VecDeque<Direction>,
}

impl Scripted {
    pub fn new(moves: impl IntoIterator<Item = Direction>) -> Self {
        Self {
            moves: moves.into_iter().collect(),
        }
    }
}

impl MovePolicy for Scripted {
    fn choose(&mut self, _grid: &Grid, _from: Pos, _player: Pos) -> Option<Direction> {
        self.moves.pop_front()
    }
}
