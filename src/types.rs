use std::fmt;

use serde::Serialize;

use crate::error::GameError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn parse_move(value: &str) -> Result<Self, GameError> {
        match value {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(GameError::UnknownDirection(other.to_string())),
        }
    }

    /// Unit step as `(d_row, d_col)`.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostId {
    A,
    B,
    C,
    D,
}

impl GhostId {
    pub const ALL: [GhostId; 4] = [GhostId::A, GhostId::B, GhostId::C, GhostId::D];

    pub fn symbol(self) -> char {
        match self {
            GhostId::A => 'a',
            GhostId::B => 'b',
            GhostId::C => 'c',
            GhostId::D => 'd',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'a' => Some(GhostId::A),
            'b' => Some(GhostId::B),
            'c' => Some(GhostId::C),
            'd' => Some(GhostId::D),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellKind {
    Wall,
    Empty,
    Pellet,
    PowerPellet,
    PlayerMark,
    GhostMark(GhostId),
}

impl CellKind {
    pub fn symbol(self) -> char {
        match self {
            CellKind::Wall => '#',
            CellKind::Empty => ' ',
            CellKind::Pellet => '.',
            CellKind::PowerPellet => 'o',
            CellKind::PlayerMark => 'p',
            CellKind::GhostMark(id) => id.symbol(),
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '#' => Some(CellKind::Wall),
            ' ' => Some(CellKind::Empty),
            '.' => Some(CellKind::Pellet),
            'o' => Some(CellKind::PowerPellet),
            'p' => Some(CellKind::PlayerMark),
            other => GhostId::from_symbol(other).map(CellKind::GhostMark),
        }
    }

    pub fn is_pellet(self) -> bool {
        matches!(self, CellKind::Pellet | CellKind::PowerPellet)
    }

    pub fn is_ghost(self) -> bool {
        matches!(self, CellKind::GhostMark(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Pos {
    pub row: i32,
    pub col: i32,
}

impl Pos {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dr, dc) = dir.delta();
        Self {
            row: self.row + dr,
            col: self.col + dc,
        }
    }

    pub fn manhattan(self, other: Pos) -> i32 {
        (self.row - other.row).abs() + (self.col - other.col).abs()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Player,
    Ghost,
}

impl Role {
    pub fn parse(value: &str) -> Result<Self, GameError> {
        match value {
            "player" => Ok(Role::Player),
            "ghost" => Ok(Role::Ghost),
            other => Err(GameError::UnknownRole(other.to_string())),
        }
    }

    pub fn other(self) -> Self {
        match self {
            Role::Player => Role::Ghost,
            Role::Ghost => Role::Player,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Player => f.write_str("player"),
            Role::Ghost => f.write_str("ghost"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndCause {
    PlayerCaught,
    AllPelletsCleared,
    RoleDisconnected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "cause", rename_all = "snake_case")]
pub enum RoundPhase {
    WaitingForPlayer,
    WaitingForGhost,
    Active,
    Ended(EndCause),
}

/// Outcome of a single resolver call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveResult {
    Blocked,
    Moved { scored: bool },
    PlayerCaught,
}
