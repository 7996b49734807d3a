use crate::types::{CellKind, GhostId, Pos};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    pub pos: Pos,
    pub score: u32,
}

impl Player {
    pub fn new(pos: Pos) -> Self {
        Self { pos, score: 0 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ghost {
    pub id: GhostId,
    pub pos: Pos,
    /// What the ghost is standing on; written back when it leaves.
    pub covered: CellKind,
}

impl Ghost {
    pub fn new(id: GhostId, pos: Pos) -> Self {
        Self {
            id,
            pos,
            covered: CellKind::Empty,
        }
    }

    pub fn mark(&self) -> CellKind {
        CellKind::GhostMark(self.id)
    }
}
