use std::collections::BTreeMap;

use crate::error::GameError;
use crate::types::{CellKind, GhostId, Pos};

/// Starting positions extracted while parsing a template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spawns {
    pub player: Pos,
    pub ghosts: BTreeMap<GhostId, Pos>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<CellKind>,
}

impl Grid {
    /// Parses a rectangular ASCII template. The template must hold exactly one
    /// player mark and exactly one mark per ghost identity.
    pub fn parse<S: AsRef<str>>(template: &[S]) -> Result<(Self, Spawns), GameError> {
        let rows = template.len();
        if rows == 0 {
            return Err(GameError::MalformedTemplate("template is empty".to_string()));
        }
        let cols = template[0].as_ref().chars().count();
        if cols == 0 {
            return Err(GameError::MalformedTemplate("first row is empty".to_string()));
        }

        let mut cells = Vec::with_capacity(rows * cols);
        let mut player = None;
        let mut ghosts = BTreeMap::new();

        for (row_idx, line) in template.iter().enumerate() {
            let line = line.as_ref();
            if line.chars().count() != cols {
                return Err(GameError::MalformedTemplate(format!(
                    "row {row_idx} has {} columns, expected {cols}",
                    line.chars().count()
                )));
            }
            for (col_idx, symbol) in line.chars().enumerate() {
                let Some(kind) = CellKind::from_symbol(symbol) else {
                    return Err(GameError::MalformedTemplate(format!(
                        "unknown symbol {symbol:?} at ({row_idx}, {col_idx})"
                    )));
                };
                let pos = Pos::new(row_idx as i32, col_idx as i32);
                match kind {
                    CellKind::PlayerMark => {
                        if player.replace(pos).is_some() {
                            return Err(GameError::MalformedTemplate(
                                "more than one player mark".to_string(),
                            ));
                        }
                    }
                    CellKind::GhostMark(id) => {
                        if ghosts.insert(id, pos).is_some() {
                            return Err(GameError::MalformedTemplate(format!(
                                "more than one mark for ghost {}",
                                id.symbol()
                            )));
                        }
                    }
                    _ => {}
                }
                cells.push(kind);
            }
        }

        let Some(player) = player else {
            return Err(GameError::MalformedTemplate("no player mark".to_string()));
        };
        if let Some(missing) = GhostId::ALL.iter().find(|id| !ghosts.contains_key(id)) {
            return Err(GameError::MalformedTemplate(format!(
                "no mark for ghost {}",
                missing.symbol()
            )));
        }

        Ok((Self { rows, cols, cells }, Spawns { player, ghosts }))
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.row >= 0 && pos.col >= 0 && (pos.row as usize) < self.rows && (pos.col as usize) < self.cols
    }

    pub fn cell_at(&self, pos: Pos) -> Result<CellKind, GameError> {
        self.index_of(pos).map(|idx| self.cells[idx])
    }

    /// Unconditional write. Callers keep the mark invariants.
    pub fn set_cell(&mut self, pos: Pos, kind: CellKind) -> Result<(), GameError> {
        let idx = self.index_of(pos)?;
        self.cells[idx] = kind;
        Ok(())
    }

    pub fn pellets_remaining(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_pellet()).count()
    }

    pub fn symbol_rows(&self) -> Vec<Vec<char>> {
        self.cells
            .chunks(self.cols)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect())
            .collect()
    }

    pub fn to_template(&self) -> Vec<String> {
        self.symbol_rows()
            .into_iter()
            .map(|row| row.into_iter().collect())
            .collect()
    }

    fn index_of(&self, pos: Pos) -> Result<usize, GameError> {
        if !self.in_bounds(pos) {
            return Err(GameError::OutOfBounds {
                row: pos.row,
                col: pos.col,
            });
        }
        Ok(pos.row as usize * self.cols + pos.col as usize)
    }
}
