use tracing::trace;

use crate::entity::{Ghost, Player};
use crate::error::GameError;
use crate::grid::Grid;
use crate::types::{CellKind, Direction, MoveResult};

/// Moves the player one cell. Leaving the grid is treated as a wall.
pub fn move_player(grid: &mut Grid, player: &mut Player, dir: Direction) -> MoveResult {
    match try_move_player(grid, player, dir) {
        Ok(result) => result,
        Err(err) => {
            trace!(%err, "player move blocked at grid edge");
            MoveResult::Blocked
        }
    }
}

/// Moves a ghost one cell, restoring whatever it was covering.
pub fn move_ghost(grid: &mut Grid, ghost: &mut Ghost, dir: Direction) -> MoveResult {
    match try_move_ghost(grid, ghost, dir) {
        Ok(result) => result,
        Err(err) => {
            trace!(%err, ghost = ?ghost.id, "ghost move blocked at grid edge");
            MoveResult::Blocked
        }
    }
}

fn try_move_player(
    grid: &mut Grid,
    player: &mut Player,
    dir: Direction,
) -> Result<MoveResult, GameError> {
    let target = player.pos.step(dir);
    let cell = grid.cell_at(target)?;
    match cell {
        CellKind::GhostMark(_) => return Ok(MoveResult::PlayerCaught),
        CellKind::Wall => return Ok(MoveResult::Blocked),
        _ => {}
    }

    grid.set_cell(player.pos, CellKind::Empty)?;
    let scored = cell.is_pellet();
    if scored {
        player.score += 1;
    }
    player.pos = target;
    grid.set_cell(target, CellKind::PlayerMark)?;
    Ok(MoveResult::Moved { scored })
}

fn try_move_ghost(
    grid: &mut Grid,
    ghost: &mut Ghost,
    dir: Direction,
) -> Result<MoveResult, GameError> {
    let target = ghost.pos.step(dir);
    let cell = grid.cell_at(target)?;
    match cell {
        CellKind::PlayerMark => return Ok(MoveResult::PlayerCaught),
        CellKind::Wall | CellKind::GhostMark(_) => return Ok(MoveResult::Blocked),
        _ => {}
    }

    grid.set_cell(ghost.pos, ghost.covered)?;
    ghost.covered = cell;
    ghost.pos = target;
    grid.set_cell(target, ghost.mark())?;
    Ok(MoveResult::Moved { scored: false })
}
