use rand::distr::Alphanumeric;
use rand::Rng as _;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::constants::{CLASSIC_TEMPLATE, SESSION_ID_LEN};
use crate::entity::{Ghost, Player};
use crate::error::GameError;
use crate::grid::Grid;
use crate::policy::MoveSource;
use crate::resolver::{move_ghost, move_player};
use crate::snapshot::{build_snapshot, SnapshotMessage, SnapshotPublisher};
use crate::types::{CellKind, Direction, EndCause, MoveResult, Role, RoundPhase};

/// A move as delivered by ingress, already validated token by token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveRequest {
    Player(Direction),
    /// One direction per living ghost, in `a`..`d` order.
    Ghosts(Vec<Direction>),
}

impl MoveRequest {
    pub fn role(&self) -> Role {
        match self {
            MoveRequest::Player(_) => Role::Player,
            MoveRequest::Ghosts(_) => Role::Ghost,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStatus {
    /// Held until the other side's move arrives.
    Buffered,
    /// Applied on its own because the other role is not connected.
    Applied,
    TickResolved,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SubmitReport {
    pub status: SubmitStatus,
    pub phase: RoundPhase,
    pub score: u32,
    pub tick: u64,
}

type Order = Option<Direction>;

#[derive(Debug)]
struct Seat {
    session_id: String,
    source: MoveSource,
}

#[derive(Debug, Default)]
struct PendingMoves {
    player: Option<Order>,
    ghosts: Option<Vec<Order>>,
}

/// One game between a player side and a ghost side. Owns the grid and every
/// entity; all mutation goes through `&mut self`, so a caller holding the
/// round behind a lock gets one atomic critical section per move.
pub struct Round<P: SnapshotPublisher> {
    template: Vec<String>,
    grid: Grid,
    player: Player,
    player_alive: bool,
    ghosts: Vec<Ghost>,
    player_seat: Option<Seat>,
    ghost_seat: Option<Seat>,
    pending: PendingMoves,
    moves: u64,
    tick: u64,
    ended: Option<EndCause>,
    publisher: P,
}

impl<P: SnapshotPublisher> Round<P> {
    pub fn new<S: AsRef<str>>(template: &[S], publisher: P) -> Result<Self, GameError> {
        let template: Vec<String> = template.iter().map(|row| row.as_ref().to_string()).collect();
        let (grid, spawns) = Grid::parse(&template)?;
        let ghosts = spawns
            .ghosts
            .iter()
            .map(|(id, pos)| Ghost::new(*id, *pos))
            .collect();
        let mut round = Self {
            template,
            grid,
            player: Player::new(spawns.player),
            player_alive: true,
            ghosts,
            player_seat: None,
            ghost_seat: None,
            pending: PendingMoves::default(),
            moves: 0,
            tick: 0,
            ended: None,
            publisher,
        };
        round.publish();
        Ok(round)
    }

    pub fn classic(publisher: P) -> Result<Self, GameError> {
        Self::new(&CLASSIC_TEMPLATE, publisher)
    }

    pub fn phase(&self) -> RoundPhase {
        if let Some(cause) = self.ended {
            return RoundPhase::Ended(cause);
        }
        if self.player_seat.is_none() {
            return RoundPhase::WaitingForPlayer;
        }
        if self.ghost_seat.is_none() {
            return RoundPhase::WaitingForGhost;
        }
        RoundPhase::Active
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn ghosts(&self) -> &[Ghost] {
        &self.ghosts
    }

    pub fn moves(&self) -> u64 {
        self.moves
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut P {
        &mut self.publisher
    }

    pub fn is_player_alive(&self) -> bool {
        self.player_alive
    }

    pub fn is_connected(&self, role: Role) -> bool {
        self.seat(role).is_some()
    }

    /// Pellets on the board plus those hidden under ghosts.
    pub fn pellets_remaining(&self) -> usize {
        self.grid.pellets_remaining()
            + self
                .ghosts
                .iter()
                .filter(|ghost| ghost.covered.is_pellet())
                .count()
    }

    pub fn snapshot(&self) -> SnapshotMessage {
        build_snapshot(&self.grid, self.player.score, self.tick, self.phase())
    }

    /// Seats a role and hands back its session id. A round that ended because
    /// a role left is restarted so the newcomer and the remaining role get a
    /// fresh board.
    pub fn connect(&mut self, role: Role, source: MoveSource) -> Result<String, GameError> {
        if self.seat(role).is_some() {
            return Err(GameError::RoleAlreadyConnected(role));
        }
        if self.ended == Some(EndCause::RoleDisconnected) {
            self.restart();
        }

        let session_id = make_session_id();
        info!(%role, policy = source.is_policy(), "role connected");
        *self.seat_mut(role) = Some(Seat {
            session_id: session_id.clone(),
            source,
        });
        Ok(session_id)
    }

    pub fn disconnect(&mut self, role: Role, session_id: &str) -> Result<(), GameError> {
        self.authenticate(role, session_id)?;
        *self.seat_mut(role) = None;
        self.pending = PendingMoves::default();
        info!(%role, "role disconnected");
        if self.ended.is_none() {
            self.end(EndCause::RoleDisconnected);
            self.publish();
        }
        Ok(())
    }

    /// Starts a fresh board for the currently seated roles.
    pub fn reset(&mut self, session_id: &str) -> Result<(), GameError> {
        let holds_seat = [Role::Player, Role::Ghost].into_iter().any(|role| {
            self.seat(role)
                .map(|seat| seat.session_id == session_id)
                .unwrap_or(false)
        });
        if !holds_seat {
            warn!("reset rejected for unknown session");
            return Err(GameError::ImpersonationRejected(Role::Player));
        }
        self.restart();
        Ok(())
    }

    pub fn submit_move(
        &mut self,
        session_id: &str,
        request: MoveRequest,
    ) -> Result<SubmitReport, GameError> {
        let role = request.role();
        self.authenticate(role, session_id)?;
        if self.ended.is_some() {
            return Err(GameError::RoundEnded);
        }

        match request {
            MoveRequest::Player(dir) => {
                let order = self.policy_player_order().unwrap_or(Some(dir));
                self.pending.player = Some(order);
            }
            MoveRequest::Ghosts(dirs) => {
                if dirs.len() != self.ghosts.len() {
                    return Err(GameError::WrongArity {
                        expected: self.ghosts.len(),
                        got: dirs.len(),
                    });
                }
                let orders = self
                    .policy_ghost_orders()
                    .unwrap_or_else(|| dirs.into_iter().map(Some).collect());
                self.pending.ghosts = Some(orders);
            }
        }

        if !self.is_connected(role.other()) {
            self.apply_pending_alone(role);
            return Ok(self.report(SubmitStatus::Applied));
        }
        Ok(self.try_resolve_tick())
    }

    /// Lets policy-driven roles fill their own buffers and resolves the tick
    /// if nothing is missing. Human roles that have not submitted keep the
    /// tick pending.
    pub fn advance_autonomous(&mut self) -> Result<SubmitReport, GameError> {
        if self.ended.is_some() {
            return Err(GameError::RoundEnded);
        }
        match (self.is_connected(Role::Player), self.is_connected(Role::Ghost)) {
            (false, false) => Err(GameError::RoleNotConnected(Role::Player)),
            (true, false) => {
                let Some(order) = self.policy_player_order() else {
                    return Ok(self.report(SubmitStatus::Buffered));
                };
                self.pending.player = Some(order);
                self.apply_pending_alone(Role::Player);
                Ok(self.report(SubmitStatus::Applied))
            }
            (false, true) => {
                let Some(orders) = self.policy_ghost_orders() else {
                    return Ok(self.report(SubmitStatus::Buffered));
                };
                self.pending.ghosts = Some(orders);
                self.apply_pending_alone(Role::Ghost);
                Ok(self.report(SubmitStatus::Applied))
            }
            (true, true) => Ok(self.try_resolve_tick()),
        }
    }

    fn try_resolve_tick(&mut self) -> SubmitReport {
        if self.pending.player.is_none() {
            self.pending.player = self.policy_player_order();
        }
        if self.pending.ghosts.is_none() {
            self.pending.ghosts = self.policy_ghost_orders();
        }
        if self.pending.player.is_none() || self.pending.ghosts.is_none() {
            return self.report(SubmitStatus::Buffered);
        }

        let pending = std::mem::take(&mut self.pending);
        if let Some(order) = pending.player {
            self.apply_player(order);
        }
        if let Some(orders) = pending.ghosts {
            self.apply_ghosts(orders);
        }
        self.tick += 1;
        debug!(
            tick = self.tick,
            score = self.player.score,
            pellets = self.pellets_remaining(),
            "tick resolved"
        );
        self.publish();
        self.report(SubmitStatus::TickResolved)
    }

    fn apply_pending_alone(&mut self, role: Role) {
        match role {
            Role::Player => {
                if let Some(order) = self.pending.player.take() {
                    self.apply_player(order);
                }
            }
            Role::Ghost => {
                if let Some(orders) = self.pending.ghosts.take() {
                    self.apply_ghosts(orders);
                }
            }
        }
        self.publish();
    }

    fn apply_player(&mut self, order: Order) {
        if self.ended.is_some() {
            return;
        }
        self.moves += 1;
        let Some(dir) = order else {
            return;
        };
        match move_player(&mut self.grid, &mut self.player, dir) {
            MoveResult::PlayerCaught => self.player_caught(),
            MoveResult::Moved { scored: true } => {
                if self.pellets_remaining() == 0 {
                    self.end(EndCause::AllPelletsCleared);
                }
            }
            MoveResult::Moved { scored: false } | MoveResult::Blocked => {}
        }
    }

    fn apply_ghosts(&mut self, orders: Vec<Order>) {
        if self.ended.is_some() {
            return;
        }
        self.moves += 1;
        for (idx, order) in orders.into_iter().enumerate() {
            let Some(dir) = order else {
                continue;
            };
            let Some(ghost) = self.ghosts.get_mut(idx) else {
                break;
            };
            if move_ghost(&mut self.grid, ghost, dir) == MoveResult::PlayerCaught {
                self.player_caught();
                return;
            }
        }
    }

    fn player_caught(&mut self) {
        self.player_alive = false;
        if let Ok(CellKind::PlayerMark) = self.grid.cell_at(self.player.pos) {
            let _ = self.grid.set_cell(self.player.pos, CellKind::Empty);
        }
        self.end(EndCause::PlayerCaught);
    }

    fn end(&mut self, cause: EndCause) {
        if self.ended.is_some() {
            return;
        }
        self.ended = Some(cause);
        self.pending = PendingMoves::default();
        info!(
            ?cause,
            score = self.player.score,
            tick = self.tick,
            moves = self.moves,
            "round ended"
        );
    }

    fn restart(&mut self) {
        let Ok((grid, spawns)) = Grid::parse(&self.template) else {
            warn!("stored template no longer parses; keeping previous board");
            return;
        };
        self.grid = grid;
        self.player = Player::new(spawns.player);
        self.player_alive = true;
        self.ghosts = spawns
            .ghosts
            .iter()
            .map(|(id, pos)| Ghost::new(*id, *pos))
            .collect();
        self.pending = PendingMoves::default();
        self.moves = 0;
        self.tick = 0;
        self.ended = None;
        info!("fresh round started");
        self.publish();
    }

    fn authenticate(&self, role: Role, session_id: &str) -> Result<(), GameError> {
        let Some(seat) = self.seat(role) else {
            return Err(GameError::RoleNotConnected(role));
        };
        if seat.session_id != session_id {
            warn!(%role, "session id mismatch");
            return Err(GameError::ImpersonationRejected(role));
        }
        Ok(())
    }

    fn policy_player_order(&mut self) -> Option<Order> {
        let seat = self.player_seat.as_mut()?;
        let MoveSource::PolicyDriven(policy) = &mut seat.source else {
            return None;
        };
        Some(policy.choose(&self.grid, self.player.pos, self.player.pos))
    }

    fn policy_ghost_orders(&mut self) -> Option<Vec<Order>> {
        let seat = self.ghost_seat.as_mut()?;
        let MoveSource::PolicyDriven(policy) = &mut seat.source else {
            return None;
        };
        let player = self.player.pos;
        Some(
            self.ghosts
                .iter()
                .map(|ghost| policy.choose(&self.grid, ghost.pos, player))
                .collect(),
        )
    }

    fn seat(&self, role: Role) -> Option<&Seat> {
        match role {
            Role::Player => self.player_seat.as_ref(),
            Role::Ghost => self.ghost_seat.as_ref(),
        }
    }

    fn seat_mut(&mut self, role: Role) -> &mut Option<Seat> {
        match role {
            Role::Player => &mut self.player_seat,
            Role::Ghost => &mut self.ghost_seat,
        }
    }

    fn report(&self, status: SubmitStatus) -> SubmitReport {
        SubmitReport {
            status,
            phase: self.phase(),
            score: self.player.score,
            tick: self.tick,
        }
    }

    fn publish(&mut self) {
        let message = self.snapshot();
        self.publisher.publish(&message);
    }
}

fn make_session_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::constants::CLASSIC_TEMPLATE;
    use crate::error::GameError;
    use crate::policy::{GreedyChase, MoveSource, RandomWalk, Scripted};
    use crate::rng::Rng;
    use crate::snapshot::SnapshotLog;
    use crate::types::{CellKind, Direction, EndCause, GhostId, Pos, Role, RoundPhase};

    use super::{MoveRequest, Round, SubmitStatus};

    // 0: #######
    // 1: #p.a..#
    // 2: #.###.#
    // 3: #b c d#
    // 4: #######
    const DUEL: [&str; 5] = ["#######", "#p.a..#", "#.###.#", "#b c d#", "#######"];

    fn round(template: &[&str]) -> Round<SnapshotLog> {
        Round::new(template, SnapshotLog::default()).expect("template parses")
    }

    fn seat_both(round: &mut Round<SnapshotLog>) -> (String, String) {
        let player = round
            .connect(Role::Player, MoveSource::HumanSubmitted)
            .expect("player seat is free");
        let ghost = round
            .connect(Role::Ghost, MoveSource::HumanSubmitted)
            .expect("ghost seat is free");
        (player, ghost)
    }

    fn count_marks(round: &Round<SnapshotLog>, mark: CellKind) -> usize {
        let grid = round.grid();
        (0..grid.rows() as i32)
            .flat_map(|row| (0..grid.cols() as i32).map(move |col| Pos::new(row, col)))
            .filter(|pos| grid.cell_at(*pos) == Ok(mark))
            .count()
    }

    #[test]
    fn phases_follow_role_connections() {
        let mut round = round(&DUEL);
        assert_eq!(round.phase(), RoundPhase::WaitingForPlayer);
        round
            .connect(Role::Player, MoveSource::HumanSubmitted)
            .expect("player seat is free");
        assert_eq!(round.phase(), RoundPhase::WaitingForGhost);
        round
            .connect(Role::Ghost, MoveSource::HumanSubmitted)
            .expect("ghost seat is free");
        assert_eq!(round.phase(), RoundPhase::Active);
    }

    #[test]
    fn second_connection_for_same_role_is_refused() {
        let mut round = round(&DUEL);
        round
            .connect(Role::Player, MoveSource::HumanSubmitted)
            .expect("player seat is free");
        assert_eq!(
            round.connect(Role::Player, MoveSource::HumanSubmitted),
            Err(GameError::RoleAlreadyConnected(Role::Player))
        );
    }

    #[test]
    fn classic_board_player_eats_pellet_to_the_right() {
        let mut template: Vec<String> = CLASSIC_TEMPLATE.iter().map(|row| row.to_string()).collect();
        template[14].replace_range(2..3, ".");
        let mut round = Round::new(&template, SnapshotLog::default()).expect("template parses");
        let player = round
            .connect(Role::Player, MoveSource::HumanSubmitted)
            .expect("player seat is free");

        let report = round
            .submit_move(&player, MoveRequest::Player(Direction::Right))
            .expect("move accepted");

        assert_eq!(report.status, SubmitStatus::Applied);
        assert_eq!(report.phase, RoundPhase::WaitingForGhost);
        assert_eq!(round.player().pos, Pos::new(14, 2));
        assert_eq!(round.player().score, 1);
        assert_eq!(round.grid().cell_at(Pos::new(14, 1)), Ok(CellKind::Empty));
        assert_eq!(round.grid().cell_at(Pos::new(14, 2)), Ok(CellKind::PlayerMark));
        let published = round.publisher().last().expect("snapshot published");
        assert_eq!(published.score, 1);
        assert_eq!(published.board[14][2], 'p');
    }

    #[test]
    fn ghost_catching_player_ends_round_and_rejects_later_moves() {
        let mut round = round(&DUEL);
        let ghost = round
            .connect(Role::Ghost, MoveSource::HumanSubmitted)
            .expect("ghost seat is free");
        round
            .submit_move(
                &ghost,
                MoveRequest::Ghosts(vec![
                    Direction::Left,
                    Direction::Right,
                    Direction::Left,
                    Direction::Up,
                ]),
            )
            .expect("ghost move accepted");
        // ghost a now stands next to the player at (1,2)
        assert_eq!(round.ghosts()[0].pos, Pos::new(1, 2));
        assert_eq!(round.ghosts()[0].covered, CellKind::Pellet);

        let player = round
            .connect(Role::Player, MoveSource::HumanSubmitted)
            .expect("player seat is free");
        round
            .submit_move(&player, MoveRequest::Player(Direction::Down))
            .expect("player move buffered");
        let report = round
            .submit_move(
                &ghost,
                MoveRequest::Ghosts(vec![
                    Direction::Left,
                    Direction::Right,
                    Direction::Left,
                    Direction::Up,
                ]),
            )
            .expect("tick resolves");
        // player moved down to (2,1); ghost a took the cell it left
        assert_eq!(report.status, SubmitStatus::TickResolved);
        assert_eq!(round.phase(), RoundPhase::Active);

        // player steps down to (3,1), right next to ghost b
        round
            .submit_move(&player, MoveRequest::Player(Direction::Down))
            .expect("player move buffered");
        let report = round
            .submit_move(
                &ghost,
                MoveRequest::Ghosts(vec![
                    Direction::Down,
                    Direction::Left,
                    Direction::Up,
                    Direction::Up,
                ]),
            )
            .expect("tick resolves");
        assert_eq!(report.phase, RoundPhase::Ended(EndCause::PlayerCaught));
        assert!(!round.is_player_alive());
        assert_eq!(count_marks(&round, CellKind::PlayerMark), 0);
        assert_eq!(
            round.submit_move(&player, MoveRequest::Player(Direction::Up)),
            Err(GameError::RoundEnded)
        );
        let last = round.publisher().last().expect("snapshot published");
        assert_eq!(last.outcome, Some(EndCause::PlayerCaught));
    }

    #[test]
    fn adjacent_ghost_moving_onto_player_catches_immediately() {
        let mut round = round(&["####", "#pa#", "#bcd"]);
        let ghost = round
            .connect(Role::Ghost, MoveSource::HumanSubmitted)
            .expect("ghost seat is free");
        let before = round.grid().clone();
        let report = round
            .submit_move(
                &ghost,
                MoveRequest::Ghosts(vec![
                    Direction::Left,
                    Direction::Up,
                    Direction::Up,
                    Direction::Up,
                ]),
            )
            .expect("ghost move accepted");
        assert_eq!(report.phase, RoundPhase::Ended(EndCause::PlayerCaught));
        assert_eq!(round.ghosts()[0].pos, Pos::new(1, 2));
        assert_eq!(round.grid().cell_at(Pos::new(1, 1)), Ok(CellKind::Empty));
        assert_eq!(
            round.grid().cell_at(Pos::new(1, 2)),
            before.cell_at(Pos::new(1, 2))
        );
    }

    #[test]
    fn player_walking_into_ghost_is_caught() {
        let mut round = round(&DUEL);
        let player = round
            .connect(Role::Player, MoveSource::HumanSubmitted)
            .expect("player seat is free");
        round
            .submit_move(&player, MoveRequest::Player(Direction::Right))
            .expect("move accepted");
        let report = round
            .submit_move(&player, MoveRequest::Player(Direction::Right))
            .expect("move accepted");
        assert_eq!(report.phase, RoundPhase::Ended(EndCause::PlayerCaught));
        assert_eq!(report.score, 1);
    }

    #[test]
    fn impersonated_move_is_rejected_without_mutation() {
        let mut round = round(&DUEL);
        let (player, ghost) = seat_both(&mut round);
        let before = round.grid().clone();
        let published = round.publisher().messages.len();

        assert_eq!(
            round.submit_move(&ghost, MoveRequest::Player(Direction::Right)),
            Err(GameError::ImpersonationRejected(Role::Player))
        );
        assert_eq!(
            round.submit_move("forged", MoveRequest::Player(Direction::Right)),
            Err(GameError::ImpersonationRejected(Role::Player))
        );
        assert_eq!(
            round.submit_move(&player, MoveRequest::Ghosts(vec![Direction::Up; 4])),
            Err(GameError::ImpersonationRejected(Role::Ghost))
        );
        assert_eq!(round.grid(), &before);
        assert_eq!(round.publisher().messages.len(), published);
        assert_eq!(round.moves(), 0);
    }

    #[test]
    fn move_for_unseated_role_is_rejected() {
        let mut round = round(&DUEL);
        assert_eq!(
            round.submit_move("anything", MoveRequest::Player(Direction::Right)),
            Err(GameError::RoleNotConnected(Role::Player))
        );
    }

    #[test]
    fn ghost_orders_must_cover_every_ghost() {
        let mut round = round(&DUEL);
        let (_, ghost) = seat_both(&mut round);
        assert_eq!(
            round.submit_move(&ghost, MoveRequest::Ghosts(vec![Direction::Up; 3])),
            Err(GameError::WrongArity {
                expected: 4,
                got: 3
            })
        );
    }

    #[test]
    fn tick_waits_for_both_sides() {
        let mut round = round(&DUEL);
        let (player, ghost) = seat_both(&mut round);
        let before = round.grid().clone();

        let report = round
            .submit_move(&player, MoveRequest::Player(Direction::Down))
            .expect("player move buffered");
        assert_eq!(report.status, SubmitStatus::Buffered);
        assert_eq!(round.grid(), &before);

        let report = round
            .submit_move(
                &ghost,
                MoveRequest::Ghosts(vec![
                    Direction::Right,
                    Direction::Right,
                    Direction::Right,
                    Direction::Left,
                ]),
            )
            .expect("tick resolves");
        assert_eq!(report.status, SubmitStatus::TickResolved);
        assert_eq!(report.tick, 1);
        assert_eq!(round.player().pos, Pos::new(2, 1));
        assert_eq!(round.player().score, 1);
        assert_eq!(round.ghosts()[0].pos, Pos::new(1, 4));
        assert_eq!(round.ghosts()[1].pos, Pos::new(3, 2));
        assert_eq!(round.ghosts()[2].pos, Pos::new(3, 4));
        // d was blocked by c taking (3,4) first
        assert_eq!(round.ghosts()[3].pos, Pos::new(3, 5));
        assert_eq!(round.moves(), 2);
    }

    #[test]
    fn latest_buffered_move_wins() {
        let mut round = round(&DUEL);
        let (player, ghost) = seat_both(&mut round);
        round
            .submit_move(&player, MoveRequest::Player(Direction::Right))
            .expect("buffered");
        round
            .submit_move(&player, MoveRequest::Player(Direction::Down))
            .expect("buffered");
        round
            .submit_move(&ghost, MoveRequest::Ghosts(vec![Direction::Down; 4]))
            .expect("tick resolves");
        assert_eq!(round.player().pos, Pos::new(2, 1));
    }

    #[test]
    fn second_ghost_into_same_cell_is_blocked() {
        let mut round = round(&DUEL);
        let ghost = round
            .connect(Role::Ghost, MoveSource::HumanSubmitted)
            .expect("ghost seat is free");
        round
            .submit_move(
                &ghost,
                MoveRequest::Ghosts(vec![
                    Direction::Up,
                    Direction::Right,
                    Direction::Left,
                    Direction::Up,
                ]),
            )
            .expect("ghost move accepted");
        assert_eq!(round.ghosts()[1].pos, Pos::new(3, 2));
        assert_eq!(round.ghosts()[2].pos, Pos::new(3, 3));
        assert_eq!(
            round.grid().cell_at(Pos::new(3, 2)),
            Ok(CellKind::GhostMark(GhostId::B))
        );
    }

    #[test]
    fn clearing_last_pellet_ends_round() {
        let mut round = round(&["#p.#", "abcd"]);
        let player = round
            .connect(Role::Player, MoveSource::HumanSubmitted)
            .expect("player seat is free");
        assert_eq!(round.pellets_remaining(), 1);
        let report = round
            .submit_move(&player, MoveRequest::Player(Direction::Right))
            .expect("move accepted");
        assert_eq!(report.phase, RoundPhase::Ended(EndCause::AllPelletsCleared));
        assert_eq!(round.pellets_remaining(), 0);
    }

    #[test]
    fn pellet_under_ghost_still_counts() {
        let mut round = round(&["#p #", "#a.#", "#bcd"]);
        let ghost = round
            .connect(Role::Ghost, MoveSource::HumanSubmitted)
            .expect("ghost seat is free");
        round
            .submit_move(
                &ghost,
                MoveRequest::Ghosts(vec![
                    Direction::Right,
                    Direction::Up,
                    Direction::Up,
                    Direction::Up,
                ]),
            )
            .expect("ghost move accepted");
        assert_eq!(round.grid().pellets_remaining(), 0);
        assert_eq!(round.pellets_remaining(), 1);
        assert_eq!(round.phase(), RoundPhase::WaitingForPlayer);
    }

    #[test]
    fn disconnect_ends_round_and_newcomer_gets_fresh_board() {
        let mut round = round(&DUEL);
        let (player, ghost) = seat_both(&mut round);
        round
            .submit_move(&player, MoveRequest::Player(Direction::Right))
            .expect("buffered");
        round
            .submit_move(&ghost, MoveRequest::Ghosts(vec![Direction::Down; 4]))
            .expect("tick resolves");
        assert_eq!(round.player().score, 1);

        assert_eq!(
            round.disconnect(Role::Player, &ghost),
            Err(GameError::ImpersonationRejected(Role::Player))
        );
        round
            .disconnect(Role::Player, &player)
            .expect("player leaves");
        assert_eq!(round.phase(), RoundPhase::Ended(EndCause::RoleDisconnected));
        assert_eq!(
            round.submit_move(&ghost, MoveRequest::Ghosts(vec![Direction::Down; 4])),
            Err(GameError::RoundEnded)
        );

        let newcomer = round
            .connect(Role::Player, MoveSource::HumanSubmitted)
            .expect("player seat is free again");
        assert_eq!(round.phase(), RoundPhase::Active);
        assert_eq!(round.player().score, 0);
        assert_eq!(round.grid().cell_at(Pos::new(1, 2)), Ok(CellKind::Pellet));

        round
            .submit_move(&newcomer, MoveRequest::Player(Direction::Down))
            .expect("buffered");
        let report = round
            .submit_move(&ghost, MoveRequest::Ghosts(vec![Direction::Down; 4]))
            .expect("surviving ghost session still valid");
        assert_eq!(report.status, SubmitStatus::TickResolved);
    }

    #[test]
    fn reset_requires_a_seated_session() {
        let mut round = round(&DUEL);
        let player = round
            .connect(Role::Player, MoveSource::HumanSubmitted)
            .expect("player seat is free");
        round
            .submit_move(&player, MoveRequest::Player(Direction::Right))
            .expect("applied");
        assert_eq!(
            round.reset("nobody"),
            Err(GameError::ImpersonationRejected(Role::Player))
        );
        round.reset(&player).expect("seated session may reset");
        assert_eq!(round.player().pos, Pos::new(1, 1));
        assert_eq!(round.player().score, 0);
        assert!(round.is_connected(Role::Player));
    }

    #[test]
    fn policy_driven_ghosts_complete_tick_on_player_move() {
        let mut round = round(&DUEL);
        let player = round
            .connect(Role::Player, MoveSource::HumanSubmitted)
            .expect("player seat is free");
        round
            .connect(
                Role::Ghost,
                MoveSource::PolicyDriven(Box::new(Scripted::new([Direction::Right]))),
            )
            .expect("ghost seat is free");

        let report = round
            .submit_move(&player, MoveRequest::Player(Direction::Down))
            .expect("tick resolves");
        assert_eq!(report.status, SubmitStatus::TickResolved);
        // the script covers ghost a only; the rest stay put
        assert_eq!(round.ghosts()[0].pos, Pos::new(1, 4));
        assert_eq!(round.ghosts()[1].pos, Pos::new(3, 1));
    }

    #[test]
    fn policy_driven_role_ignores_submitted_direction() {
        let mut round = round(&DUEL);
        let player = round
            .connect(
                Role::Player,
                MoveSource::PolicyDriven(Box::new(Scripted::new([Direction::Down]))),
            )
            .expect("player seat is free");
        round
            .submit_move(&player, MoveRequest::Player(Direction::Right))
            .expect("applied");
        assert_eq!(round.player().pos, Pos::new(2, 1));
    }

    #[test]
    fn autonomous_rounds_keep_score_and_pellets_consistent() {
        for seed in 0..20u32 {
            let mut round = Round::classic(SnapshotLog::default()).expect("classic parses");
            let initial_pellets = round.pellets_remaining();
            round
                .connect(
                    Role::Player,
                    MoveSource::PolicyDriven(Box::new(RandomWalk::new(Rng::new(seed)))),
                )
                .expect("player seat is free");
            round
                .connect(
                    Role::Ghost,
                    MoveSource::PolicyDriven(Box::new(GreedyChase::new(0.3, Rng::new(seed + 1)))),
                )
                .expect("ghost seat is free");

            let mut last_score = 0;
            let mut last_pellets = initial_pellets;
            for _ in 0..400 {
                let report = match round.advance_autonomous() {
                    Ok(report) => report,
                    Err(GameError::RoundEnded) => break,
                    Err(err) => panic!("unexpected error: {err}"),
                };
                assert_eq!(report.status, SubmitStatus::TickResolved);
                let score = round.player().score;
                let pellets = round.pellets_remaining();
                assert!(score >= last_score);
                assert!(pellets <= last_pellets);
                assert_eq!(score as usize + pellets, initial_pellets);
                for id in GhostId::ALL {
                    assert_eq!(count_marks(&round, CellKind::GhostMark(id)), 1);
                }
                if round.phase() == RoundPhase::Active {
                    assert_eq!(count_marks(&round, CellKind::PlayerMark), 1);
                }
                last_score = score;
                last_pellets = pellets;
            }
        }
    }

    #[test]
    fn human_side_holds_autonomous_tick() {
        let mut round = round(&DUEL);
        round
            .connect(Role::Player, MoveSource::HumanSubmitted)
            .expect("player seat is free");
        round
            .connect(
                Role::Ghost,
                MoveSource::PolicyDriven(Box::new(Scripted::new([Direction::Right]))),
            )
            .expect("ghost seat is free");
        let report = round.advance_autonomous().expect("round is live");
        assert_eq!(report.status, SubmitStatus::Buffered);
        assert_eq!(round.tick(), 0);
    }

    #[test]
    fn snapshot_published_at_start_and_per_tick() {
        let mut round = round(&DUEL);
        assert_eq!(round.publisher().messages.len(), 1);
        let (player, ghost) = seat_both(&mut round);
        round
            .submit_move(&player, MoveRequest::Player(Direction::Down))
            .expect("buffered");
        assert_eq!(round.publisher().messages.len(), 1);
        round
            .submit_move(&ghost, MoveRequest::Ghosts(vec![Direction::Down; 4]))
            .expect("tick resolves");
        assert_eq!(round.publisher().messages.len(), 2);
        assert_eq!(round.publisher().last().map(|m| m.tick), Some(1));
    }
}
