//! Game state: board, active piece, queue, score and the run/pause/game-over machine.

use crate::GameConfig;
use crate::board::{self, Board, Position};
use crate::piece::{Piece, PieceGenerator};
use crate::scoring::{self, INITIAL_DROP_INTERVAL, SOFT_DROP_INTERVAL};
use log::{debug, info};
use std::time::{Duration, Instant};

/// Widest catalog piece; spawn column centres a piece of this width.
const SPAWN_WIDTH: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Before the first start, and after a finished game has been acknowledged.
    Idle,
    Running,
    Paused,
    /// Final board and score stay readable until the front end records the score.
    GameOver,
}

/// Discrete commands accepted from the input side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveLeft,
    MoveRight,
    Rotate,
    SoftDropOn,
    SoftDropOff,
    Start,
    Pause,
    Restart,
}

/// What one call to [`GameState::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running; nothing was touched.
    Inactive,
    /// Interval not yet elapsed.
    Waiting,
    /// Active piece fell one row.
    Fell,
    /// Active piece landed; `lines` rows were cleared and a new piece spawned.
    Locked { lines: u32 },
    /// The new piece could not spawn. `score` is the final score.
    GameOver { score: u32 },
}

#[derive(Debug)]
pub struct GameState {
    pub board: Board,
    pub piece: Option<Piece>,
    pub position: Position,
    pub generator: PieceGenerator,
    pub score: u32,
    pub lines_cleared: u32,
    pub drop_interval: Duration,
    pub soft_drop: bool,
    pub status: Status,
    /// Most recent lock that removed rows; replaced on the next such lock.
    pub last_clear: Option<LineClear>,
    /// Time of the last gravity step (or of start/resume).
    last_drop: Option<Instant>,
}

/// Rows removed by a lock, with the board as it stood just before removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineClear {
    pub rows: Vec<usize>,
    pub board: Board,
}

impl GameState {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            board: Board::new(config.width, config.height),
            piece: None,
            position: Position::ZERO,
            generator: PieceGenerator::new(config.seed, config.lookahead),
            score: 0,
            lines_cleared: 0,
            drop_interval: INITIAL_DROP_INTERVAL,
            soft_drop: false,
            status: Status::Idle,
            last_clear: None,
            last_drop: None,
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    /// Interval the next gravity step waits for.
    pub fn effective_interval(&self) -> Duration {
        if self.soft_drop {
            SOFT_DROP_INTERVAL
        } else {
            self.drop_interval
        }
    }

    /// Score awaiting a player name, while the game is over.
    pub fn pending_score(&self) -> Option<u32> {
        (self.status == Status::GameOver).then_some(self.score)
    }

    pub fn upcoming(&self) -> impl Iterator<Item = &Piece> {
        self.generator.upcoming()
    }

    fn spawn_position(&self) -> Position {
        Position::new((self.board.width as i32 - SPAWN_WIDTH).max(0) / 2, 0)
    }

    /// Pull the next piece from the queue. Returns false if it is blocked at spawn.
    fn spawn_next(&mut self) -> bool {
        let piece = self.generator.next_piece();
        self.position = self.spawn_position();
        let blocked = self
            .board
            .collides(&piece.shape, self.position, Position::ZERO);
        self.piece = Some(piece);
        !blocked
    }

    fn reset(&mut self) {
        self.board.reset();
        self.piece = None;
        self.position = Position::ZERO;
        self.generator.clear();
        self.score = 0;
        self.lines_cleared = 0;
        self.drop_interval = INITIAL_DROP_INTERVAL;
        self.soft_drop = false;
        self.last_clear = None;
        self.last_drop = None;
        self.status = Status::Idle;
    }

    fn enter_game_over(&mut self) -> TickOutcome {
        self.status = Status::GameOver;
        self.soft_drop = false;
        info!("game over: score {}, lines {}", self.score, self.lines_cleared);
        TickOutcome::GameOver { score: self.score }
    }

    /// Idle -> Running with a fresh first piece.
    pub fn start(&mut self, now: Instant) {
        if self.status != Status::Idle {
            return;
        }
        self.status = Status::Running;
        self.last_drop = Some(now);
        info!(
            "game started on a {}x{} board",
            self.board.width, self.board.height
        );
        if !self.spawn_next() {
            self.enter_game_over();
        }
    }

    /// Running <-> Paused. Resuming restarts the gravity clock at `now`.
    pub fn toggle_pause(&mut self, now: Instant) {
        match self.status {
            Status::Running => {
                self.status = Status::Paused;
                self.soft_drop = false;
                info!("paused");
            }
            Status::Paused => {
                self.status = Status::Running;
                self.last_drop = Some(now);
                info!("resumed");
            }
            Status::Idle | Status::GameOver => {}
        }
    }

    /// Wipe the session and start a new one, from any state.
    pub fn restart(&mut self, now: Instant) {
        info!("restart (final score {})", self.score);
        self.reset();
        self.start(now);
    }

    /// Leave the game-over state for Idle once the score has been handled.
    pub fn acknowledge_game_over(&mut self) {
        if self.status == Status::GameOver {
            self.reset();
        }
    }

    /// Dispatch an input command, enforcing which states accept it.
    pub fn apply(&mut self, command: Command, now: Instant) {
        match command {
            Command::Start => self.start(now),
            Command::Pause => self.toggle_pause(now),
            Command::Restart => self.restart(now),
            Command::MoveLeft => {
                self.move_left();
            }
            Command::MoveRight => {
                self.move_right();
            }
            Command::Rotate => {
                self.rotate();
            }
            Command::SoftDropOn => {
                self.soft_drop_on();
            }
            Command::SoftDropOff => self.soft_drop_off(),
        }
    }

    /// Shift the active piece by `dx` if the target is free.
    fn try_shift(&mut self, dx: i32, dy: i32) -> bool {
        if !self.is_running() {
            return false;
        }
        let Some(piece) = self.piece.as_ref() else {
            return false;
        };
        let offset = Position::new(dx, dy);
        if self.board.collides(&piece.shape, self.position, offset) {
            return false;
        }
        self.position.x += dx;
        self.position.y += dy;
        true
    }

    pub fn move_left(&mut self) -> bool {
        self.try_shift(-1, 0)
    }

    pub fn move_right(&mut self) -> bool {
        self.try_shift(1, 0)
    }

    pub fn rotate(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        let Some(piece) = self.piece.as_mut() else {
            return false;
        };
        match board::rotate(piece, self.position, &self.board) {
            Some((shape, position)) => {
                piece.shape = shape;
                self.position = position;
                true
            }
            None => false,
        }
    }

    /// Hold soft drop and nudge the piece down one row right away.
    pub fn soft_drop_on(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.soft_drop = true;
        self.try_shift(0, 1)
    }

    pub fn soft_drop_off(&mut self) {
        self.soft_drop = false;
    }

    /// Advance the gravity clock to `now`, stepping at most once.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if !self.is_running() {
            return TickOutcome::Inactive;
        }
        let Some(last) = self.last_drop else {
            self.last_drop = Some(now);
            return TickOutcome::Waiting;
        };
        if now.saturating_duration_since(last) <= self.effective_interval() {
            return TickOutcome::Waiting;
        }
        self.last_drop = Some(now);
        self.gravity_step()
    }

    /// Move down one row, or lock the piece and bring in the next one.
    fn gravity_step(&mut self) -> TickOutcome {
        if self.try_shift(0, 1) {
            return TickOutcome::Fell;
        }
        let Some(piece) = self.piece.take() else {
            return TickOutcome::Waiting;
        };
        self.board.merge(&piece, self.position);

        let full = self.board.full_rows();
        if !full.is_empty() {
            self.last_clear = Some(LineClear {
                rows: full,
                board: self.board.clone(),
            });
        }
        let lines = self.board.clear_lines();
        if lines > 0 {
            self.score = scoring::update_score(self.score, lines);
            self.lines_cleared += lines;
            debug!("cleared {} line(s), score {}", lines, self.score);
        }
        let interval = scoring::drop_interval_for(self.score);
        if interval != self.drop_interval {
            debug!(
                "drop interval {}ms -> {}ms",
                self.drop_interval.as_millis(),
                interval.as_millis()
            );
            self.drop_interval = interval;
        }

        if !self.spawn_next() {
            return self.enter_game_over();
        }
        TickOutcome::Locked { lines }
    }

    #[cfg(test)]
    pub fn place_for_test(&mut self, piece: Piece, position: Position) {
        self.piece = Some(piece);
        self.position = position;
    }
}
