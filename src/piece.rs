//! Tetromino catalog and the random piece generator with its lookahead queue.

use crate::board::{Cell, Shape};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Number of upcoming pieces kept in the queue; also the smallest allowed.
pub const DEFAULT_LOOKAHEAD: usize = 3;

/// Tetromino kinds, in catalog order. The colour id of a kind is its position + 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TetrominoKind {
    I,
    T,
    Z,
    S,
    L,
    J,
    O,
}

impl TetrominoKind {
    pub const ALL: [Self; 7] = [Self::I, Self::T, Self::Z, Self::S, Self::L, Self::J, Self::O];

    /// Palette index 1..=7 used both for the piece and for the cells it leaves behind.
    pub fn color(self) -> Cell {
        match self {
            Self::I => 1,
            Self::T => 2,
            Self::Z => 3,
            Self::S => 4,
            Self::L => 5,
            Self::J => 6,
            Self::O => 7,
        }
    }

    /// Spawn orientation. Filled cells carry the kind's colour id.
    pub fn shape(self) -> Shape {
        let c = self.color();
        match self {
            Self::I => vec![vec![c, c, c, c]],
            Self::T => vec![vec![c, c, c], vec![0, c, 0]],
            Self::Z => vec![vec![c, c, 0], vec![0, c, c]],
            Self::S => vec![vec![0, c, c], vec![c, c, 0]],
            Self::L => vec![vec![c, c, c], vec![c, 0, 0]],
            Self::J => vec![vec![c, c, c], vec![0, 0, c]],
            Self::O => vec![vec![c, c], vec![c, c]],
        }
    }
}

/// A piece: its current rotation state and colour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub kind: TetrominoKind,
    pub shape: Shape,
    pub color: Cell,
}

impl Piece {
    pub fn new(kind: TetrominoKind) -> Self {
        Self {
            kind,
            shape: kind.shape(),
            color: kind.color(),
        }
    }

    /// Bounding box as (columns, rows).
    pub fn dims(&self) -> (usize, usize) {
        let rows = self.shape.len();
        let cols = self.shape.first().map_or(0, Vec::len);
        (cols, rows)
    }
}

/// Uniform random generator feeding a FIFO of upcoming pieces.
#[derive(Debug, Clone)]
pub struct PieceGenerator {
    rng: StdRng,
    queue: VecDeque<Piece>,
    lookahead: usize,
}

impl PieceGenerator {
    /// Seeded generator; `None` draws the seed from the OS. `lookahead` is
    /// raised to [`DEFAULT_LOOKAHEAD`] if smaller.
    pub fn new(seed: Option<u64>, lookahead: usize) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            queue: VecDeque::with_capacity(lookahead.max(DEFAULT_LOOKAHEAD) + 1),
            lookahead: lookahead.max(DEFAULT_LOOKAHEAD),
        }
    }

    /// Fresh piece of a uniformly chosen kind.
    pub fn generate(&mut self) -> Piece {
        let idx = self.rng.gen_range(0..TetrominoKind::ALL.len());
        Piece::new(TetrominoKind::ALL[idx])
    }

    /// Pop the front of the queue as the new current piece, refilling as needed.
    pub fn next_piece(&mut self) -> Piece {
        if self.queue.is_empty() {
            for _ in 0..self.lookahead {
                let p = self.generate();
                self.queue.push_back(p);
            }
        }
        let fresh = self.generate();
        self.queue.push_back(fresh);
        // Non-empty: either refilled above or holds `fresh`.
        self.queue.pop_front().unwrap_or_else(|| self.generate())
    }

    /// Upcoming pieces, front first.
    pub fn upcoming(&self) -> impl Iterator<Item = &Piece> {
        self.queue.iter()
    }

    pub fn lookahead(&self) -> usize {
        self.lookahead
    }

    /// Drop every queued piece; the next call to `next_piece` refills.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_colors_are_distinct_and_in_range() {
        let colors: HashSet<Cell> = TetrominoKind::ALL.iter().map(|k| k.color()).collect();
        assert_eq!(colors.len(), 7);
        assert!(colors.iter().all(|c| (1..=7).contains(c)));
    }

    #[test]
    fn test_every_shape_has_four_cells_of_its_color() {
        for kind in TetrominoKind::ALL {
            let shape = kind.shape();
            let filled: Vec<Cell> = shape.iter().flatten().copied().filter(|&c| c != 0).collect();
            assert_eq!(filled.len(), 4, "{kind:?}");
            assert!(filled.iter().all(|&c| c == kind.color()));
            let width = shape[0].len();
            assert!(shape.iter().all(|row| row.len() == width));
        }
    }

    #[test]
    fn test_first_next_piece_refills_queue() {
        let mut generator = PieceGenerator::new(Some(7), 3);
        assert_eq!(generator.upcoming().count(), 0);
        let _current = generator.next_piece();
        assert_eq!(generator.upcoming().count(), 3);
        for _ in 0..20 {
            generator.next_piece();
            assert_eq!(generator.upcoming().count(), 3);
        }
    }

    #[test]
    fn test_next_piece_returns_queue_front() {
        let mut generator = PieceGenerator::new(Some(1), 3);
        generator.next_piece();
        let front = generator.upcoming().next().cloned();
        let popped = generator.next_piece();
        assert_eq!(Some(popped), front);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = PieceGenerator::new(Some(42), 3);
        let mut b = PieceGenerator::new(Some(42), 3);
        for _ in 0..50 {
            assert_eq!(a.next_piece().kind, b.next_piece().kind);
        }
    }

    #[test]
    fn test_generator_produces_every_kind() {
        let mut generator = PieceGenerator::new(Some(3), 3);
        let seen: HashSet<TetrominoKind> = (0..500).map(|_| generator.generate().kind).collect();
        assert_eq!(seen.len(), 7);
    }

    #[test]
    fn test_clear_empties_queue() {
        let mut generator = PieceGenerator::new(Some(9), 3);
        generator.next_piece();
        generator.clear();
        assert_eq!(generator.upcoming().count(), 0);
        generator.next_piece();
        assert_eq!(generator.upcoming().count(), 3);
    }

    #[test]
    fn test_short_lookahead_still_queues_three() {
        for lookahead in [0, 1, 2] {
            let mut generator = PieceGenerator::new(Some(1), lookahead);
            assert_eq!(generator.lookahead(), DEFAULT_LOOKAHEAD);
            for _ in 0..10 {
                generator.next_piece();
                assert!(generator.upcoming().count() >= 3, "lookahead {lookahead}");
            }
        }
    }

    #[test]
    fn test_longer_lookahead_is_kept() {
        let mut generator = PieceGenerator::new(Some(1), 5);
        generator.next_piece();
        assert_eq!(generator.upcoming().count(), 5);
    }
}
