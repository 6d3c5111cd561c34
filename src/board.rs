//! Board: settled cells, collision tests, merging, line clears and rotation.

use crate::piece::Piece;
use std::collections::VecDeque;

/// 0 is empty; 1..=7 is a palette index.
pub type Cell = u8;

pub const EMPTY: Cell = 0;

/// One rotation state of a piece; rectangular, row-major.
pub type Shape = Vec<Vec<Cell>>;

pub const DEFAULT_WIDTH: u16 = 12;
pub const DEFAULT_HEIGHT: u16 = 20;
/// Accepted board sizes, in cells, for either dimension.
pub const MIN_SIZE: u16 = 4;
pub const MAX_WIDTH: u16 = 64;
pub const MAX_HEIGHT: u16 = 64;

/// Top-left anchor of a piece's bounding box, or a relative offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const ZERO: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Fixed-size grid of settled cells. y=0 is the top row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub width: usize,
    pub height: usize,
    /// rows[y][x]; rows[0] is top.
    rows: VecDeque<Vec<Cell>>,
}

impl Board {
    pub fn new(width: u16, height: u16) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self {
            width: w,
            height: h,
            rows: (0..h).map(|_| vec![EMPTY; w]).collect(),
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        self.rows.get(y).and_then(|row| row.get(x)).copied()
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if let Some(row) = self.rows.get_mut(y) {
            if let Some(c) = row.get_mut(x) {
                *c = cell;
            }
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rows.iter().flatten().all(|&c| c == EMPTY)
    }

    pub fn reset(&mut self) {
        for row in &mut self.rows {
            row.fill(EMPTY);
        }
    }

    /// True if `shape` placed at `pos + offset` leaves the side walls, sinks below
    /// the floor or overlaps a settled cell. Rows above the top never collide.
    pub fn collides(&self, shape: &Shape, pos: Position, offset: Position) -> bool {
        for (r, row) in shape.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                if value == EMPTY {
                    continue;
                }
                let x = pos.x + c as i32 + offset.x;
                let y = pos.y + r as i32 + offset.y;

                if x < 0 || x >= self.width as i32 {
                    return true;
                }
                if y >= self.height as i32 {
                    return true;
                }
                if y >= 0 && self.get(x as usize, y as usize).is_some_and(|c| c != EMPTY) {
                    return true;
                }
            }
        }
        false
    }

    /// Commit a piece into the grid. The placement must already be collision-free;
    /// cells above the top row are dropped, anything else out of range panics.
    pub fn merge(&mut self, piece: &Piece, pos: Position) {
        for (r, row) in piece.shape.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                if value == EMPTY {
                    continue;
                }
                let x = pos.x + c as i32;
                let y = pos.y + r as i32;
                if y < 0 {
                    continue;
                }
                assert!(
                    x >= 0 && (x as usize) < self.width && (y as usize) < self.height,
                    "merge outside the board at ({x}, {y})"
                );
                self.set(x as usize, y as usize, piece.color);
            }
        }
    }

    /// Indices of rows with no empty cell, top to bottom.
    pub fn full_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().all(|&c| c != EMPTY))
            .map(|(y, _)| y)
            .collect()
    }

    /// Remove every full row, shifting rows above down. Returns rows removed.
    pub fn clear_lines(&mut self) -> u32 {
        let mut cleared = 0;
        let mut y = self.height;
        while y > 0 {
            let idx = y - 1;
            if self.rows[idx].iter().all(|&c| c != EMPTY) {
                self.rows.remove(idx);
                self.rows.push_front(vec![EMPTY; self.width]);
                cleared += 1;
                // Re-examine idx: it now holds the row that was above.
                continue;
            }
            y -= 1;
        }
        cleared
    }
}

/// Quarter turn clockwise: `out[i][j] = shape[rows - 1 - j][i]`.
pub fn rotate_cw(shape: &Shape) -> Shape {
    let rows = shape.len();
    let cols = shape.first().map_or(0, Vec::len);
    (0..cols)
        .map(|i| (0..rows).map(|j| shape[rows - 1 - j][i]).collect())
        .collect()
}

/// Horizontal probe order: 0, -1, +1, -2, +2, ... up to `bound`.
fn kick_offsets(bound: i32) -> impl Iterator<Item = i32> {
    std::iter::once(0).chain((1..=bound).flat_map(|m| [-m, m]))
}

/// Rotate clockwise with a horizontal offset search. Returns the rotated shape
/// and adjusted position, or `None` when every probe collides.
pub fn rotate(piece: &Piece, pos: Position, board: &Board) -> Option<(Shape, Position)> {
    let rotated = rotate_cw(&piece.shape);
    let bound = rotated.first().map_or(0, Vec::len) as i32;
    kick_offsets(bound)
        .find(|&dx| !board.collides(&rotated, pos, Position::new(dx, 0)))
        .map(|dx| (rotated, Position::new(pos.x + dx, pos.y)))
}
