use std::ops::Sub;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Number of discrete moves an entity understands.
pub const ACTION_COUNT: usize = 9;

/// `(dx, dy)` for each action index: four diagonals, four axis moves, stay.
pub const ACTION_DELTAS: [(i32, i32); ACTION_COUNT] = [
    (1, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (0, 0),
];

/// An actor positioned on a square grid of side `size`.
///
/// Positions are clamped into `[0, size - 1]` on every move, never wrapped.
/// Equality compares positions only.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GridEntity {
    x: usize,
    y: usize,
    size: usize,
}

impl GridEntity {
    /// Place an entity on a uniformly random cell.
    pub fn random<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Self {
        GridEntity {
            x: rng.gen_range(0..size),
            y: rng.gen_range(0..size),
            size,
        }
    }

    /// Place an entity on an explicit cell.
    pub fn at(x: usize, y: usize, size: usize) -> Result<Self> {
        if x >= size || y >= size {
            return Err(GridError::InvalidPlacement(format!(
                "({}, {}) lies outside a {}x{} grid",
                x, y, size, size
            )));
        }
        Ok(GridEntity { x, y, size })
    }

    pub fn x(&self) -> usize {
        self.x
    }

    pub fn y(&self) -> usize {
        self.y
    }

    pub fn position(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Shift by `(dx, dy)` and clamp into the grid.
    ///
    /// A `None` component is replaced by a random step in `{-1, 0, 1}`,
    /// drawn independently per axis.
    pub fn move_by<R: Rng + ?Sized>(&mut self, dx: Option<i32>, dy: Option<i32>, rng: &mut R) {
        let dx = dx.unwrap_or_else(|| rng.gen_range(-1..=1));
        let dy = dy.unwrap_or_else(|| rng.gen_range(-1..=1));
        self.x = clamp_axis(self.x, dx, self.size);
        self.y = clamp_axis(self.y, dy, self.size);
    }

    /// Apply one of the [`ACTION_COUNT`] discrete moves.
    pub fn apply_action(&mut self, choice: usize) -> Result<()> {
        let (dx, dy) = *ACTION_DELTAS.get(choice).ok_or(GridError::InvalidAction {
            action: choice,
            max_actions: ACTION_COUNT,
        })?;
        self.x = clamp_axis(self.x, dx, self.size);
        self.y = clamp_axis(self.y, dy, self.size);
        Ok(())
    }

    /// Component-wise `self - other`.
    pub fn offset_from(&self, other: &GridEntity) -> (i32, i32) {
        (
            self.x as i32 - other.x as i32,
            self.y as i32 - other.y as i32,
        )
    }
}

fn clamp_axis(position: usize, delta: i32, size: usize) -> usize {
    let max = size.saturating_sub(1) as i64;
    (position as i64 + delta as i64).clamp(0, max) as usize
}

impl PartialEq for GridEntity {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl Eq for GridEntity {}

impl Sub for GridEntity {
    type Output = (i32, i32);

    fn sub(self, other: GridEntity) -> (i32, i32) {
        self.offset_from(&other)
    }
}
