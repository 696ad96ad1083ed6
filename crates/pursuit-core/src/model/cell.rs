use super::direction::Direction;
use core::fmt;
use serde::{Deserialize, Serialize};

/// A board coordinate. `x` grows east, `y` grows north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Sentinel cell holding a captured opponent.
    ///
    /// Opponent indices start at 1, so the sentinel always has a negative `y` and
    /// can never coincide with a board cell.
    pub const fn jail(opponent: usize) -> Self {
        Self {
            x: -(opponent as i32),
            y: -1,
        }
    }

    pub const fn is_jail(self) -> bool {
        self.y < 0
    }

    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.vector();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub const fn manhattan(self, other: Cell) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_jail() {
            write!(f, "jail#{}", -self.x)
        } else {
            write!(f, "({}, {})", self.x, self.y)
        }
    }
}

pub fn manhattan(a: Cell, b: Cell) -> u32 {
    a.manhattan(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_is_symmetric() {
        let a = Cell::new(1, 4);
        let b = Cell::new(5, 2);
        assert_eq!(manhattan(a, b), 6);
        assert_eq!(manhattan(b, a), 6);
    }

    #[test]
    fn jail_cells_are_distinct_per_opponent() {
        assert_ne!(Cell::jail(1), Cell::jail(2));
        assert!(Cell::jail(1).is_jail());
        assert!(!Cell::new(0, 0).is_jail());
    }

    #[test]
    fn step_follows_direction_vector() {
        let origin = Cell::new(2, 2);
        assert_eq!(origin.step(Direction::North), Cell::new(2, 3));
        assert_eq!(origin.step(Direction::West), Cell::new(1, 2));
        assert_eq!(origin.step(Direction::Stop), origin);
    }
}
