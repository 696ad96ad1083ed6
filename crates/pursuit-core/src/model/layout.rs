use super::cell::Cell;
use super::direction::Direction;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Static board description: walls, food and agent start cells.
///
/// Parsed from the ASCII layout format: `%` wall, `.` food, `P` controlled agent,
/// `G` opponent, space open floor. The first text row is the top of the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    width: i32,
    height: i32,
    walls: Vec<bool>,
    food: BTreeSet<Cell>,
    agent_start: Cell,
    opponent_starts: Vec<Cell>,
}

impl Layout {
    pub fn parse(text: &str) -> Result<Self, LayoutError> {
        let rows: Vec<&str> = text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty())
            .collect();
        if rows.is_empty() {
            return Err(LayoutError::Empty);
        }

        let width = rows[0].chars().count();
        let height = rows.len();
        let mut walls = vec![false; width * height];
        let mut food = BTreeSet::new();
        let mut agent_start = None;
        let mut opponent_starts = Vec::new();

        for (row, line) in rows.iter().enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(LayoutError::Ragged {
                    row,
                    expected: width,
                    found,
                });
            }
            let y = (height - 1 - row) as i32;
            for (col, ch) in line.chars().enumerate() {
                let cell = Cell::new(col as i32, y);
                match ch {
                    '%' => walls[col + (y as usize) * width] = true,
                    '.' => {
                        food.insert(cell);
                    }
                    'P' => {
                        if agent_start.replace(cell).is_some() {
                            return Err(LayoutError::DuplicateAgent { row, col });
                        }
                    }
                    'G' => opponent_starts.push(cell),
                    ' ' | 'o' => {}
                    other => return Err(LayoutError::UnknownTile { ch: other, row, col }),
                }
            }
        }

        let agent_start = agent_start.ok_or(LayoutError::MissingAgent)?;
        opponent_starts.sort();

        Ok(Self {
            width: width as i32,
            height: height as i32,
            walls,
            food,
            agent_start,
            opponent_starts,
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| LayoutError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    /// Out-of-bounds cells count as walls.
    pub fn is_wall(&self, cell: Cell) -> bool {
        if !self.in_bounds(cell) {
            return true;
        }
        self.walls[(cell.x + cell.y * self.width) as usize]
    }

    pub fn food(&self) -> &BTreeSet<Cell> {
        &self.food
    }

    pub fn agent_start(&self) -> Cell {
        self.agent_start
    }

    pub fn opponent_starts(&self) -> &[Cell] {
        &self.opponent_starts
    }

    pub fn num_opponents(&self) -> usize {
        self.opponent_starts.len()
    }

    /// Every non-wall cell, ordered column-major (by `x`, then `y`).
    pub fn open_cells(&self) -> Vec<Cell> {
        let mut cells = Vec::new();
        for x in 0..self.width {
            for y in 0..self.height {
                let cell = Cell::new(x, y);
                if !self.is_wall(cell) {
                    cells.push(cell);
                }
            }
        }
        cells
    }

    /// Cells reachable in one move from `cell`, including staying put.
    pub fn legal_neighbors(&self, cell: Cell) -> Vec<Cell> {
        Direction::ALL
            .iter()
            .map(|dir| cell.step(*dir))
            .filter(|next| !self.is_wall(*next))
            .collect()
    }

    /// Non-stop directions that lead into open cells.
    pub fn open_moves(&self, cell: Cell) -> Vec<Direction> {
        Direction::MOVES
            .iter()
            .copied()
            .filter(|dir| !self.is_wall(cell.step(*dir)))
            .collect()
    }
}

impl FromStr for Layout {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout text is empty")]
    Empty,
    #[error("row {row} has {found} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown tile {ch:?} at row {row}, column {col}")]
    UnknownTile { ch: char, row: usize, col: usize },
    #[error("second controlled agent start at row {row}, column {col}")]
    DuplicateAgent { row: usize, col: usize },
    #[error("layout has no controlled agent start ('P')")]
    MissingAgent,
    #[error("failed to read layout {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
