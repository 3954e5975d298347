//! Maze representation.

use crate::error::{Landmark, MazeError, MazeResult};
use anyhow::{Context, Result};
use std::{fmt, fs, path::Path};

/// Grid coordinate: `x` is the column and `y` the row, both growing away from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The adjacent position one step towards `dir`.
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Whether `other` is one orthogonal step away.
    #[cfg(test)]
    pub fn is_adjacent(self, other: Position) -> bool {
        (self.x - other.x).abs() + (self.y - other.y).abs() == 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Unit movement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Quarter turn to the walker's left.
    pub fn rotate_left(self) -> Self {
        match self {
            Direction::Up => Direction::Left,
            Direction::Left => Direction::Down,
            Direction::Down => Direction::Right,
            Direction::Right => Direction::Up,
        }
    }

    /// Quarter turn to the walker's right.
    pub fn rotate_right(self) -> Self {
        match self {
            Direction::Up => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Wall,
    Open,
    Start,
    Finish,
}

impl Cell {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '#' => Some(Cell::Wall),
            '.' | ' ' => Some(Cell::Open),
            'S' => Some(Cell::Start),
            'F' => Some(Cell::Finish),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Cell::Wall => '#',
            Cell::Open => ' ',
            Cell::Start => 'S',
            Cell::Finish => 'F',
        }
    }
}

/// Immutable rectangular maze.
///
/// Cells are stored row-major. All queries are pure; a grid is shared
/// read-only by every agent for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    n_rows: usize,
    n_cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Build a grid from an already validated cell matrix.
    ///
    /// Only the shape is checked here; landmark uniqueness is verified by
    /// [`Grid::find_start`] and [`Grid::find_finish`].
    pub fn new(rows: Vec<Vec<Cell>>) -> MazeResult<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        if n_rows == 0 || n_cols == 0 {
            return Err(MazeError::EmptyMaze);
        }
        for (i_row, row) in rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(MazeError::RaggedRow {
                    line: i_row + 1,
                    len: row.len(),
                    expected: n_cols,
                });
            }
        }
        let cells = rows.into_iter().flatten().collect();
        Ok(Self {
            n_rows,
            n_cols,
            cells,
        })
    }

    /// Parse the textual maze format.
    ///
    /// Trailing whitespace is trimmed from every line and trailing blank
    /// lines are ignored. Line and column numbers in errors are 1-based.
    pub fn parse(text: &str) -> MazeResult<Self> {
        let mut lines: Vec<&str> = text.lines().map(str::trim_end).collect();
        while lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        let expected = lines.first().map_or(0, |line| line.chars().count());
        if expected == 0 {
            return Err(MazeError::EmptyMaze);
        }

        let mut rows = Vec::with_capacity(lines.len());
        for (i_line, line) in lines.iter().enumerate() {
            let len = line.chars().count();
            if len != expected {
                return Err(MazeError::RaggedRow {
                    line: i_line + 1,
                    len,
                    expected,
                });
            }
            let row = line
                .chars()
                .enumerate()
                .map(|(i_col, symbol)| {
                    Cell::from_symbol(symbol).ok_or(MazeError::UnknownSymbol {
                        line: i_line + 1,
                        column: i_col + 1,
                        symbol,
                    })
                })
                .collect::<MazeResult<Vec<_>>>()?;
            rows.push(row);
        }

        let grid = Self::new(rows)?;
        grid.find_start()?;
        grid.find_finish()?;
        Ok(grid)
    }

    /// Read and parse a maze file.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let text = fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        let grid = Self::parse(&text).with_context(|| format!("failed to parse {file:?}"))?;
        Ok(grid)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn is_in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.n_cols && (pos.y as usize) < self.n_rows
    }

    /// In bounds and not a wall.
    pub fn is_walkable(&self, pos: Position) -> bool {
        self.at(pos).is_some_and(|cell| cell != Cell::Wall)
    }

    /// Cell at `pos`, or `None` when out of bounds.
    pub fn at(&self, pos: Position) -> Option<Cell> {
        if !self.is_in_bounds(pos) {
            return None;
        }
        Some(self.cells[pos.y as usize * self.n_cols + pos.x as usize])
    }

    pub fn find_start(&self) -> MazeResult<Position> {
        self.find_unique(Cell::Start, Landmark::Start)
    }

    pub fn find_finish(&self) -> MazeResult<Position> {
        self.find_unique(Cell::Finish, Landmark::Finish)
    }

    /// Every non-wall position, row-major.
    pub fn open_cells(&self) -> Vec<Position> {
        self.positions()
            .filter(|&pos| self.is_walkable(pos))
            .collect()
    }

    fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.n_rows).flat_map(move |y| {
            (0..self.n_cols).map(move |x| Position::new(x as i32, y as i32))
        })
    }

    fn find_unique(&self, target: Cell, landmark: Landmark) -> MazeResult<Position> {
        let mut found = self.positions().filter(|&pos| self.at(pos) == Some(target));
        let pos = found.next().ok_or(MazeError::MissingLandmark(landmark))?;
        if found.next().is_some() {
            return Err(MazeError::DuplicateLandmark(landmark));
        }
        Ok(pos)
    }
}
