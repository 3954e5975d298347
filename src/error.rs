use crate::grid::Position;
use std::fmt;
use thiserror::Error;

/// One of the two unique cells a maze must contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landmark {
    Start,
    Finish,
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Landmark::Start => write!(f, "start"),
            Landmark::Finish => write!(f, "finish"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MazeError {
    #[error("maze has no rows")]
    EmptyMaze,

    #[error("line {line} has length {len}, but {expected} is expected")]
    RaggedRow {
        line: usize,
        len: usize,
        expected: usize,
    },

    #[error("line {line}, column {column}: unknown symbol {symbol:?}")]
    UnknownSymbol {
        line: usize,
        column: usize,
        symbol: char,
    },

    #[error("maze has no {0} cell")]
    MissingLandmark(Landmark),

    #[error("maze has more than one {0} cell")]
    DuplicateLandmark(Landmark),

    #[error("no route from {start} to {finish}")]
    NoRoute { start: Position, finish: Position },
}

pub type MazeResult<T> = Result<T, MazeError>;
