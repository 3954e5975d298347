//! Movement strategies.
//!
//! Each agent owns exactly one [`Strategy`] value; its private state (facing
//! direction, unvisited pool, route cursor) is never shared between agents.

use crate::error::MazeResult;
use crate::grid::{Direction, Grid, Position};
use crate::path::find_route;
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Algorithm an agent is spawned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentKind {
    LeftHand,
    RightHand,
    Teleport,
    Pathfinder,
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentKind::LeftHand => "left-hand",
            AgentKind::RightHand => "right-hand",
            AgentKind::Teleport => "teleport",
            AgentKind::Pathfinder => "pathfinder",
        };
        write!(f, "{name}")
    }
}

/// Wall a wall follower keeps its hand on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    fn toward(self, dir: Direction) -> Direction {
        match self {
            Side::Left => dir.rotate_left(),
            Side::Right => dir.rotate_right(),
        }
    }

    fn away(self, dir: Direction) -> Direction {
        match self {
            Side::Left => dir.rotate_right(),
            Side::Right => dir.rotate_left(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WallFollower {
    side: Side,
    facing: Direction,
}

impl WallFollower {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            facing: Direction::Down,
        }
    }

    #[cfg(test)]
    pub fn facing(&self) -> Direction {
        self.facing
    }

    fn next_position(&mut self, current: Position, grid: &Grid) -> Position {
        let toward = self.side.toward(self.facing);
        if grid.is_walkable(current.step(toward)) {
            self.facing = toward;
        } else if !grid.is_walkable(current.step(self.facing)) {
            self.facing = self.side.away(self.facing);
        }

        let next = current.step(self.facing);
        if grid.is_walkable(next) { next } else { current }
    }
}

/// Jumps to a uniformly drawn open cell, each cell drawn at most once.
#[derive(Debug, Clone)]
pub struct Teleporter {
    unvisited: Vec<Position>,
    last: Option<Position>,
    rng: ChaCha12Rng,
}

impl Teleporter {
    pub fn new(grid: &Grid, rng: ChaCha12Rng) -> Self {
        Self {
            unvisited: grid.open_cells(),
            last: None,
            rng,
        }
    }

    #[cfg(test)]
    pub fn n_unvisited(&self) -> usize {
        self.unvisited.len()
    }

    fn next_position(&mut self, current: Position) -> Position {
        if self.unvisited.is_empty() {
            return current;
        }

        // The previous destination is only drawn again when nothing else is left.
        let fresh: Vec<usize> = (0..self.unvisited.len())
            .filter(|&i| Some(self.unvisited[i]) != self.last)
            .collect();
        let i_drawn = fresh.choose(&mut self.rng).copied().unwrap_or(0);

        let drawn = self.unvisited.swap_remove(i_drawn);
        self.last = Some(drawn);
        drawn
    }
}

/// Replays a precomputed shortest route one cell per call.
#[derive(Debug, Clone)]
pub struct RouteFollower {
    route: Vec<Position>,
    cursor: usize,
}

impl RouteFollower {
    pub fn new(grid: &Grid, start: Position, finish: Position) -> MazeResult<Self> {
        let route = find_route(grid, start, finish)?;
        Ok(Self { route, cursor: 0 })
    }

    pub fn route(&self) -> &[Position] {
        &self.route
    }

    fn next_position(&mut self, current: Position) -> Position {
        match self.route.get(self.cursor + 1) {
            Some(&next) => {
                self.cursor += 1;
                next
            }
            None => current,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Strategy {
    WallFollow(WallFollower),
    RandomTeleport(Teleporter),
    PathFollow(RouteFollower),
}

impl Strategy {
    /// Build the strategy for `kind`.
    ///
    /// Only [`AgentKind::Pathfinder`] can fail, when `finish` is unreachable.
    /// `rng` is consumed by the teleporter and dropped otherwise.
    pub fn new(
        kind: AgentKind,
        grid: &Grid,
        start: Position,
        finish: Position,
        rng: ChaCha12Rng,
    ) -> MazeResult<Self> {
        let strategy = match kind {
            AgentKind::LeftHand => Strategy::WallFollow(WallFollower::new(Side::Left)),
            AgentKind::RightHand => Strategy::WallFollow(WallFollower::new(Side::Right)),
            AgentKind::Teleport => Strategy::RandomTeleport(Teleporter::new(grid, rng)),
            AgentKind::Pathfinder => {
                Strategy::PathFollow(RouteFollower::new(grid, start, finish)?)
            }
        };
        Ok(strategy)
    }

    /// Propose the next position. Never mutates the grid.
    pub fn next_position(&mut self, current: Position, grid: &Grid) -> Position {
        match self {
            Strategy::WallFollow(follower) => follower.next_position(current, grid),
            Strategy::RandomTeleport(teleporter) => teleporter.next_position(current),
            Strategy::PathFollow(follower) => follower.next_position(current),
        }
    }

    /// Whether the strategy can never propose another move.
    pub fn is_exhausted(&self) -> bool {
        match self {
            Strategy::RandomTeleport(teleporter) => teleporter.unvisited.is_empty(),
            _ => false,
        }
    }
}
