//! Breadth-first route search.

use crate::error::{MazeError, MazeResult};
use crate::grid::{Direction, Grid, Position};
use std::collections::{HashMap, VecDeque};

/// Neighbour expansion order; fixes tie-breaking between equally short routes.
const SEARCH_ORDER: [Direction; 4] = [
    Direction::Up,
    Direction::Left,
    Direction::Down,
    Direction::Right,
];

/// Find the shortest route from `start` to `finish`, both included.
///
/// Cells are marked visited when enqueued, so each is expanded once and the
/// first route to reach `finish` is the shortest one in cell count.
pub fn find_route(grid: &Grid, start: Position, finish: Position) -> MazeResult<Vec<Position>> {
    let mut parent: HashMap<Position, Option<Position>> = HashMap::new();
    let mut queue = VecDeque::new();

    if grid.is_walkable(start) {
        parent.insert(start, None);
        queue.push_back(start);
    }

    while let Some(pos) = queue.pop_front() {
        if pos == finish {
            return Ok(unwind(&parent, pos));
        }
        for dir in SEARCH_ORDER {
            let next = pos.step(dir);
            if grid.is_walkable(next) && !parent.contains_key(&next) {
                parent.insert(next, Some(pos));
                queue.push_back(next);
            }
        }
    }

    Err(MazeError::NoRoute { start, finish })
}

fn unwind(parent: &HashMap<Position, Option<Position>>, last: Position) -> Vec<Position> {
    let mut route = vec![last];
    let mut cursor = last;
    while let Some(&Some(prev)) = parent.get(&cursor) {
        route.push(prev);
        cursor = prev;
    }
    route.reverse();
    route
}
