use crate::grid::Position;
use crate::strategy::{AgentKind, Strategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Walking,
    Arrived,
    /// The strategy ran out of moves away from the finish.
    Stalled,
    /// No strategy could be built, e.g. a pathfinder on a maze without a route.
    Failed,
}

/// Maze walker of the simulation.
///
/// Owns its strategy exclusively. Once the agent stands on the finish it is
/// arrived for good and is no longer moved. A failed agent has no strategy and
/// stays on the start.
#[derive(Debug)]
pub struct Agent {
    name: String,
    symbol: char,
    kind: AgentKind,
    strategy: Option<Strategy>,
    position: Position,
    finish: Position,
    status: AgentStatus,
}

impl Agent {
    pub fn new(
        name: String,
        symbol: char,
        kind: AgentKind,
        strategy: Strategy,
        start: Position,
        finish: Position,
    ) -> Self {
        let status = if start == finish {
            AgentStatus::Arrived
        } else {
            AgentStatus::Walking
        };
        Self {
            name,
            symbol,
            kind,
            strategy: Some(strategy),
            position: start,
            finish,
            status,
        }
    }

    pub fn failed(
        name: String,
        symbol: char,
        kind: AgentKind,
        start: Position,
        finish: Position,
    ) -> Self {
        Self {
            name,
            symbol,
            kind,
            strategy: None,
            position: start,
            finish,
            status: AgentStatus::Failed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> char {
        self.symbol
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub fn has_arrived(&self) -> bool {
        self.status == AgentStatus::Arrived
    }

    pub fn is_walking(&self) -> bool {
        self.status == AgentStatus::Walking
    }

    pub(crate) fn strategy_mut(&mut self) -> Option<&mut Strategy> {
        self.strategy.as_mut()
    }

    /// Commit an already validated position and refresh the status.
    pub(crate) fn commit(&mut self, pos: Position) {
        self.position = pos;
        if pos == self.finish {
            self.status = AgentStatus::Arrived;
        } else if self.strategy.as_ref().is_some_and(Strategy::is_exhausted) {
            self.status = AgentStatus::Stalled;
        }
    }
}
