//! Presentation sinks.
//!
//! The console renderer is the only place that touches the terminal.

use crate::agent::{Agent, AgentStatus};
use crate::grid::{Grid, Position};
use crate::simulation::{Observer, SimStatus};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use std::io::{self, Stdout, Write};

/// [`Observer`] that only writes log lines; used for headless runs.
#[derive(Default)]
pub struct LogObserver {
    every: u64,
}

impl LogObserver {
    /// Log the per-agent summary every `every` ticks (0 disables it).
    pub fn new(every: u64) -> Self {
        Self { every }
    }
}

impl Observer for LogObserver {
    fn on_start(&mut self, grid: &Grid) {
        log::info!("maze has {} rows and {} cols", grid.n_rows(), grid.n_cols());
    }

    fn on_move(&mut self, _id: usize, from: Position, agent: &Agent) {
        log::debug!("{} moved {from} -> {}", agent.name(), agent.position());
    }

    fn on_tick_end(&mut self, tick: u64, agents: &[Agent]) {
        if self.every == 0 || tick % self.every != 0 {
            return;
        }
        for agent in agents {
            log::info!("tick {tick}: {}", status_line(agent));
        }
    }

    fn on_finish(&mut self, tick: u64, status: SimStatus, agents: &[Agent]) {
        for agent in agents {
            log::info!("final: {}", status_line(agent));
        }
        log::info!("finished as {status:?} after {tick} ticks");
    }
}

/// Draws the maze once and repaints only cells that changed.
pub struct ConsoleRenderer {
    out: Stdout,
    grid: Option<Grid>,
    positions: Vec<(Position, char)>,
}

const COLORS: [Color; 6] = [
    Color::Yellow,
    Color::Cyan,
    Color::Magenta,
    Color::Green,
    Color::Blue,
    Color::Red,
];

impl ConsoleRenderer {
    pub fn new() -> Self {
        Self {
            out: io::stdout(),
            grid: None,
            positions: Vec::new(),
        }
    }

    fn status_row(&self) -> u16 {
        self.grid.as_ref().map_or(0, |grid| grid.n_rows() as u16 + 1)
    }

    fn draw_maze(&mut self, grid: &Grid) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All), Hide, MoveTo(0, 0))?;
        for y in 0..grid.n_rows() {
            let row: String = (0..grid.n_cols())
                .map(|x| cell_symbol(grid, Position::new(x as i32, y as i32)))
                .collect();
            queue!(self.out, MoveTo(0, y as u16), Print(row))?;
        }
        self.out.flush()
    }

    /// Repaint `pos` with the topmost agent standing on it, or the maze cell.
    fn repaint(&mut self, pos: Position) -> io::Result<()> {
        let Some(grid) = &self.grid else {
            return Ok(());
        };
        let occupant = self
            .positions
            .iter()
            .enumerate()
            .rev()
            .find(|(_, (agent_pos, _))| *agent_pos == pos);
        let (x, y) = (pos.x as u16, pos.y as u16);
        match occupant {
            Some((id, &(_, symbol))) => queue!(
                self.out,
                MoveTo(x, y),
                SetForegroundColor(COLORS[id % COLORS.len()]),
                Print(symbol),
                ResetColor
            ),
            None => queue!(self.out, MoveTo(x, y), Print(cell_symbol(grid, pos))),
        }
    }

    fn draw_status(&mut self, header: &str, agents: &[Agent]) -> io::Result<()> {
        let row = self.status_row();
        queue!(
            self.out,
            MoveTo(0, row),
            Clear(ClearType::CurrentLine),
            Print(header)
        )?;
        for (id, agent) in agents.iter().enumerate() {
            queue!(
                self.out,
                MoveTo(0, row + 1 + id as u16),
                Clear(ClearType::CurrentLine),
                SetForegroundColor(COLORS[id % COLORS.len()]),
                Print(status_line(agent)),
                ResetColor
            )?;
        }
        self.out.flush()
    }

    fn report(result: io::Result<()>) {
        if let Err(error) = result {
            log::error!("failed to draw: {error}");
        }
    }
}

impl Default for ConsoleRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for ConsoleRenderer {
    fn on_start(&mut self, grid: &Grid) {
        if let Ok((cols, rows)) = terminal::size() {
            if (cols as usize) < grid.n_cols() || (rows as usize) < grid.n_rows() + 2 {
                log::warn!(
                    "terminal is {cols}x{rows}, maze needs {}x{}",
                    grid.n_cols(),
                    grid.n_rows() + 2
                );
            }
        }
        Self::report(self.draw_maze(grid));
        self.grid = Some(grid.clone());
    }

    fn on_spawn(&mut self, id: usize, agent: &Agent) {
        if self.positions.len() <= id {
            self.positions.resize(id + 1, (agent.position(), agent.symbol()));
        }
        self.positions[id] = (agent.position(), agent.symbol());
        Self::report(self.repaint(agent.position()));
    }

    fn on_move(&mut self, id: usize, from: Position, agent: &Agent) {
        if let Some(entry) = self.positions.get_mut(id) {
            entry.0 = agent.position();
        }
        let result = self
            .repaint(from)
            .and_then(|_| self.repaint(agent.position()));
        Self::report(result);
    }

    fn on_tick_end(&mut self, tick: u64, agents: &[Agent]) {
        Self::report(self.draw_status(&format!("Tick {tick}"), agents));
    }

    fn on_finish(&mut self, tick: u64, status: SimStatus, agents: &[Agent]) {
        let header = match status {
            SimStatus::Completed => format!("All dwarfs arrived after {tick} ticks"),
            _ => format!("Simulation halted after {tick} ticks"),
        };
        let result = self.draw_status(&header, agents).and_then(|_| {
            let row = self.status_row() + agents.len() as u16 + 1;
            queue!(self.out, MoveTo(0, row), Show, Print("\n"))?;
            self.out.flush()
        });
        Self::report(result);
    }
}

fn cell_symbol(grid: &Grid, pos: Position) -> char {
    grid.at(pos).map_or(' ', |cell| cell.symbol())
}

/// One-line summary of an agent, e.g. `L Lefty (left-hand): (3, 4)`.
pub fn status_line(agent: &Agent) -> String {
    let state = match agent.status() {
        AgentStatus::Walking => agent.position().to_string(),
        AgentStatus::Arrived => "arrived".to_string(),
        AgentStatus::Stalled => format!("stalled at {}", agent.position()),
        AgentStatus::Failed => "failed to start".to_string(),
    };
    format!(
        "{} {} ({}): {}",
        agent.symbol(),
        agent.name(),
        agent.kind(),
        state
    )
}
