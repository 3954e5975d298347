use crate::config::Config;
use crate::grid::Grid;
use crate::path::find_route;
use crate::render::{ConsoleRenderer, LogObserver};
use crate::simulation::{SimStatus, Simulation};
use crate::strategy::AgentKind;
use anyhow::{Context, Result, bail};
use std::path::Path;

/// Headless runs log a full status summary every this many ticks.
const LOG_EVERY: u64 = 50;

pub struct Manager {
    grid: Grid,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(maze_file: P, config_file: Option<P>) -> Result<Self> {
        let grid = Grid::from_file(maze_file).context("failed to load maze")?;

        let cfg = match config_file {
            Some(file) => Config::from_file(file).context("failed to construct cfg")?,
            None => Config::default(),
        };
        log::info!("{cfg:#?}");

        Ok(Self { grid, cfg })
    }

    pub fn run_simulation(&self, headless: bool) -> Result<()> {
        let seed = self.cfg.simulation.seed.unwrap_or_else(rand::random);
        log::info!("using seed {seed}");

        let mut sim = Simulation::new(
            self.grid.clone(),
            self.cfg.simulation.clone(),
            self.cfg.agents.clone(),
            seed,
        )
        .context("failed to set up simulation")?;

        let status = if headless {
            sim.run(&mut LogObserver::new(LOG_EVERY))
        } else {
            sim.run(&mut ConsoleRenderer::new())
        };

        if status != SimStatus::Completed {
            bail!("simulation halted after {} ticks", sim.tick());
        }

        Ok(())
    }

    pub fn print_route(&self) -> Result<()> {
        let start = self.grid.find_start()?;
        let finish = self.grid.find_finish()?;
        let route = find_route(&self.grid, start, finish).context("failed to find route")?;

        println!("route length: {}", route.len());
        let cells: Vec<String> = route.iter().map(ToString::to_string).collect();
        println!("{}", cells.join(" "));

        Ok(())
    }

    pub fn check(&self) -> Result<()> {
        let start = self.grid.find_start()?;
        let finish = self.grid.find_finish()?;
        log::info!(
            "maze {}x{}, start {start}, finish {finish}, {} open cells",
            self.grid.n_cols(),
            self.grid.n_rows(),
            self.grid.open_cells().len()
        );

        match find_route(&self.grid, start, finish) {
            Ok(route) => log::info!("shortest route has {} cells", route.len()),
            Err(error) => {
                log::warn!("{error}");
                for spawn in &self.cfg.agents {
                    if spawn.kind == AgentKind::Pathfinder {
                        log::warn!("{} ({}) will fail to spawn", spawn.name, spawn.kind);
                    }
                }
            }
        }

        Ok(())
    }
}
