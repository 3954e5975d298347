//! Tick-driven simulation loop.

use crate::agent::{Agent, AgentStatus};
use crate::config::{SimulationConfig, SpawnConfig};
use crate::error::{MazeError, MazeResult};
use crate::grid::{Grid, Position};
use crate::strategy::Strategy;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::{thread, time::Duration};

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimStatus {
    NotStarted,
    Running,
    /// Every scheduled agent spawned and arrived.
    Completed,
    /// Stopped with agents that will never arrive (stalled or failed), or by
    /// the tick bound.
    Halted,
}

/// Presentation sink for simulation events.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about. Agents are identified by their spawn
/// index. Sinks are never consulted for simulation decisions.
pub trait Observer {
    /// Called once before the first tick.
    fn on_start(&mut self, _grid: &Grid) {}

    fn on_spawn(&mut self, _id: usize, _agent: &Agent) {}

    /// Called right after `on_spawn` when the agent's strategy could not be
    /// built. The agent stays on the start for the rest of the run.
    fn on_fail(&mut self, _id: usize, _agent: &Agent, _error: &MazeError) {}

    /// Called for every committed position change.
    fn on_move(&mut self, _id: usize, _from: Position, _agent: &Agent) {}

    /// Called when a proposed move was discarded.
    fn on_reject(&mut self, _id: usize, _proposed: Position, _agent: &Agent) {}

    fn on_stall(&mut self, _id: usize, _agent: &Agent) {}

    /// Called after every agent had its move in tick `tick`.
    fn on_tick_end(&mut self, _tick: u64, _agents: &[Agent]) {}

    /// Called once when the run is over.
    fn on_finish(&mut self, _tick: u64, _status: SimStatus, _agents: &[Agent]) {}
}

/// An [`Observer`] that does nothing.
pub struct NoopObserver;

impl Observer for NoopObserver {}

pub struct Simulation {
    grid: Grid,
    start: Position,
    finish: Position,
    cfg: SimulationConfig,
    schedule: Vec<SpawnConfig>,
    seed: u64,
    agents: Vec<Agent>,
    i_next_spawn: usize,
    tick: u64,
    status: SimStatus,
}

impl Simulation {
    /// Set up a simulation over `grid`.
    ///
    /// Only the landmarks are verified here. Strategies are built as agents
    /// spawn, so a pathfinder without a route fails alone.
    pub fn new(
        grid: Grid,
        cfg: SimulationConfig,
        schedule: Vec<SpawnConfig>,
        seed: u64,
    ) -> MazeResult<Self> {
        let start = grid.find_start()?;
        let finish = grid.find_finish()?;

        Ok(Self {
            grid,
            start,
            finish,
            cfg,
            schedule,
            seed,
            agents: Vec::new(),
            i_next_spawn: 0,
            tick: 0,
            status: SimStatus::NotStarted,
        })
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn status(&self) -> SimStatus {
        self.status
    }

    /// Number of ticks performed so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated time elapsed since the start.
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.cfg.tick_ms.saturating_mul(self.tick))
    }

    /// Run until every agent arrived, no agent can move anymore, or the tick bound is hit.
    pub fn run<O: Observer>(&mut self, observer: &mut O) -> SimStatus {
        while self.step(observer) == SimStatus::Running {
            if self.cfg.pace {
                thread::sleep(self.cfg.tick_duration());
            }
        }
        self.status
    }

    /// Perform a single tick.
    ///
    /// Returns the status after the tick; calling it on a finished simulation
    /// does nothing.
    pub fn step<O: Observer>(&mut self, observer: &mut O) -> SimStatus {
        match self.status {
            SimStatus::Completed | SimStatus::Halted => return self.status,
            SimStatus::NotStarted => {
                observer.on_start(&self.grid);
                self.status = SimStatus::Running;
            }
            SimStatus::Running => {}
        }

        // At most one agent is admitted per tick.
        if self.i_next_spawn < self.schedule.len()
            && self.elapsed() >= self.schedule[self.i_next_spawn].delay()
        {
            self.spawn(observer);
        }

        for (id, agent) in self.agents.iter_mut().enumerate() {
            if !agent.is_walking() {
                continue;
            }
            let from = agent.position();
            let Some(strategy) = agent.strategy_mut() else {
                continue;
            };
            let mut next = strategy.next_position(from, &self.grid);
            if next != from && !self.grid.is_walkable(next) {
                log::warn!("{} proposed invalid move {from} -> {next}", agent.name());
                observer.on_reject(id, next, agent);
                next = from;
            }

            agent.commit(next);
            if next != from {
                observer.on_move(id, from, agent);
            }
            match agent.status() {
                AgentStatus::Arrived => {
                    log::info!("{} arrived after {} ticks", agent.name(), self.tick + 1);
                }
                AgentStatus::Stalled => {
                    log::warn!("{} stalled at {next}", agent.name());
                    observer.on_stall(id, agent);
                }
                AgentStatus::Walking | AgentStatus::Failed => {}
            }
        }

        observer.on_tick_end(self.tick, &self.agents);
        self.tick += 1;

        self.status = self.evaluate();
        if self.status != SimStatus::Running {
            log::info!("simulation {:?} after {} ticks", self.status, self.tick);
            observer.on_finish(self.tick, self.status, &self.agents);
        }

        self.status
    }

    fn evaluate(&self) -> SimStatus {
        let all_spawned = self.i_next_spawn == self.schedule.len();
        if all_spawned && self.agents.iter().all(Agent::has_arrived) {
            return SimStatus::Completed;
        }
        if all_spawned && !self.agents.iter().any(Agent::is_walking) {
            return SimStatus::Halted;
        }
        if self.cfg.max_ticks.is_some_and(|max_ticks| self.tick >= max_ticks) {
            return SimStatus::Halted;
        }
        SimStatus::Running
    }

    fn spawn<O: Observer>(&mut self, observer: &mut O) {
        let id = self.i_next_spawn;
        let spawn = &self.schedule[id];
        let (agent, failure) = match self.build_strategy(id) {
            Ok(strategy) => {
                if let Strategy::PathFollow(follower) = &strategy {
                    log::debug!("route of {} cells precomputed", follower.route().len());
                }
                let agent = Agent::new(
                    spawn.name.clone(),
                    spawn.symbol,
                    spawn.kind,
                    strategy,
                    self.start,
                    self.finish,
                );
                (agent, None)
            }
            Err(error) => {
                log::error!("{} ({}) cannot walk: {error}", spawn.name, spawn.kind);
                let agent = Agent::failed(
                    spawn.name.clone(),
                    spawn.symbol,
                    spawn.kind,
                    self.start,
                    self.finish,
                );
                (agent, Some(error))
            }
        };
        log::info!(
            "spawned {} ({}) at {} after {:?}",
            agent.name(),
            agent.kind(),
            self.start,
            self.elapsed()
        );

        self.agents.push(agent);
        self.i_next_spawn += 1;
        observer.on_spawn(id, &self.agents[id]);
        if let Some(error) = failure {
            observer.on_fail(id, &self.agents[id], &error);
        }
    }

    /// Fresh strategy for schedule entry `id`; each agent gets its own RNG stream.
    fn build_strategy(&self, id: usize) -> MazeResult<Strategy> {
        let seed = self.seed ^ (id as u64).wrapping_mul(MIXING_CONSTANT);
        let rng = ChaCha12Rng::seed_from_u64(seed);
        Strategy::new(
            self.schedule[id].kind,
            &self.grid,
            self.start,
            self.finish,
            rng,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::strategy::{AgentKind, Teleporter};

    const CORRIDOR: &str = "S...F\n#####\n#####\n#####\n#####";

    fn spawn(kind: AgentKind, symbol: char, delay_ms: u64) -> SpawnConfig {
        SpawnConfig {
            kind,
            name: format!("{kind}"),
            symbol,
            delay_ms,
        }
    }

    fn unpaced() -> SimulationConfig {
        SimulationConfig {
            pace: false,
            ..SimulationConfig::default()
        }
    }

    fn simulation(maze: &str, schedule: Vec<SpawnConfig>) -> Simulation {
        Simulation::new(Grid::parse(maze).unwrap(), unpaced(), schedule, 11).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        started: usize,
        spawns: Vec<(u64, usize)>,
        moves: Vec<(usize, Position, Position)>,
        rejects: usize,
        fails: Vec<usize>,
        stalls: usize,
        tick_ends: Vec<(u64, usize, usize)>,
        finished: Option<(u64, SimStatus)>,
        tick: u64,
    }

    impl Observer for Recorder {
        fn on_start(&mut self, _grid: &Grid) {
            self.started += 1;
        }

        fn on_spawn(&mut self, id: usize, _agent: &Agent) {
            self.spawns.push((self.tick, id));
        }

        fn on_move(&mut self, id: usize, from: Position, agent: &Agent) {
            self.moves.push((id, from, agent.position()));
        }

        fn on_reject(&mut self, _id: usize, _proposed: Position, _agent: &Agent) {
            self.rejects += 1;
        }

        fn on_fail(&mut self, id: usize, _agent: &Agent, error: &MazeError) {
            assert!(matches!(error, MazeError::NoRoute { .. }));
            self.fails.push(id);
        }

        fn on_stall(&mut self, _id: usize, _agent: &Agent) {
            self.stalls += 1;
        }

        fn on_tick_end(&mut self, tick: u64, agents: &[Agent]) {
            let n_arrived = agents.iter().filter(|agent| agent.has_arrived()).count();
            self.tick_ends.push((tick, agents.len(), n_arrived));
            self.tick = tick + 1;
        }

        fn on_finish(&mut self, tick: u64, status: SimStatus, _agents: &[Agent]) {
            self.finished = Some((tick, status));
        }
    }

    #[test]
    fn pathfinder_walks_the_corridor_in_four_ticks() {
        let mut sim = simulation(CORRIDOR, vec![spawn(AgentKind::Pathfinder, 'P', 0)]);
        let mut recorder = Recorder::default();
        assert_eq!(sim.status(), SimStatus::NotStarted);

        assert_eq!(sim.run(&mut recorder), SimStatus::Completed);
        assert_eq!(sim.tick(), 4);
        let trail: Vec<_> = recorder.moves.iter().map(|&(_, _, to)| to).collect();
        assert_eq!(
            trail,
            vec![
                Position::new(1, 0),
                Position::new(2, 0),
                Position::new(3, 0),
                Position::new(4, 0)
            ]
        );
        assert_eq!(recorder.started, 1);
        assert_eq!(recorder.finished, Some((4, SimStatus::Completed)));
        assert_eq!(recorder.rejects, 0);
    }

    #[test]
    fn wall_followers_walk_the_corridor_in_four_ticks() {
        for kind in [AgentKind::LeftHand, AgentKind::RightHand] {
            let mut sim = simulation(CORRIDOR, vec![spawn(kind, 'W', 0)]);
            assert_eq!(sim.run(&mut NoopObserver), SimStatus::Completed);
            assert_eq!(sim.tick(), 4, "{kind}");
            assert_eq!(sim.agents()[0].position(), Position::new(4, 0));
        }
    }

    #[test]
    fn pathfinder_needs_route_length_minus_one_ticks() {
        let maze = "S.#......\n\
                    #.#.####.\n\
                    #...#....\n\
                    ###.#.#.#\n\
                    #.....#F.";
        let grid = Grid::parse(maze).unwrap();
        let route = crate::path::find_route(
            &grid,
            grid.find_start().unwrap(),
            grid.find_finish().unwrap(),
        )
        .unwrap();
        let mut sim = simulation(maze, vec![spawn(AgentKind::Pathfinder, 'P', 0)]);
        sim.run(&mut NoopObserver);
        assert_eq!(sim.tick(), route.len() as u64 - 1);
    }

    #[test]
    fn arrived_agents_stop_moving() {
        let mut sim = simulation(
            CORRIDOR,
            vec![
                spawn(AgentKind::Pathfinder, 'P', 0),
                spawn(AgentKind::LeftHand, 'L', 1_000),
            ],
        );
        let mut recorder = Recorder::default();
        assert_eq!(sim.run(&mut recorder), SimStatus::Completed);

        let pathfinder_moves = recorder.moves.iter().filter(|&&(id, _, _)| id == 0).count();
        assert_eq!(pathfinder_moves, 4);
        assert!(sim.tick() > 10);
        assert!(sim.agents().iter().all(Agent::has_arrived));
    }

    #[test]
    fn unreachable_finish_fails_pathfinder_only() {
        let maze = "S.#...\n..#.F.\n..#...";
        let cfg = SimulationConfig {
            max_ticks: Some(200),
            ..unpaced()
        };
        let mut sim =
            Simulation::new(Grid::parse(maze).unwrap(), cfg, Config::default().agents, 1).unwrap();
        let mut recorder = Recorder::default();
        assert_eq!(sim.run(&mut recorder), SimStatus::Halted);
        assert_eq!(sim.tick(), 200);

        assert_eq!(recorder.spawns, vec![(0, 0), (50, 1), (100, 2), (150, 3)]);
        assert_eq!(recorder.fails, vec![3]);
        for id in 0..3 {
            assert!(recorder.moves.iter().any(|&(i_agt, _, _)| i_agt == id), "{id}");
        }
        assert!(recorder.moves.iter().all(|&(id, _, _)| id != 3));

        let statuses: Vec<_> = sim.agents().iter().map(Agent::status).collect();
        assert_eq!(
            statuses,
            vec![
                AgentStatus::Walking,
                AgentStatus::Walking,
                AgentStatus::Arrived,
                AgentStatus::Failed
            ]
        );
        assert_eq!(sim.agents()[3].position(), Position::new(0, 0));
    }

    #[test]
    fn pathfinder_alone_without_route_halts_at_once() {
        let mut sim = simulation("S#F", vec![spawn(AgentKind::Pathfinder, 'P', 0)]);
        let mut recorder = Recorder::default();
        assert_eq!(sim.run(&mut recorder), SimStatus::Halted);
        assert_eq!(sim.tick(), 1);
        assert_eq!(recorder.fails, vec![0]);
        assert_eq!(recorder.finished, Some((1, SimStatus::Halted)));
    }

    #[test]
    fn invalid_proposals_are_discarded_and_exhaustion_stalls() {
        let mut sim = simulation("S.F\n.##", Vec::new());
        // Pool of (0, 0) and (1, 1); the latter is a wall in the simulated maze.
        let pool = Grid::parse("S#\n#F").unwrap();
        let teleporter = Teleporter::new(&pool, ChaCha12Rng::seed_from_u64(9));
        sim.agents.push(Agent::new(
            "Blinky".to_string(),
            'T',
            AgentKind::Teleport,
            Strategy::RandomTeleport(teleporter),
            sim.start,
            sim.finish,
        ));

        let mut recorder = Recorder::default();
        assert_eq!(sim.run(&mut recorder), SimStatus::Halted);
        assert_eq!(sim.tick(), 2);
        assert_eq!(recorder.rejects, 1);
        assert!(recorder.moves.is_empty());
        assert_eq!(recorder.stalls, 1);
        assert_eq!(sim.agents()[0].position(), Position::new(0, 0));
        assert_eq!(sim.agents()[0].status(), AgentStatus::Stalled);
    }

    #[test]
    fn teleporter_always_reaches_the_finish_eventually() {
        let maze = "S.#...\n..#.F.\n..#...";
        for seed in 0..16 {
            let mut sim = Simulation::new(
                Grid::parse(maze).unwrap(),
                unpaced(),
                vec![spawn(AgentKind::Teleport, 'T', 0)],
                seed,
            )
            .unwrap();
            assert_eq!(sim.run(&mut NoopObserver), SimStatus::Completed);
            // 15 open cells, each drawn at most once.
            assert!(sim.tick() <= 15);
        }
    }

    #[test]
    fn staggered_spawns_follow_simulated_time() {
        let schedule = vec![
            spawn(AgentKind::LeftHand, 'L', 0),
            spawn(AgentKind::RightHand, 'R', 5_000),
            spawn(AgentKind::Teleport, 'T', 10_000),
            spawn(AgentKind::Pathfinder, 'P', 15_000),
        ];
        let mut sim = simulation(CORRIDOR, schedule);
        let mut recorder = Recorder::default();
        assert_eq!(sim.run(&mut recorder), SimStatus::Completed);

        // 100 ms ticks: thresholds are crossed at ticks 0, 50, 100 and 150.
        assert_eq!(recorder.spawns, vec![(0, 0), (50, 1), (100, 2), (150, 3)]);
        for pair in recorder.tick_ends.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
            assert!(pair[0].2 <= pair[1].2);
        }
        let (last_tick, _) = recorder.finished.unwrap();
        assert!(last_tick > 150);
        assert_eq!(last_tick, 154);
        assert!(sim.agents().iter().all(Agent::has_arrived));
    }

    #[test]
    fn simultaneous_thresholds_admit_one_agent_per_tick() {
        let schedule = vec![
            spawn(AgentKind::Pathfinder, 'A', 0),
            spawn(AgentKind::Pathfinder, 'B', 0),
            spawn(AgentKind::Pathfinder, 'C', 0),
        ];
        let mut sim = simulation(CORRIDOR, schedule);
        let mut recorder = Recorder::default();
        sim.run(&mut recorder);
        assert_eq!(recorder.spawns, vec![(0, 0), (1, 1), (2, 2)]);
        assert_eq!(sim.tick(), 6);
    }

    #[test]
    fn pacing_does_not_change_the_outcome() {
        let schedule = vec![
            spawn(AgentKind::Teleport, 'T', 0),
            spawn(AgentKind::LeftHand, 'L', 100),
        ];
        let grid = Grid::parse("S..#\n.#..\n...F").unwrap();

        let fast_cfg = SimulationConfig {
            tick_ms: 1,
            ..unpaced()
        };
        let paced_cfg = SimulationConfig {
            pace: true,
            ..fast_cfg.clone()
        };
        let mut fast = Simulation::new(grid.clone(), fast_cfg, schedule.clone(), 5).unwrap();
        let mut paced = Simulation::new(grid, paced_cfg, schedule, 5).unwrap();

        fast.run(&mut NoopObserver);
        paced.run(&mut NoopObserver);
        assert_eq!(fast.tick(), paced.tick());
        let positions = |sim: &Simulation| -> Vec<Position> {
            sim.agents().iter().map(Agent::position).collect()
        };
        assert_eq!(positions(&fast), positions(&paced));
    }

    #[test]
    fn step_after_finish_is_a_no_op() {
        let mut sim = simulation(CORRIDOR, vec![spawn(AgentKind::Pathfinder, 'P', 0)]);
        sim.run(&mut NoopObserver);
        let mut recorder = Recorder::default();
        assert_eq!(sim.step(&mut recorder), SimStatus::Completed);
        assert!(recorder.moves.is_empty());
        assert!(recorder.tick_ends.is_empty());
        assert_eq!(sim.tick(), 4);
    }
}
