use crate::strategy::AgentKind;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt::Debug, fs, ops::RangeBounds, path::Path, time::Duration};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Spawn schedule, in spawn order.
    #[serde(default = "default_agents")]
    pub agents: Vec<SpawnConfig>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulated duration of one tick in milliseconds.
    pub tick_ms: u64,
    /// Sleep for one tick between ticks.
    pub pace: bool,
    /// Seed for every random source; drawn from the OS when absent.
    pub seed: Option<u64>,
    /// Stop after this many ticks even if agents are still walking.
    pub max_ticks: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            pace: true,
            seed: None,
            max_ticks: None,
        }
    }
}

impl SimulationConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// One entry of the spawn schedule.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SpawnConfig {
    pub kind: AgentKind,
    pub name: String,
    pub symbol: char,
    /// Simulated time after the start at which the agent may spawn.
    #[serde(default)]
    pub delay_ms: u64,
}

impl SpawnConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

fn default_agents() -> Vec<SpawnConfig> {
    let spawn = |kind, name: &str, symbol, delay_ms| SpawnConfig {
        kind,
        name: name.to_string(),
        symbol,
        delay_ms,
    };
    vec![
        spawn(AgentKind::LeftHand, "Lefty", 'L', 0),
        spawn(AgentKind::RightHand, "Righty", 'R', 5_000),
        spawn(AgentKind::Teleport, "Blinky", 'T', 10_000),
        spawn(AgentKind::Pathfinder, "Scout", 'P', 15_000),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            agents: default_agents(),
        }
    }
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let text = fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_num(self.simulation.tick_ms, 1..=60_000).context("invalid tick duration")?;
        if let Some(max_ticks) = self.simulation.max_ticks {
            check_num(max_ticks, 1..).context("invalid maximum number of ticks")?;
        }

        check_num(self.agents.len(), 1..=26).context("invalid number of agents")?;

        let mut symbols = HashSet::new();
        let mut prev_delay = 0;
        for (i_agt, spawn) in self.agents.iter().enumerate() {
            check_spawn(spawn, prev_delay).with_context(|| format!("invalid agent {i_agt}"))?;
            if !symbols.insert(spawn.symbol) {
                bail!("symbol {:?} is used by more than one agent", spawn.symbol);
            }
            prev_delay = spawn.delay_ms;
        }

        Ok(())
    }
}

fn check_spawn(spawn: &SpawnConfig, prev_delay: u64) -> Result<()> {
    if spawn.name.trim().is_empty() {
        bail!("name must not be empty");
    }
    let symbol = spawn.symbol;
    if symbol.is_whitespace() || symbol.is_control() || "#.SF".contains(symbol) {
        bail!("symbol {symbol:?} is reserved or not printable");
    }
    check_num(spawn.delay_ms, prev_delay..).context("delays must not decrease")?;
    Ok(())
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
