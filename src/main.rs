mod agent;
mod config;
mod error;
mod grid;
mod manager;
mod path;
mod render;
mod simulation;
mod strategy;

use crate::manager::Manager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    maze: PathBuf,

    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Run {
        /// Log progress instead of drawing the maze.
        #[arg(long)]
        headless: bool,
    },

    Route,

    Check,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(args.maze, args.config).context("failed to construct mgr")?;

    match args.command {
        Command::Run { headless } => mgr.run_simulation(headless)?,
        Command::Route => mgr.print_route()?,
        Command::Check => mgr.check()?,
    }

    Ok(())
}
