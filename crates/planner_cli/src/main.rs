//! `planner` command-line front end.
//!
//! Thin wrapper over `planner_core`: settings come from the environment,
//! logs go to rolling files, errors are reported through `anyhow`.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::Runtime;
use log::info;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let runtime = Runtime::open()?;
    info!("event=cli_command module=cli status=start command={}", cli.command.name());

    match &cli.command {
        Commands::Write { words } => commands::write::run(&runtime, words),
        Commands::Cycle(args) => commands::cycle::run(&runtime, args),
        Commands::Read(args) => commands::read::run(&runtime, args),
        Commands::Strip { yes } => commands::strip::run(&runtime, *yes),
    }
}
