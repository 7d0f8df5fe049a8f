//! Operator CLI for replicated-log supervision
//!
//! Runs single supervision decisions on agency documents, replays event
//! sequences through the supervisor control cycle, and runs exhaustive
//! explorations from scenario files.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{check, decide, replay};

#[derive(Parser)]
#[command(name = "replog")]
#[command(about = "Replicated-log supervision engine and checker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Supervision config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the actions the next decision cycle takes on an agency document
    Decide(decide::DecideArgs),

    /// Run an event sequence through the supervisor against an in-memory agency
    Replay(replay::ReplayArgs),

    /// Exhaustively explore a scenario and check the convergence predicates
    Check(check::CheckArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    match cli.command {
        Commands::Decide(args) => decide::run(&args)?,
        Commands::Replay(args) => {
            let config = commands::load_supervision_config(cli.config.as_deref())?;
            replay::run(&args, config).await?;
        }
        Commands::Check(args) => check::run(&args)?,
    }

    Ok(())
}
