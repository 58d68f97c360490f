//! rulechain CLI
//!
//! Runs a record through a rule flow and prints which rules it visited.

mod commands;
mod config;
mod console;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::RulechainConfig;

/// rulechain CLI: walk records through rule flows.
#[derive(Parser, Debug)]
#[command(name = "rulechain", version, about)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, env = "RULECHAIN_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a record through a flow and print the trace.
    Run(commands::run::RunArgs),
    /// Compile a flow and list its rules.
    Check(commands::check::CheckArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = RulechainConfig::load(cli.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match cli.command {
        Command::Run(args) => commands::run::run(&args, &config, &cli.format),
        Command::Check(args) => commands::check::run(&args, &config, &cli.format),
    }
}
