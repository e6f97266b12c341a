//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for atelier
#[derive(Parser, Debug)]
#[command(name = "atelier")]
#[command(author, version, about = "Multi-agent conversation orchestrator - bargaining dry runs")]
#[command(long_about = r#"
atelier replays scripted bargaining negotiations through the five-agent
bargaining topology (content filter, deal closer, emotion estimator, bid
estimator, negotiator) without calling any model.

Configuration files are loaded from (in priority order):
1. ATELIER_* environment variables (nested keys split on "__")
2. --config <path>     Explicit config file
3. ./atelier.toml      Project-level config
4. ~/.config/atelier/config.toml   Global config

Example:
  atelier bargain --script demos/sunset.toml
  atelier -vv --log-dir logs bargain --script demos/sunset.toml
  atelier config
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Also write daily-rolling diagnostic logs into this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a scripted negotiation and print the transcript as JSON
    Bargain {
        /// TOML script with market data, scripted replies and buyer messages
        #[arg(long, value_name = "FILE")]
        script: PathBuf,
    },
    /// Show configuration sources and the resolved configuration
    Config,
}
