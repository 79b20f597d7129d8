use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

/// `chatrelay` - relays a Discord conversation to a local Ollama model.
#[derive(Parser, Debug)]
#[command(name = "chatrelay")]
#[command(version)]
#[command(about = "Relay Discord conversations to an Ollama model.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.chatrelay/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log verbosity (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to Discord and start relaying
    Run,

    /// Inspect or reset the saved conversation
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// Print the saved conversation
    Show {
        /// Print the raw JSON records instead of the rendered log
        #[arg(long)]
        json: bool,
    },
    /// Back up the saved conversation and clear it
    Reset,
}
