use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `topic-janitor` - per-topic message retention for Telegram forum groups.
#[derive(Parser, Debug)]
#[command(name = "topic-janitor")]
#[command(version)]
#[command(about = "Deletes chat messages by age or count, per forum topic.", long_about = None)]
pub struct Cli {
    /// Path to config.toml (default: ~/.topic-janitor/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the bot: poll updates, track messages, sweep due deletions
    Run,

    /// Show stored policies and pending work from the retention snapshot
    Status,

    /// Print the resolved config file path
    ConfigPath,
}
