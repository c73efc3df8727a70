//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// hn-relay: relay newly submitted Hacker News stories to Mastodon
#[derive(Parser, Debug)]
#[command(name = "hn-relay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll, publish, and trim on an interval
    Run(RunArgs),

    /// Store unseen stories from the new-stories list once
    Poll,

    /// Post pending stories once
    Publish(PublishArgs),

    /// Delete stories outside the retention window
    Trim(TrimArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Render statuses without posting them
    #[arg(long)]
    pub dry_run: bool,

    /// Run one cycle and exit
    #[arg(long)]
    pub once: bool,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Render statuses without posting them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct TrimArgs {
    /// Number of most recent stories to keep (defaults to database.retain_count)
    #[arg(long)]
    pub keep: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
