//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use boxsmith_core::ForwardMode;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "boxsmith")]
#[command(
    about = "Group a Jellyfin movie library into TMDb collections",
    long_about = None
)]
pub(crate) struct Cli {
    /// Only show warnings and errors (suppress normal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to read instead of ~/.config/boxsmith/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Reconcile the library against TMDb collections (dry run unless --apply)
    Run(RunArgs),

    /// Inspect or clear the TMDb lookup cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show resolved settings and where they came from
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Clone, Debug, Default)]
pub(crate) struct RunArgs {
    /// Apply the plan to Jellyfin instead of only reporting it
    #[arg(long)]
    pub apply: bool,

    /// Resolve collections through the TMDb API instead of the local snapshot
    #[arg(long)]
    pub online: bool,

    /// Forward missing titles to Jellyseerr: disabled, check or send
    #[arg(long, value_name = "MODE")]
    pub forward: Option<ForwardMode>,

    /// Jellyfin server URL (overrides $JELLYFIN_URL)
    #[arg(long)]
    pub jellyfin_url: Option<String>,

    /// Jellyfin user to act as (defaults to the first enabled user)
    #[arg(long)]
    pub jellyfin_user: Option<String>,

    /// Jellyseerr API base URL (overrides $JELLYSEERR_URL)
    #[arg(long)]
    pub jellyseerr_url: Option<String>,

    /// Snapshot directory holding collections.json (default: ./metadata)
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    #[command(flatten)]
    pub cache: CacheArgs,

    /// Keep the cache in memory for this run only
    #[arg(long)]
    pub no_cache: bool,

    /// Directory for the run audit log (default: ./logs)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Disable the run audit log
    #[arg(long)]
    pub no_log: bool,
}

#[derive(Args, Clone, Debug, Default)]
pub(crate) struct CacheArgs {
    /// Cache file to use instead of ~/.cache/boxsmith/tmdb_cache.json
    #[arg(long)]
    pub cache_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Show cache location, entry counts and size
    Info {
        #[command(flatten)]
        cache: CacheArgs,
    },

    /// Delete the cache file
    Clear {
        #[command(flatten)]
        cache: CacheArgs,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show resolved settings and their sources
    Show,

    /// Print the config file path
    Path,
}
