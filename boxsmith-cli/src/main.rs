//! boxsmith CLI
//!
//! Keeps Jellyfin movie collections in line with TMDb collections.

mod cli_types;
mod commands;
mod config;
mod error;
mod logging;
mod progress;

use clap::Parser;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stderr;

use crate::cli_types::{CacheAction, Cli, Commands, ConfigAction};
use crate::error::CliError;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let result: Result<(), CliError> = match cli.command {
        Commands::Run(args) => commands::run::run_reconcile(args, cli.config, cli.quiet),
        Commands::Cache { action } => match action {
            CacheAction::Info { cache } => commands::cache::run_cache_info(&cache),
            CacheAction::Clear { cache } => commands::cache::run_cache_clear(&cache),
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::run_config_show(cli.config.as_deref()),
            ConfigAction::Path => commands::config::run_config_path(cli.config.as_deref()),
        },
    };

    if let Err(e) = result {
        log::error!(
            "{} {}",
            "\u{2718}".if_supports_color(Stderr, |t| t.red()),
            e,
        );
        std::process::exit(1);
    }
}
