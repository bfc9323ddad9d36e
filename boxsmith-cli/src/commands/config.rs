use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::cli_types::RunArgs;
use crate::config::{self, Settings, mask_value};
use crate::error::CliError;

fn config_file_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(config::config_path)
}

/// Show resolved settings and their sources.
pub(crate) fn run_config_show(explicit: Option<&Path>) -> Result<(), CliError> {
    let path = config_file_path(explicit);
    log::info!(
        "{}",
        "boxsmith configuration".if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("");

    match &path {
        Some(p) if p.exists() => log::info!(
            "  Config file: {} {}",
            p.display().if_supports_color(Stdout, |t| t.cyan()),
            "(exists)".if_supports_color(Stdout, |t| t.green()),
        ),
        Some(p) => log::info!(
            "  Config file: {} {}",
            p.display().if_supports_color(Stdout, |t| t.cyan()),
            "(not found)".if_supports_color(Stdout, |t| t.dimmed()),
        ),
        None => log::info!(
            "  Config file: {}",
            "could not determine path".if_supports_color(Stdout, |t| t.red()),
        ),
    }
    log::info!("");

    let file = config::load_config_file(explicit)?;
    let settings = Settings::resolve(&RunArgs::default(), file.as_ref(), |k| {
        std::env::var(k).ok()
    });

    for (name, setting, secret) in settings.rows() {
        let source = format!("({})", setting.source);
        match setting.get() {
            Some(v) => log::info!(
                "  {} {} {}",
                format!("{}:", name).if_supports_color(Stdout, |t| t.cyan()),
                if secret { mask_value(v) } else { v.to_string() },
                source.if_supports_color(Stdout, |t| t.dimmed()),
            ),
            None => log::info!(
                "  {} {} {}",
                format!("{}:", name).if_supports_color(Stdout, |t| t.cyan()),
                "not set".if_supports_color(Stdout, |t| t.yellow()),
                source.if_supports_color(Stdout, |t| t.dimmed()),
            ),
        }
    }

    let run_config = config::run_config(&RunArgs::default(), file.as_ref())?;
    log::info!("");
    log::info!(
        "  {} catalog={} forward={} min_collection_size={} min_owned_members={} lookup_concurrency={} skip_unreleased={}",
        "run:".if_supports_color(Stdout, |t| t.cyan()),
        run_config.catalog,
        run_config.forward,
        run_config.min_collection_size,
        run_config.min_owned_members,
        run_config.lookup_concurrency,
        run_config.skip_unreleased,
    );
    Ok(())
}

/// Print the config file path.
pub(crate) fn run_config_path(explicit: Option<&Path>) -> Result<(), CliError> {
    let path = config_file_path(explicit)
        .ok_or_else(|| CliError::config("Could not determine config directory"))?;
    println!("{}", path.display());
    Ok(())
}
