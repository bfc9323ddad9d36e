use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use boxsmith_tmdb::{JsonFileCache, clear_cache, default_cache_path};

use crate::cli_types::CacheArgs;
use crate::error::CliError;

fn cache_path(args: &CacheArgs) -> Result<PathBuf, CliError> {
    match &args.cache_file {
        Some(p) => Ok(p.clone()),
        None => default_cache_path().map_err(|e| CliError::cache(e.to_string())),
    }
}

/// Show where the cache lives and what it holds.
pub(crate) fn run_cache_info(args: &CacheArgs) -> Result<(), CliError> {
    let path = cache_path(args)?;
    let Some(size) = std::fs::metadata(&path).ok().map(|m| m.len()) else {
        log::info!(
            "{} {}",
            "No cache file at".if_supports_color(Stdout, |t| t.dimmed()),
            path.display(),
        );
        return Ok(());
    };

    let stats = JsonFileCache::open(&path).stats();
    log::info!("{}", "TMDb cache:".if_supports_color(Stdout, |t| t.bold()));
    log::info!(
        "  Path: {}",
        stats.path.display().if_supports_color(Stdout, |t| t.cyan())
    );
    log::info!("  Movies: {}", stats.movies);
    log::info!("  Artwork records: {}", stats.artwork);
    log::info!("  Size: {}", format_bytes(stats.file_size.unwrap_or(size)));
    Ok(())
}

/// Delete the cache file.
pub(crate) fn run_cache_clear(args: &CacheArgs) -> Result<(), CliError> {
    let path = cache_path(args)?;
    let freed = clear_cache(&path).map_err(|e| CliError::cache(e.to_string()))?;
    log::info!(
        "{} Cache cleared ({} freed)",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        format_bytes(freed),
    );
    Ok(())
}

pub(crate) fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
