use std::io::Write;

use log::LevelFilter;

/// Install the console logger.
///
/// Normal output is the bare message at `info`. `--verbose` adds
/// timestamps, levels and debug messages from the boxsmith crates;
/// `--quiet` keeps warnings and errors only. `RUST_LOG` overrides both.
pub(crate) fn init(verbose: bool, quiet: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level.min(LevelFilter::Info))
        .target(env_logger::Target::Stdout);
    for module in [
        "boxsmith",
        "boxsmith_core",
        "boxsmith_lib",
        "boxsmith_tmdb",
        "boxsmith_jellyfin",
        "boxsmith_seerr",
    ] {
        builder.filter_module(module, level);
    }
    builder.parse_env("RUST_LOG");

    if verbose {
        builder.format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}",
                buf.timestamp_millis(),
                record.level(),
                record.args()
            )
        });
    } else {
        builder.format(|buf, record| writeln!(buf, "{}", record.args()));
    }

    let _ = builder.try_init();
}
