use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use boxsmith_core::ForwardMode;
use boxsmith_lib::{ArtworkChange, GroupingReport, RunReport, describe_state};

/// Print per-collection changes, then the run summary.
pub(crate) fn print_report(report: &RunReport) {
    let apply = &report.apply;
    let (create, update) = if apply.dry_run {
        ("Would create", "Would update")
    } else {
        ("Created", "Updated")
    };

    for g in &apply.created {
        print_change(create, g);
    }
    for g in &apply.updated {
        print_change(update, g);
    }
    for g in &apply.skipped {
        log::warn!(
            "  {} Skipped \"{}\": {}",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            g.name,
            g.note.as_deref().unwrap_or("no reason recorded"),
        );
    }
    for g in &apply.failed {
        log::warn!(
            "  {} Failed \"{}\": {}",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            g.name,
            g.note.as_deref().unwrap_or("unknown error"),
        );
    }
    if apply.total() > 0 {
        log::info!("");
    }

    print_requests(report);
    print_summary(report);
}

fn print_change(what: &str, g: &GroupingReport) {
    log::info!(
        "  {} {} \"{}\"",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        what,
        g.name.if_supports_color(Stdout, |t| t.bold()),
    );
    if !g.added.is_empty() {
        log::info!("      + {}", g.added.join(", "));
    }
    match g.artwork {
        ArtworkChange::Applied => log::info!("      artwork set"),
        ArtworkChange::Pending => log::info!("      artwork would be set"),
        ArtworkChange::Unavailable => log::debug!("      artwork skipped (offline)"),
        ArtworkChange::None => {}
    }
}

/// Missing titles that were requested, or would be in a dry run.
fn print_requests(report: &RunReport) {
    let Some(forward) = &report.forward else {
        return;
    };
    let asked = report.config.forward;
    let listed: Vec<_> = if forward.mode == ForwardMode::Send {
        forward.sent.iter().collect()
    } else if asked == ForwardMode::Send {
        forward.eligible.iter().collect()
    } else {
        Vec::new()
    };
    if listed.is_empty() && forward.failed.is_empty() {
        return;
    }

    let heading = if forward.mode == ForwardMode::Send {
        "Requested from Jellyseerr:"
    } else {
        "Would request from Jellyseerr:"
    };
    log::info!("{}", heading.if_supports_color(Stdout, |t| t.bold()));
    for f in listed {
        log::info!(
            "  {} {} ({})",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
            f.item.title,
            f.item.source_collection.if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    for f in &forward.failed {
        log::warn!(
            "  {} {}: {}",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            f.item.title,
            describe_state(&f.state, forward.mode, asked),
        );
    }
    log::info!("");
}

fn print_summary(report: &RunReport) {
    let s = report.summary();
    let title = if report.apply.dry_run {
        "Summary (dry run, nothing changed):"
    } else {
        "Summary:"
    };
    log::info!("{}", title.if_supports_color(Stdout, |t| t.bold()));
    log::info!(
        "  {} movies scanned, {} collections found",
        s.movies_scanned,
        s.collections_found
    );
    log::info!(
        "  {} {} created, {} updated, {} unchanged",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        s.created,
        s.updated,
        s.unchanged,
    );
    if s.skipped > 0 {
        log::warn!(
            "  {} {} skipped",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            s.skipped,
        );
    }
    if s.failed > 0 {
        log::warn!(
            "  {} {} failed",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            s.failed,
        );
    }
    if s.unresolved > 0 {
        log::info!(
            "  {} {} movies not in any collection or not resolvable",
            "?".if_supports_color(Stdout, |t| t.yellow()),
            s.unresolved,
        );
    }
    log::info!(
        "  {} titles missing from collections ({} unreleased not counted)",
        s.missing,
        s.unreleased
    );
    if report.forward.is_some() {
        log::info!(
            "  Jellyseerr: {} already requested, {} eligible, {} sent, {} failed",
            s.already_requested,
            s.eligible,
            s.requests_sent,
            s.requests_failed,
        );
    }
    if let Some(stage) = report.cancelled_at {
        log::warn!(
            "  {} Cancelled before the {} stage",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            stage,
        );
    }
}
