//! Plain-text audit log of every decision a run made.

use std::io::Write;
use std::path::{Path, PathBuf};

use boxsmith_core::ForwardMode;
use chrono::Local;

use crate::applier::{ArtworkChange, GroupingReport};
use crate::forwarder::ForwardState;
use crate::planner::PlanAction;
use crate::run::RunReport;

/// `<dir>/boxsmith_<YYYYmmdd_HHMMSS>.log` for a run starting now.
pub fn log_file_path(dir: &Path) -> PathBuf {
    dir.join(format!(
        "boxsmith_{}.log",
        Local::now().format("%Y%m%d_%H%M%S")
    ))
}

/// Write the audit log for `report`, creating `path`'s parent if needed.
pub fn write_audit_log(report: &RunReport, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_audit(report, &mut file)?;
    file.flush()
}

/// Render the audit log into any writer.
pub fn write_audit(report: &RunReport, out: &mut impl Write) -> std::io::Result<()> {
    let summary = report.summary();
    let config = &report.config;

    writeln!(out, "=== boxsmith run ===")?;
    writeln!(out, "Started:  {}", report.started.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "Finished: {}", report.finished.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(
        out,
        "Mode: catalog={} dry_run={} forward={}",
        config.catalog,
        config.dry_run,
        config.effective_forward()
    )?;
    if let Some(stage) = report.cancelled_at {
        writeln!(out, "Cancelled before the {} stage", stage)?;
    }
    writeln!(out)?;

    writeln!(out, "--- Summary ---")?;
    writeln!(out, "Movies scanned:     {}", summary.movies_scanned)?;
    writeln!(out, "Collections found:  {}", summary.collections_found)?;
    writeln!(
        out,
        "Groupings:          {} created, {} updated, {} unchanged, {} skipped, {} failed",
        summary.created, summary.updated, summary.unchanged, summary.skipped, summary.failed
    )?;
    writeln!(out, "Unresolved items:   {}", summary.unresolved)?;
    writeln!(
        out,
        "Missing titles:     {} ({} unreleased held back)",
        summary.missing, summary.unreleased
    )?;
    if report.forward.is_some() {
        writeln!(
            out,
            "Requests:           {} already requested, {} eligible, {} sent, {} failed",
            summary.already_requested,
            summary.eligible,
            summary.requests_sent,
            summary.requests_failed
        )?;
    }
    writeln!(out)?;

    writeln!(out, "--- Groupings ---")?;
    let apply = &report.apply;
    let what = if apply.dry_run { "WOULD CREATE" } else { "CREATED" };
    for g in &apply.created {
        write_grouping(out, what, g)?;
    }
    let what = if apply.dry_run { "WOULD UPDATE" } else { "UPDATED" };
    for g in &apply.updated {
        write_grouping(out, what, g)?;
    }
    for g in &apply.unchanged {
        write_grouping(out, "NOOP", g)?;
    }
    for g in &apply.skipped {
        write_grouping(out, "SKIP", g)?;
    }
    for g in &apply.failed {
        write_grouping(out, "FAILED", g)?;
    }
    writeln!(out)?;

    writeln!(out, "--- Plan detail ---")?;
    for plan in &report.plans {
        let action = match &plan.action {
            PlanAction::Create => "create".to_string(),
            PlanAction::Update { grouping_id } => format!("update {grouping_id}"),
            PlanAction::Noop { grouping_id } => format!("noop {grouping_id}"),
            PlanAction::Skip(reason) => format!("skip ({reason})"),
        };
        writeln!(
            out,
            "\"{}\" (TMDb {}): {}; {} owned of {}, {} to add{}",
            plan.grouping_name,
            plan.collection.id,
            action,
            plan.members.len(),
            plan.collection.members.len(),
            plan.members_to_add.len(),
            if plan.needs_artwork { ", artwork due" } else { "" }
        )?;
    }
    writeln!(out)?;

    let unresolved = report.membership.unresolved();
    if !unresolved.is_empty() {
        writeln!(out, "--- Unresolved ---")?;
        for u in unresolved {
            let id = u
                .item
                .external_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".into());
            writeln!(out, "[UNRESOLVED] {} (TMDb {}): {}", u.item.title, id, u.reason)?;
        }
        writeln!(out)?;
    }

    writeln!(out, "--- Missing ---")?;
    for m in &report.missing.missing {
        let state = report.forward.as_ref().and_then(|f| {
            [&f.already_requested, &f.eligible, &f.sent, &f.failed]
                .into_iter()
                .flatten()
                .find(|x| x.item.external_id == m.external_id)
                .map(|x| describe_state(&x.state, f.mode, config.forward))
        });
        writeln!(
            out,
            "[MISSING] {} (TMDb {}) from \"{}\"{}",
            m.title,
            m.external_id,
            m.source_collection,
            state.map(|s| format!(": {s}")).unwrap_or_default()
        )?;
    }
    for m in &report.missing.unreleased {
        writeln!(
            out,
            "[UNRELEASED] {} (TMDb {}, {}) from \"{}\"",
            m.title,
            m.external_id,
            m.release_year.unwrap_or_default(),
            m.source_collection
        )?;
    }

    Ok(())
}

fn write_grouping(out: &mut impl Write, what: &str, g: &GroupingReport) -> std::io::Result<()> {
    write!(out, "[{}] \"{}\" (TMDb {})", what, g.name, g.collection_id)?;
    if let Some(id) = &g.grouping_id {
        write!(out, " -> {}", id)?;
    }
    writeln!(out)?;
    if !g.added.is_empty() {
        writeln!(out, "     Added: {}", g.added.join(", "))?;
    }
    match g.artwork {
        ArtworkChange::None => {}
        ArtworkChange::Applied => writeln!(out, "     Artwork: applied")?,
        ArtworkChange::Pending => writeln!(out, "     Artwork: would apply")?,
        ArtworkChange::Unavailable => writeln!(out, "     Artwork: not available offline")?,
    }
    if let Some(note) = &g.note {
        writeln!(out, "     Note: {}", note)?;
    }
    Ok(())
}

/// Human wording for a forward state. An eligible title in a dry run that
/// asked for `send` reads as "would request".
pub fn describe_state(state: &ForwardState, used: ForwardMode, asked: ForwardMode) -> String {
    match state {
        ForwardState::AlreadyRequested(status) => format!("already requested ({status})"),
        ForwardState::Unreleased { year } => format!("unreleased ({year})"),
        ForwardState::Eligible if asked == ForwardMode::Send && used == ForwardMode::CheckOnly => {
            "would request".into()
        }
        ForwardState::Eligible => "not requested".into(),
        ForwardState::Requested { request_id: Some(id) } => format!("requested (#{id})"),
        ForwardState::Requested { request_id: None } => "requested (duplicate)".into(),
        ForwardState::Failed(e) => format!("failed: {e}"),
    }
}
