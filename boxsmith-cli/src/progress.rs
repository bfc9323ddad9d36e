//! Spinner that follows a run's progress events.

use std::time::Duration;

use boxsmith_lib::{RunEvent, Stage};
use indicatif::{ProgressBar, ProgressStyle};

pub(crate) fn spinner(quiet: bool, msg: &str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("  {spinner:.cyan} {msg}") {
        pb.set_style(style.tick_chars("/-\\|"));
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Turns [`RunEvent`]s into spinner messages.
pub(crate) struct RunProgress {
    pb: ProgressBar,
}

impl RunProgress {
    pub(crate) fn new(quiet: bool) -> Self {
        Self {
            pb: spinner(quiet, "Starting..."),
        }
    }

    pub(crate) fn handle(&self, event: RunEvent) {
        let msg = match event {
            RunEvent::StageStarted(stage) => stage_message(stage).to_string(),
            RunEvent::LibraryLoaded { items, groupings } => {
                format!("Library: {} movies, {} collections", items, groupings)
            }
            RunEvent::Resolved { done, total } => {
                format!("Resolving collections [{}/{}]", done, total)
            }
            RunEvent::Planned { plans } => format!("Planned {} collections", plans),
            RunEvent::Applied { done, total, name } => {
                format!("Applying [{}/{}] {}", done, total, name)
            }
            RunEvent::Forwarded { done, total, title } => {
                format!("Checking requests [{}/{}] {}", done, total, title)
            }
            RunEvent::Done => {
                self.pb.finish_and_clear();
                return;
            }
        };
        self.pb.set_message(msg);
    }

    pub(crate) fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

fn stage_message(stage: Stage) -> &'static str {
    match stage {
        Stage::Library => "Reading Jellyfin library...",
        Stage::Resolve => "Resolving collections...",
        Stage::Plan => "Planning changes...",
        Stage::Apply => "Applying changes...",
        Stage::Forward => "Checking missing titles with Jellyseerr...",
    }
}
