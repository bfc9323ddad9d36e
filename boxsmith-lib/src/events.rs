//! Progress events emitted while a run is in flight.

use std::fmt;
use std::future::Future;

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

/// Bound on draining leftover events once the run future has finished.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Ordered stages of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Library,
    Resolve,
    Plan,
    Apply,
    Forward,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Library => "library",
            Self::Resolve => "resolve",
            Self::Plan => "plan",
            Self::Apply => "apply",
            Self::Forward => "forward",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    StageStarted(Stage),
    LibraryLoaded { items: usize, groupings: usize },
    /// One distinct catalog id finished resolving.
    Resolved { done: usize, total: usize },
    Planned { plans: usize },
    /// A plan entry was applied (or would have been, in a dry run).
    Applied { done: usize, total: usize, name: String },
    Forwarded { done: usize, total: usize, title: String },
    Done,
}

/// Where stages send their events. The default sink drops everything.
#[derive(Debug, Clone, Default)]
pub struct EventSink(Option<mpsc::UnboundedSender<RunEvent>>);

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self(Some(tx))
    }

    /// A sink plus the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.0 {
            // The receiver going away only means nobody is watching.
            let _ = tx.send(event);
        }
    }
}

/// Poll `task` to completion, handing each event from `rx` to `on_event`
/// as it arrives, then flush whatever is still queued.
///
/// The flush stops once every sender is gone or after [`DRAIN_TIMEOUT`],
/// whichever comes first.
pub async fn drive_with_events<F, R>(
    task: F,
    mut rx: mpsc::UnboundedReceiver<RunEvent>,
    mut on_event: impl FnMut(RunEvent),
) -> R
where
    F: Future<Output = R>,
{
    tokio::pin!(task);
    let mut channel_open = true;

    let result = loop {
        tokio::select! {
            r = &mut task => break r,
            event = rx.recv(), if channel_open => match event {
                Some(event) => on_event(event),
                None => channel_open = false,
            },
        }
    };

    let deadline = Instant::now() + DRAIN_TIMEOUT;
    while channel_open {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(event)) => on_event(event),
            Ok(None) => channel_open = false,
            Err(_) => {
                log::warn!(
                    "Gave up draining run events after {}s",
                    DRAIN_TIMEOUT.as_secs()
                );
                break;
            }
        }
    }

    result
}
