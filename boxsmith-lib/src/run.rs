//! One reconciliation run, stage by stage.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use boxsmith_core::{
    ArtworkSource, CacheStore, CollectionProvider, ForwardMode, Grouping, LibraryItem,
    LibraryService, NoArtwork, NoRequests, RequestService, RunConfig, with_retry,
};
use chrono::{DateTime, Datelike, Local};

use crate::applier::{self, ApplyResult};
use crate::error::RunError;
use crate::events::{EventSink, RunEvent, Stage};
use crate::forwarder::{self, ForwardResult};
use crate::missing::{self, MissingReport};
use crate::planner::{self, ReconciliationPlan};
use crate::resolver::{self, ResolvedMembership};

/// Everything a run decided and did.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub config: RunConfig,
    pub started: DateTime<Local>,
    pub finished: DateTime<Local>,
    pub library: Vec<LibraryItem>,
    pub groupings: Vec<Grouping>,
    pub membership: ResolvedMembership,
    pub plans: Vec<ReconciliationPlan>,
    pub apply: ApplyResult,
    pub missing: MissingReport,
    /// `None` when forwarding is disabled or the run was cancelled first.
    pub forward: Option<ForwardResult>,
    /// Set when cancellation stopped the run before this stage.
    pub cancelled_at: Option<Stage>,
}

/// Counts for the end-of-run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub movies_scanned: usize,
    pub collections_found: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub unresolved: usize,
    pub missing: usize,
    pub unreleased: usize,
    pub already_requested: usize,
    pub eligible: usize,
    pub requests_sent: usize,
    pub requests_failed: usize,
}

impl RunReport {
    pub fn summary(&self) -> RunSummary {
        let forward = self.forward.as_ref();
        RunSummary {
            movies_scanned: self.library.len(),
            collections_found: self.membership.collection_count(),
            created: self.apply.created.len(),
            updated: self.apply.updated.len(),
            unchanged: self.apply.unchanged.len(),
            skipped: self.apply.skipped.len(),
            failed: self.apply.failed.len(),
            unresolved: self.membership.unresolved().len(),
            missing: self.missing.missing.len(),
            unreleased: self.missing.unreleased.len()
                + forward.map_or(0, |f| f.unreleased.len()),
            already_requested: forward.map_or(0, |f| f.already_requested.len()),
            eligible: forward.map_or(0, |f| f.eligible.len()),
            requests_sent: forward.map_or(0, |f| f.sent.len()),
            requests_failed: forward.map_or(0, |f| f.failed.len()),
        }
    }
}

/// Wires the services for a run and executes its stages in order: library,
/// resolve, plan, apply, forward.
pub struct Reconciler<'a, L, P, A = NoArtwork, R = NoRequests> {
    config: &'a RunConfig,
    library: &'a L,
    provider: &'a P,
    ledger: &'a dyn CacheStore,
    artwork: A,
    requests: Option<R>,
    cancel: Arc<AtomicBool>,
    events: EventSink,
}

impl<'a, L, P> Reconciler<'a, L, P>
where
    L: LibraryService,
    P: CollectionProvider,
{
    pub fn new(
        config: &'a RunConfig,
        library: &'a L,
        provider: &'a P,
        ledger: &'a dyn CacheStore,
    ) -> Self {
        Self {
            config,
            library,
            provider,
            ledger,
            artwork: NoArtwork,
            requests: None,
            cancel: Arc::new(AtomicBool::new(false)),
            events: EventSink::default(),
        }
    }
}

impl<'a, L, P, A, R> Reconciler<'a, L, P, A, R>
where
    L: LibraryService,
    P: CollectionProvider,
    A: ArtworkSource,
    R: RequestService,
{
    pub fn with_artwork<A2: ArtworkSource>(self, artwork: A2) -> Reconciler<'a, L, P, A2, R> {
        Reconciler {
            config: self.config,
            library: self.library,
            provider: self.provider,
            ledger: self.ledger,
            artwork,
            requests: self.requests,
            cancel: self.cancel,
            events: self.events,
        }
    }

    pub fn with_requests<R2: RequestService>(self, requests: R2) -> Reconciler<'a, L, P, A, R2> {
        Reconciler {
            config: self.config,
            library: self.library,
            provider: self.provider,
            ledger: self.ledger,
            artwork: self.artwork,
            requests: Some(requests),
            cancel: self.cancel,
            events: self.events,
        }
    }

    /// Flag checked before each stage; set it to stop the run.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    fn check_cancel(&self, stage: Stage) -> bool {
        if self.cancel.load(Ordering::Relaxed) {
            log::warn!("Cancelled before the {} stage", stage);
            return true;
        }
        self.events.emit(RunEvent::StageStarted(stage));
        false
    }

    pub async fn run(&self) -> Result<RunReport, RunError> {
        let config = self.config;
        let started = Local::now();
        let forward_mode = config.effective_forward();
        if forward_mode != ForwardMode::Disabled && self.requests.is_none() {
            return Err(RunError::config(
                "forwarding is enabled but no request service is configured",
            ));
        }
        if config.forward == ForwardMode::Send && forward_mode == ForwardMode::CheckOnly {
            log::info!("Dry run: missing titles are checked but not requested");
        }

        if self.check_cancel(Stage::Library) {
            return Err(RunError::Cancelled(Stage::Library));
        }
        let library = with_retry(&config.retry, "list library items", || {
            self.library.list_items(true)
        })
        .await
        .map_err(RunError::Library)?;
        let groupings = with_retry(&config.retry, "list groupings", || {
            self.library.list_groupings()
        })
        .await
        .map_err(RunError::Library)?;
        log::info!(
            "Library has {} movies and {} groupings",
            library.len(),
            groupings.len()
        );
        self.events.emit(RunEvent::LibraryLoaded {
            items: library.len(),
            groupings: groupings.len(),
        });

        if self.check_cancel(Stage::Resolve) {
            return Err(RunError::Cancelled(Stage::Resolve));
        }
        let membership = resolver::resolve_all(self.provider, &library, config, &self.events).await;

        if self.check_cancel(Stage::Plan) {
            return Err(RunError::Cancelled(Stage::Plan));
        }
        let plans = planner::plan(&membership, &groupings, self.ledger, config);
        self.events.emit(RunEvent::Planned { plans: plans.len() });

        if self.check_cancel(Stage::Apply) {
            return Err(RunError::Cancelled(Stage::Apply));
        }
        let apply = applier::apply(
            &plans,
            config,
            self.library,
            &self.artwork,
            self.ledger,
            &self.events,
        )
        .await;

        let missing = missing::find_missing(&plans, &library, config, started.year());
        let mut cancelled_at = None;
        let forward = match &self.requests {
            Some(requests) if forward_mode != ForwardMode::Disabled => {
                if self.check_cancel(Stage::Forward) {
                    cancelled_at = Some(Stage::Forward);
                    None
                } else {
                    Some(
                        forwarder::forward(
                            &missing.missing,
                            forward_mode,
                            requests,
                            &config.retry,
                            config.skip_unreleased.then_some(started.year()),
                            &self.events,
                        )
                        .await,
                    )
                }
            }
            _ => None,
        };

        if let Err(e) = self.ledger.flush() {
            log::warn!("Could not save the cache: {}", e);
        }
        self.events.emit(RunEvent::Done);
        Ok(RunReport {
            config: config.clone(),
            started,
            finished: Local::now(),
            library,
            groupings,
            membership,
            plans,
            apply,
            missing,
            forward,
            cancelled_at,
        })
    }
}
