//! The boxsmith reconciliation engine.
//!
//! A run reads the library, resolves each movie to its canonical
//! collection, plans one action per collection, applies the plan (unless
//! it is a dry run) and optionally forwards missing titles to the request
//! service. Every external system is reached through the traits in
//! `boxsmith-core`, so the whole pipeline runs against in-memory fakes.

pub mod applier;
pub mod audit;
pub mod error;
pub mod events;
pub mod forwarder;
pub mod missing;
pub mod planner;
pub mod resolver;
pub mod run;

pub use applier::{ApplyResult, ArtworkChange, GroupingReport};
pub use audit::{describe_state, log_file_path, write_audit, write_audit_log};
pub use error::RunError;
pub use events::{EventSink, RunEvent, Stage, drive_with_events};
pub use forwarder::{ForwardResult, ForwardState, ForwardedItem};
pub use missing::MissingReport;
pub use planner::{PlanAction, ReconciliationPlan, SkipReason};
pub use resolver::{ResolvedMembership, Unresolved, UnresolvedReason};
pub use run::{Reconciler, RunReport, RunSummary};
