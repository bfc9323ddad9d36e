//! Applies reconciliation plans to the library service.

use std::cell::Cell;

use boxsmith_core::{
    ArtworkSource, CacheStore, ExternalId, LibraryService, RunConfig, ServiceError, match_key,
    record_artwork, with_retry,
};

use crate::events::{EventSink, RunEvent};
use crate::planner::{PlanAction, ReconciliationPlan};

/// What happened to a plan entry's artwork.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtworkChange {
    None,
    Applied,
    /// Dry run: would have been applied.
    Pending,
    /// Artwork is due but the catalog mode cannot supply it.
    Unavailable,
}

/// Outcome of one plan entry, with the same detail in dry and live runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingReport {
    pub collection_id: ExternalId,
    pub name: String,
    /// `None` for a grouping that was not (or in a dry run, would be) created.
    pub grouping_id: Option<String>,
    /// Titles added (or that would be added).
    pub added: Vec<String>,
    pub artwork: ArtworkChange,
    /// Skip reason or failure message.
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyResult {
    pub dry_run: bool,
    pub created: Vec<GroupingReport>,
    pub updated: Vec<GroupingReport>,
    pub unchanged: Vec<GroupingReport>,
    pub skipped: Vec<GroupingReport>,
    pub failed: Vec<GroupingReport>,
}

impl ApplyResult {
    pub fn total(&self) -> usize {
        self.created.len()
            + self.updated.len()
            + self.unchanged.len()
            + self.skipped.len()
            + self.failed.len()
    }
}

/// Apply each plan entry in order. A failing entry is recorded and the
/// rest still run; a dry run issues no calls at all.
pub async fn apply<L, A>(
    plans: &[ReconciliationPlan],
    config: &RunConfig,
    library: &L,
    artwork: &A,
    ledger: &dyn CacheStore,
    events: &EventSink,
) -> ApplyResult
where
    L: LibraryService,
    A: ArtworkSource,
{
    let mut result = ApplyResult {
        dry_run: config.dry_run,
        ..ApplyResult::default()
    };

    for (idx, plan) in plans.iter().enumerate() {
        let mut report = GroupingReport {
            collection_id: plan.collection.id,
            name: plan.grouping_name.clone(),
            grouping_id: plan.grouping_id().map(str::to_string),
            added: plan.members_to_add.iter().map(|m| m.title.clone()).collect(),
            artwork: ArtworkChange::None,
            note: None,
        };

        match &plan.action {
            PlanAction::Skip(reason) => {
                report.added.clear();
                report.note = Some(reason.to_string());
                result.skipped.push(report);
            }
            PlanAction::Noop { .. } => {
                report.added.clear();
                result.unchanged.push(report);
            }
            PlanAction::Create | PlanAction::Update { .. } => {
                let created = plan.action == PlanAction::Create;
                let outcome = if config.dry_run {
                    report.artwork = planned_artwork(plan, config);
                    log::info!(
                        "[dry run] Would {} '{}' (+{} titles)",
                        if created { "create" } else { "update" },
                        plan.grouping_name,
                        plan.members_to_add.len()
                    );
                    Ok(())
                } else {
                    apply_one(plan, config, library, artwork, ledger, &mut report).await
                };

                match outcome {
                    Ok(()) if created => result.created.push(report),
                    Ok(()) => result.updated.push(report),
                    Err(e) => {
                        log::warn!("Failed to apply '{}': {}", plan.grouping_name, e);
                        report.note = Some(e.to_string());
                        result.failed.push(report);
                    }
                }
            }
        }

        events.emit(RunEvent::Applied {
            done: idx + 1,
            total: plans.len(),
            name: plan.grouping_name.clone(),
        });
    }

    result
}

fn planned_artwork(plan: &ReconciliationPlan, config: &RunConfig) -> ArtworkChange {
    match (plan.needs_artwork, config.applies_artwork()) {
        (false, _) => ArtworkChange::None,
        (true, true) => ArtworkChange::Pending,
        (true, false) => ArtworkChange::Unavailable,
    }
}

/// Create the grouping, retrying like any other mutation.
///
/// A failed create may still have gone through on the server, so every
/// retry first looks for a grouping with the same name and adopts it.
async fn create_grouping<L: LibraryService>(
    library: &L,
    name: &str,
    config: &RunConfig,
) -> Result<String, ServiceError> {
    let label = format!("create grouping '{name}'");
    let attempted = Cell::new(false);
    let attempted = &attempted;

    with_retry(&config.retry, &label, || async move {
        if attempted.replace(true) {
            if let Some(existing) = find_grouping(library, name).await? {
                log::warn!(
                    "Grouping '{}' ({}) exists after a failed create; using it",
                    name,
                    existing
                );
                return Ok(existing);
            }
        }
        let id = library.create_grouping(name).await?;
        log::info!("Created grouping '{}' ({})", name, id);
        Ok(id)
    })
    .await
}

async fn find_grouping<L: LibraryService>(
    library: &L,
    name: &str,
) -> Result<Option<String>, ServiceError> {
    let key = match_key(name);
    let mut ids: Vec<String> = library
        .list_groupings()
        .await?
        .into_iter()
        .filter(|g| match_key(&g.name) == key)
        .map(|g| g.id)
        .collect();
    ids.sort();
    Ok(ids.into_iter().next())
}

async fn apply_one<L, A>(
    plan: &ReconciliationPlan,
    config: &RunConfig,
    library: &L,
    artwork: &A,
    ledger: &dyn CacheStore,
    report: &mut GroupingReport,
) -> Result<(), ServiceError>
where
    L: LibraryService,
    A: ArtworkSource,
{
    let name = plan.grouping_name.as_str();
    // Only titles that actually went in are reported as added.
    let added = std::mem::take(&mut report.added);

    let grouping_id = match &plan.action {
        PlanAction::Update { grouping_id } => grouping_id.clone(),
        _ => {
            let id = create_grouping(library, name, config).await?;
            report.grouping_id = Some(id.clone());
            id
        }
    };

    if !plan.members_to_add.is_empty() {
        let ids = ReconciliationPlan::member_server_ids(&plan.members_to_add);
        let label = format!("add members to '{name}'");
        with_retry(&config.retry, &label, || library.add_members(&grouping_id, &ids)).await?;
        log::info!("Added {} titles to '{}'", ids.len(), name);
        report.added = added;
    }

    report.artwork = planned_artwork(plan, config);
    if report.artwork != ArtworkChange::Pending {
        return Ok(());
    }
    let Some(poster) = &plan.collection.poster else {
        report.artwork = ArtworkChange::None;
        return Ok(());
    };

    let label = format!("fetch artwork for '{name}'");
    let image = with_retry(&config.retry, &label, || artwork.fetch_artwork(poster)).await?;
    let label = format!("upload artwork for '{name}'");
    with_retry(&config.retry, &label, || library.set_artwork(&grouping_id, &image)).await?;
    report.artwork = ArtworkChange::Applied;
    log::info!("Set artwork for '{}'", name);

    if let Err(e) = record_artwork(ledger, plan.collection.id, poster) {
        log::warn!("Could not record artwork for '{}': {}", name, e);
    }
    Ok(())
}
