//! Diff between resolved membership and the server's groupings.
//!
//! Pure computation: no network calls, no mutation. The only extra input is
//! the artwork ledger, read to tell whether the canonical poster changed
//! since it was last applied.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use boxsmith_core::{
    CacheStore, CanonicalCollection, ExternalId, Grouping, LibraryItem, RunConfig,
    applied_artwork, grouping_name, match_key,
};

use crate::resolver::ResolvedMembership;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAction {
    Create,
    Update { grouping_id: String },
    Noop { grouping_id: String },
    Skip(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// More than one existing grouping has this name.
    AmbiguousName { grouping_ids: Vec<String> },
    /// Another canonical collection already claims this grouping name.
    NameCollision { with: ExternalId },
    /// Fewer library members than `min_owned_members`.
    TooFewOwned { owned: usize, required: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AmbiguousName { grouping_ids } => write!(
                f,
                "{} existing groupings share this name ({})",
                grouping_ids.len(),
                grouping_ids.join(", ")
            ),
            Self::NameCollision { with } => {
                write!(f, "name already used by TMDb collection {with}")
            }
            Self::TooFewOwned { owned, required } => {
                write!(f, "only {owned} owned title(s), need {required}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub collection: CanonicalCollection,
    /// Name the grouping has (or will have) on the server.
    pub grouping_name: String,
    pub action: PlanAction,
    /// Every library item resolved into the collection.
    pub members: Vec<LibraryItem>,
    /// Members the grouping does not contain yet.
    pub members_to_add: Vec<LibraryItem>,
    pub needs_artwork: bool,
}

impl ReconciliationPlan {
    pub fn grouping_id(&self) -> Option<&str> {
        match &self.action {
            PlanAction::Update { grouping_id } | PlanAction::Noop { grouping_id } => {
                Some(grouping_id)
            }
            _ => None,
        }
    }

    pub fn member_server_ids(items: &[LibraryItem]) -> Vec<String> {
        items.iter().map(|i| i.server_id.clone()).collect()
    }
}

/// Build one plan entry per collection, ordered by grouping name and then
/// collection id.
pub fn plan(
    membership: &ResolvedMembership,
    groupings: &[Grouping],
    ledger: &dyn CacheStore,
    config: &RunConfig,
) -> Vec<ReconciliationPlan> {
    let mut by_name: HashMap<String, Vec<&Grouping>> = HashMap::new();
    for grouping in groupings {
        by_name.entry(match_key(&grouping.name)).or_default().push(grouping);
    }

    // Collections claiming each normalized name, lowest id first.
    let mut claims: BTreeMap<String, Vec<ExternalId>> = BTreeMap::new();
    for collection in membership.collections() {
        claims
            .entry(match_key(&collection.name))
            .or_default()
            .push(collection.id);
    }

    let mut plans: Vec<ReconciliationPlan> = membership
        .collections()
        .filter(|c| !membership.members_of(c.id).is_empty())
        .map(|collection| {
            let key = match_key(&collection.name);
            let members = membership.members_of(collection.id).to_vec();
            let name = grouping_name(&collection.name);
            let owner = claims.get(&key).and_then(|ids| ids.iter().min().copied());

            let skip = |reason: SkipReason| ReconciliationPlan {
                collection: collection.clone(),
                grouping_name: name.clone(),
                action: PlanAction::Skip(reason),
                members: members.clone(),
                members_to_add: Vec::new(),
                needs_artwork: false,
            };

            if let Some(owner) = owner.filter(|o| *o != collection.id) {
                log::warn!(
                    "'{}' (TMDb {}) has the same grouping name as TMDb {}; skipping",
                    collection.name,
                    collection.id,
                    owner
                );
                return skip(SkipReason::NameCollision { with: owner });
            }

            if members.len() < config.min_owned_members {
                return skip(SkipReason::TooFewOwned {
                    owned: members.len(),
                    required: config.min_owned_members,
                });
            }

            let candidates = by_name.get(&key).map(Vec::as_slice).unwrap_or_default();
            match candidates {
                [] => ReconciliationPlan {
                    collection: collection.clone(),
                    grouping_name: name.clone(),
                    action: PlanAction::Create,
                    members_to_add: members.clone(),
                    needs_artwork: collection.poster.is_some(),
                    members: members.clone(),
                },
                [existing] => {
                    let members_to_add: Vec<LibraryItem> = members
                        .iter()
                        .filter(|m| !existing.member_ids.contains(&m.server_id))
                        .cloned()
                        .collect();
                    let needs_artwork = artwork_needed(collection, existing, ledger);
                    let grouping_id = existing.id.clone();
                    let action = if members_to_add.is_empty() && !needs_artwork {
                        PlanAction::Noop { grouping_id }
                    } else {
                        PlanAction::Update { grouping_id }
                    };
                    ReconciliationPlan {
                        collection: collection.clone(),
                        grouping_name: name.clone(),
                        action,
                        members,
                        members_to_add,
                        needs_artwork,
                    }
                }
                many => {
                    let mut grouping_ids: Vec<String> = many.iter().map(|g| g.id.clone()).collect();
                    grouping_ids.sort();
                    log::warn!(
                        "{} groupings are named '{}'; leaving them alone",
                        grouping_ids.len(),
                        name
                    );
                    skip(SkipReason::AmbiguousName { grouping_ids })
                }
            }
        })
        .collect();

    plans.sort_by(|a, b| {
        a.grouping_name
            .to_lowercase()
            .cmp(&b.grouping_name.to_lowercase())
            .then(a.collection.id.cmp(&b.collection.id))
    });
    plans
}

/// Artwork is due when the grouping has none, or when the poster recorded
/// as applied differs from the canonical one.
fn artwork_needed(collection: &CanonicalCollection, existing: &Grouping, ledger: &dyn CacheStore) -> bool {
    let Some(poster) = &collection.poster else {
        return false;
    };
    if !existing.has_artwork {
        return true;
    }
    applied_artwork(ledger, collection.id).is_some_and(|applied| applied != *poster)
}

#[cfg(test)]
#[path = "tests/planner_tests.rs"]
mod tests;
