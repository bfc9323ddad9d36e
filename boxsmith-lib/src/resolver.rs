//! Membership resolution: library items to canonical collections.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use boxsmith_core::{CanonicalCollection, CollectionProvider, ExternalId, LibraryItem, Lookup, RunConfig};
use futures::stream::{self, StreamExt};

use crate::events::{EventSink, RunEvent};

/// Why a library item did not make it into any collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    NoExternalId,
    NotFound,
    NoCollection,
    /// The collection has fewer canonical members than the threshold.
    TooSmall { members: usize },
    Failed(String),
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoExternalId => write!(f, "no TMDb id"),
            Self::NotFound => write!(f, "not found in catalog"),
            Self::NoCollection => write!(f, "not part of a collection"),
            Self::TooSmall { members } => write!(f, "collection has only {members} title(s)"),
            Self::Failed(msg) => write!(f, "lookup failed: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    pub item: LibraryItem,
    pub reason: UnresolvedReason,
}

/// Which collection each resolved library item belongs to.
///
/// Each catalog id maps to at most one collection; the first collection
/// seen for an id (and the first content seen for a collection id) wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedMembership {
    collections: BTreeMap<ExternalId, CanonicalCollection>,
    by_item: BTreeMap<ExternalId, ExternalId>,
    members: BTreeMap<ExternalId, Vec<LibraryItem>>,
    unresolved: Vec<Unresolved>,
}

impl ResolvedMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `item` as a member of `collection`. Returns `false` if the
    /// item has no catalog id or its id already maps to another collection.
    pub fn insert(&mut self, item: LibraryItem, collection: &CanonicalCollection) -> bool {
        let Some(id) = item.external_id else {
            return false;
        };
        match self.by_item.get(&id) {
            Some(existing) if *existing != collection.id => {
                log::warn!(
                    "TMDb {} already resolved to collection {}; ignoring {}",
                    id,
                    existing,
                    collection.id
                );
                return false;
            }
            Some(_) => {}
            None => {
                self.by_item.insert(id, collection.id);
            }
        }
        self.collections
            .entry(collection.id)
            .or_insert_with(|| collection.clone());
        let members = self.members.entry(collection.id).or_default();
        if !members.iter().any(|m| m.server_id == item.server_id) {
            members.push(item);
            members.sort_by(|a, b| a.server_id.cmp(&b.server_id));
        }
        true
    }

    pub fn mark_unresolved(&mut self, item: LibraryItem, reason: UnresolvedReason) {
        self.unresolved.push(Unresolved { item, reason });
    }

    pub fn collections(&self) -> impl Iterator<Item = &CanonicalCollection> {
        self.collections.values()
    }

    pub fn collection(&self, id: ExternalId) -> Option<&CanonicalCollection> {
        self.collections.get(&id)
    }

    /// Collection the catalog id resolved to.
    pub fn collection_for(&self, id: ExternalId) -> Option<&CanonicalCollection> {
        self.by_item.get(&id).and_then(|c| self.collections.get(c))
    }

    /// Library items in `collection`, ordered by server id.
    pub fn members_of(&self, collection: ExternalId) -> &[LibraryItem] {
        self.members
            .get(&collection)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn unresolved(&self) -> &[Unresolved] {
        &self.unresolved
    }

    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }

    /// Number of library items placed in a collection.
    pub fn resolved_items(&self) -> usize {
        self.members.values().map(Vec::len).sum()
    }
}

/// Resolve every library item through `provider`.
///
/// Each distinct catalog id is looked up once, with at most
/// `config.lookup_concurrency` lookups in flight; items sharing an id share
/// the result. Collections below `config.min_collection_size` canonical
/// members leave their items unresolved.
pub async fn resolve_all<P: CollectionProvider>(
    provider: &P,
    items: &[LibraryItem],
    config: &RunConfig,
    events: &EventSink,
) -> ResolvedMembership {
    let mut membership = ResolvedMembership::new();

    let ids: BTreeSet<ExternalId> = items.iter().filter_map(|i| i.external_id).collect();
    let total = ids.len();
    log::info!("Resolving {} distinct TMDb ids from {} items", total, items.len());

    let mut lookups: BTreeMap<ExternalId, Lookup> = BTreeMap::new();
    let mut results = stream::iter(ids)
        .map(|id| async move { (id, provider.resolve(id).await) })
        .buffer_unordered(config.lookup_concurrency.max(1));
    while let Some((id, lookup)) = results.next().await {
        lookups.insert(id, lookup);
        events.emit(RunEvent::Resolved {
            done: lookups.len(),
            total,
        });
    }

    let mut ordered: Vec<&LibraryItem> = items.iter().collect();
    ordered.sort_by(|a, b| a.server_id.cmp(&b.server_id));

    for item in ordered {
        let Some(id) = item.external_id else {
            log::debug!("'{}' has no TMDb id", item.title);
            membership.mark_unresolved(item.clone(), UnresolvedReason::NoExternalId);
            continue;
        };
        let reason = match lookups.get(&id) {
            Some(Lookup::Found(collection)) => {
                if collection.members.len() < config.min_collection_size {
                    UnresolvedReason::TooSmall {
                        members: collection.members.len(),
                    }
                } else if membership.insert(item.clone(), collection) {
                    continue;
                } else {
                    UnresolvedReason::NoCollection
                }
            }
            Some(Lookup::NoCollection) => UnresolvedReason::NoCollection,
            Some(Lookup::NotFound) => UnresolvedReason::NotFound,
            Some(Lookup::Failed(msg)) => {
                log::warn!("Could not resolve '{}' (TMDb {}): {}", item.title, id, msg);
                UnresolvedReason::Failed(msg.clone())
            }
            None => UnresolvedReason::Failed("no lookup result".into()),
        };
        membership.mark_unresolved(item.clone(), reason);
    }

    log::info!(
        "Resolved {} items into {} collections ({} unresolved)",
        membership.resolved_items(),
        membership.collection_count(),
        membership.unresolved().len()
    );
    membership
}

#[cfg(test)]
#[path = "tests/resolver_tests.rs"]
mod tests;
