//! Canonical members the library does not own.

use std::collections::{BTreeSet, HashSet};

use boxsmith_core::{CanonicalCollection, ExternalId, LibraryItem, MissingItem, RunConfig};

use crate::planner::{PlanAction, ReconciliationPlan, SkipReason};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingReport {
    /// Titles to consider forwarding, deduplicated by catalog id.
    pub missing: Vec<MissingItem>,
    /// Titles held back because they release after the current year.
    pub unreleased: Vec<MissingItem>,
}

/// Collect canonical members absent from the library.
///
/// Only collections the library owns enough of count: a plan skipped for
/// too few owned titles contributes nothing. Ownership is checked against
/// every catalog id in the library, resolved or not. Collections are
/// visited in name order (then id) and a title listed by several
/// collections is attributed to the first one.
pub fn find_missing(
    plans: &[ReconciliationPlan],
    library: &[LibraryItem],
    config: &RunConfig,
    current_year: i32,
) -> MissingReport {
    let owned: HashSet<ExternalId> = library.iter().filter_map(|i| i.external_id).collect();

    let mut collections: Vec<&CanonicalCollection> = plans
        .iter()
        .filter(|p| !matches!(p.action, PlanAction::Skip(SkipReason::TooFewOwned { .. })))
        .map(|p| &p.collection)
        .collect();
    collections.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then(a.id.cmp(&b.id))
    });

    let mut seen: BTreeSet<ExternalId> = BTreeSet::new();
    let mut report = MissingReport::default();
    for collection in collections {
        for member in &collection.members {
            if owned.contains(&member.id) || !seen.insert(member.id) {
                continue;
            }
            let item = MissingItem {
                external_id: member.id,
                title: if member.title.is_empty() {
                    format!("TMDb {}", member.id)
                } else {
                    member.title.clone()
                },
                source_collection: collection.name.clone(),
                release_year: member.release_year(),
            };
            if config.skip_unreleased && item.release_year.is_some_and(|y| y > current_year) {
                log::info!(
                    "Skipping unreleased '{}' (TMDb {}, {})",
                    item.title,
                    item.external_id,
                    item.release_year.unwrap_or_default()
                );
                report.unreleased.push(item);
            } else {
                report.missing.push(item);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use boxsmith_core::{CollectionMember, MemoryCache};

    use super::*;
    use crate::planner;
    use crate::resolver::ResolvedMembership;

    fn id(n: u64) -> ExternalId {
        ExternalId::new(n)
    }

    fn member(n: u64, date: Option<&str>) -> CollectionMember {
        CollectionMember {
            id: id(n),
            title: format!("Movie {n}"),
            release_date: date.map(str::to_string),
        }
    }

    fn owned(n: u64) -> LibraryItem {
        LibraryItem::new(format!("jf-{n}"), Some(id(n)), "x")
    }

    fn plans(membership: &ResolvedMembership, config: &RunConfig) -> Vec<ReconciliationPlan> {
        planner::plan(membership, &[], &MemoryCache::new(), config)
    }

    #[test]
    fn test_missing_members_are_reported() {
        let c = CanonicalCollection {
            id: id(10),
            name: "C".into(),
            members: vec![member(1, None), member(2, None), member(3, None), member(4, None)],
            poster: None,
        };
        let library: Vec<LibraryItem> = (1..=3).map(owned).collect();
        let mut membership = ResolvedMembership::new();
        for item in &library {
            membership.insert(item.clone(), &c);
        }

        let config = RunConfig::default();
        let report = find_missing(&plans(&membership, &config), &library, &config, 2026);
        let ids: Vec<ExternalId> = report.missing.iter().map(|m| m.external_id).collect();
        assert_eq!(ids, vec![id(4)]);
        assert_eq!(report.missing[0].source_collection, "C");
    }

    #[test]
    fn test_dedup_and_unreleased_and_unresolved_owned() {
        let a = CanonicalCollection {
            id: id(1),
            name: "Alpha".into(),
            members: vec![member(1, None), member(5, Some("2099-01-01")), member(6, None)],
            poster: None,
        };
        let b = CanonicalCollection {
            id: id(2),
            name: "Beta".into(),
            members: vec![member(2, None), member(6, None), member(7, Some("2001-05-01"))],
            poster: None,
        };
        let mut library = vec![owned(1), owned(2)];
        // Owned but resolved to nothing this run.
        library.push(owned(7));
        let mut membership = ResolvedMembership::new();
        membership.insert(owned(1), &a);
        membership.insert(owned(2), &b);

        let config = RunConfig::default();
        let report = find_missing(&plans(&membership, &config), &library, &config, 2026);
        let missing: Vec<(ExternalId, &str)> = report
            .missing
            .iter()
            .map(|m| (m.external_id, m.source_collection.as_str()))
            .collect();
        assert_eq!(missing, vec![(id(6), "Alpha")]);
        assert_eq!(report.unreleased.len(), 1);
        assert_eq!(report.unreleased[0].external_id, id(5));

        let keep_all = RunConfig {
            skip_unreleased: false,
            ..RunConfig::default()
        };
        let report = find_missing(&plans(&membership, &keep_all), &library, &keep_all, 2026);
        assert_eq!(report.missing.len(), 2);
        assert!(report.unreleased.is_empty());
    }

    #[test]
    fn test_collections_below_owned_threshold_are_ignored() {
        let small = CanonicalCollection {
            id: id(10),
            name: "Small".into(),
            members: vec![member(1, None), member(2, None)],
            poster: None,
        };
        let big = CanonicalCollection {
            id: id(20),
            name: "Big".into(),
            members: vec![member(3, None), member(4, None), member(5, None)],
            poster: None,
        };
        let library = vec![owned(1), owned(3), owned(4)];
        let mut membership = ResolvedMembership::new();
        membership.insert(owned(1), &small);
        membership.insert(owned(3), &big);
        membership.insert(owned(4), &big);

        let config = RunConfig {
            min_owned_members: 2,
            ..RunConfig::default()
        };
        let report = find_missing(&plans(&membership, &config), &library, &config, 2026);
        let ids: Vec<ExternalId> = report.missing.iter().map(|m| m.external_id).collect();
        assert_eq!(ids, vec![id(5)]);
    }
}
