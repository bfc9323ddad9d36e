use std::cell::RefCell;
use std::collections::HashMap;

use boxsmith_core::CollectionMember;

use super::*;

fn id(n: u64) -> ExternalId {
    ExternalId::new(n)
}

fn collection(cid: u64, name: &str, members: &[u64]) -> CanonicalCollection {
    CanonicalCollection {
        id: id(cid),
        name: name.into(),
        members: members
            .iter()
            .map(|&m| CollectionMember {
                id: id(m),
                title: format!("Movie {m}"),
                release_date: None,
            })
            .collect(),
        poster: None,
    }
}

fn item(server: &str, ext: Option<u64>) -> LibraryItem {
    LibraryItem::new(server, ext.map(id), &format!("Item {server}"))
}

#[derive(Default)]
struct MapProvider {
    lookups: HashMap<ExternalId, Lookup>,
    calls: RefCell<Vec<ExternalId>>,
}

impl CollectionProvider for MapProvider {
    async fn resolve(&self, id: ExternalId) -> Lookup {
        self.calls.borrow_mut().push(id);
        self.lookups.get(&id).cloned().unwrap_or(Lookup::NotFound)
    }
}

#[tokio::test]
async fn test_groups_items_and_records_unresolved() {
    let matrix = collection(2344, "The Matrix Collection", &[603, 604, 605]);
    let mut provider = MapProvider::default();
    provider.lookups.insert(id(603), Lookup::Found(matrix.clone()));
    provider.lookups.insert(id(604), Lookup::Found(matrix.clone()));
    provider.lookups.insert(id(550), Lookup::NoCollection);
    provider.lookups.insert(id(7), Lookup::Failed("timeout".into()));

    let items = vec![
        item("b", Some(604)),
        item("a", Some(603)),
        item("c", None),
        item("d", Some(550)),
        item("e", Some(7)),
        item("f", Some(8)),
    ];
    let membership = resolve_all(&provider, &items, &RunConfig::default(), &EventSink::default()).await;

    assert_eq!(membership.collection_count(), 1);
    let members: Vec<&str> = membership
        .members_of(id(2344))
        .iter()
        .map(|m| m.server_id.as_str())
        .collect();
    assert_eq!(members, vec!["a", "b"]);
    assert_eq!(membership.collection_for(id(604)).unwrap().id, id(2344));

    let reasons: Vec<(&str, &UnresolvedReason)> = membership
        .unresolved()
        .iter()
        .map(|u| (u.item.server_id.as_str(), &u.reason))
        .collect();
    assert_eq!(
        reasons,
        vec![
            ("c", &UnresolvedReason::NoExternalId),
            ("d", &UnresolvedReason::NoCollection),
            ("e", &UnresolvedReason::Failed("timeout".into())),
            ("f", &UnresolvedReason::NotFound),
        ]
    );
}

#[tokio::test]
async fn test_each_id_is_looked_up_once() {
    let matrix = collection(2344, "The Matrix Collection", &[603, 604]);
    let mut provider = MapProvider::default();
    provider.lookups.insert(id(603), Lookup::Found(matrix));

    // Two copies of the same movie (e.g. 4K and HD versions).
    let items = vec![item("a", Some(603)), item("a4k", Some(603))];
    let membership = resolve_all(&provider, &items, &RunConfig::default(), &EventSink::default()).await;

    assert_eq!(provider.calls.borrow().len(), 1);
    assert_eq!(membership.members_of(id(2344)).len(), 2);
}

#[tokio::test]
async fn test_single_title_collection_is_unresolved() {
    let mut provider = MapProvider::default();
    provider
        .lookups
        .insert(id(1), Lookup::Found(collection(10, "Solo", &[1])));

    let membership = resolve_all(
        &provider,
        &[item("a", Some(1))],
        &RunConfig::default(),
        &EventSink::default(),
    )
    .await;
    assert_eq!(membership.collection_count(), 0);
    assert_eq!(
        membership.unresolved()[0].reason,
        UnresolvedReason::TooSmall { members: 1 }
    );
}

#[tokio::test]
async fn test_progress_events() {
    let matrix = collection(2344, "The Matrix Collection", &[603, 604]);
    let mut provider = MapProvider::default();
    provider.lookups.insert(id(603), Lookup::Found(matrix.clone()));
    provider.lookups.insert(id(604), Lookup::Found(matrix));

    let (sink, mut rx) = EventSink::channel();
    let items = vec![item("a", Some(603)), item("b", Some(604))];
    resolve_all(&provider, &items, &RunConfig::default(), &sink).await;
    drop(sink);

    let mut last = None;
    while let Some(event) = rx.recv().await {
        last = Some(event);
    }
    assert_eq!(last, Some(RunEvent::Resolved { done: 2, total: 2 }));
}

#[test]
fn test_first_collection_wins() {
    let mut membership = ResolvedMembership::new();
    let a = collection(1, "A", &[5, 6]);
    let b = collection(2, "B", &[5, 7]);
    assert!(membership.insert(item("x", Some(5)), &a));
    assert!(!membership.insert(item("x", Some(5)), &b));
    assert_eq!(membership.collection_for(id(5)).unwrap().id, id(1));
    assert!(membership.collection(id(2)).is_none());
}
