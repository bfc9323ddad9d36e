mod common;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use boxsmith_core::{
    CatalogMode, ForwardMode, MemoryCache, RequestStatus, RunConfig, ServiceError, applied_artwork,
};
use boxsmith_lib::{
    ArtworkChange, EventSink, ForwardState, PlanAction, Reconciler, RunError, RunEvent, Stage,
    drive_with_events,
};

use common::*;

#[tokio::test]
async fn test_new_collection_is_created_and_gap_reported() {
    let library = FakeLibrary::with_movies(&[1, 2, 3]);
    let provider = FakeProvider::with(&[collection(10, "C", &[1, 2, 3, 4], None)]);
    let ledger = MemoryCache::new();
    let config = live_config();

    let report = Reconciler::new(&config, &library, &provider, &ledger)
        .run()
        .await
        .unwrap();

    assert_eq!(report.plans.len(), 1);
    assert_eq!(report.plans[0].action, PlanAction::Create);
    assert_eq!(report.apply.created.len(), 1);
    assert_eq!(
        report.apply.created[0].added,
        vec!["Movie 1", "Movie 2", "Movie 3"]
    );
    let grouping = library.grouping_named("C").unwrap();
    assert_eq!(grouping.member_ids.len(), 3);

    let missing: Vec<u64> = report.missing.missing.iter().map(|m| m.external_id.get()).collect();
    assert_eq!(missing, vec![4]);
}

#[tokio::test]
async fn test_existing_grouping_gets_only_the_delta() {
    let library = FakeLibrary::with_movies(&[1, 2, 3]);
    library.add_grouping("box-c", "C", &[1, 2], true);
    let provider = FakeProvider::with(&[collection(10, "C", &[1, 2, 3, 4], None)]);
    let ledger = MemoryCache::new();
    let config = live_config();

    let report = Reconciler::new(&config, &library, &provider, &ledger)
        .run()
        .await
        .unwrap();

    assert_eq!(
        report.plans[0].action,
        PlanAction::Update {
            grouping_id: "box-c".into()
        }
    );
    assert_eq!(report.apply.updated[0].added, vec!["Movie 3"]);
    assert_eq!(
        *library.mutations.borrow(),
        vec![Mutation::Add("box-c".into(), vec!["jf-3".into()])]
    );
}

#[tokio::test]
async fn test_complete_grouping_is_left_alone() {
    let library = FakeLibrary::with_movies(&[1, 2, 3]);
    library.add_grouping("box-c", "C", &[1, 2, 3], true);
    let provider = FakeProvider::with(&[collection(10, "C", &[1, 2, 3, 4], Some("/c.jpg"))]);
    let ledger = MemoryCache::new();
    let config = live_config();

    let report = Reconciler::new(&config, &library, &provider, &ledger)
        .with_artwork(FakeArtwork::default())
        .run()
        .await
        .unwrap();

    assert!(matches!(report.plans[0].action, PlanAction::Noop { .. }));
    assert_eq!(report.apply.unchanged.len(), 1);
    assert_eq!(library.mutation_count(), 0);
}

#[tokio::test]
async fn test_dry_run_reports_intent_without_mutating() {
    let library = FakeLibrary::with_movies(&[1, 2, 3]);
    let provider = FakeProvider::with(&[collection(10, "C", &[1, 2, 3, 4], Some("/c.jpg"))]);
    let ledger = MemoryCache::new();
    let config = RunConfig {
        catalog: boxsmith_core::CatalogMode::Live,
        ..RunConfig::default()
    };
    let artwork = FakeArtwork::default();

    let report = Reconciler::new(&config, &library, &provider, &ledger)
        .with_artwork(&artwork)
        .run()
        .await
        .unwrap();

    assert!(report.apply.dry_run);
    let created = &report.apply.created[0];
    assert_eq!(created.name, "C");
    assert_eq!(created.added, vec!["Movie 1", "Movie 2", "Movie 3"]);
    assert_eq!(created.artwork, ArtworkChange::Pending);
    assert_eq!(library.mutation_count(), 0);
    assert!(artwork.fetches.borrow().is_empty());
    assert_eq!(ledger.writes(), 0);
}

#[tokio::test]
async fn test_second_run_changes_nothing() {
    let library = FakeLibrary::with_movies(&[1, 2, 3, 20, 21]);
    let provider = FakeProvider::with(&[
        collection(10, "C", &[1, 2, 3, 4], Some("/c.jpg")),
        collection(11, "D: The Saga", &[20, 21], Some("/d.jpg")),
    ]);
    let ledger = MemoryCache::new();
    let config = RunConfig {
        catalog: boxsmith_core::CatalogMode::Live,
        ..live_config()
    };

    let first = Reconciler::new(&config, &library, &provider, &ledger)
        .with_artwork(FakeArtwork::default())
        .run()
        .await
        .unwrap();
    assert_eq!(first.apply.created.len(), 2);
    assert!(
        first
            .apply
            .created
            .iter()
            .all(|g| g.artwork == ArtworkChange::Applied)
    );
    assert!(library.grouping_named("D The Saga").unwrap().has_artwork);
    let mutations = library.mutation_count();

    let second = Reconciler::new(&config, &library, &provider, &ledger)
        .with_artwork(FakeArtwork::default())
        .run()
        .await
        .unwrap();
    assert_eq!(second.apply.unchanged.len(), 2);
    assert_eq!(second.summary().created + second.summary().updated, 0);
    assert_eq!(library.mutation_count(), mutations);
}

#[tokio::test]
async fn test_plans_do_not_depend_on_library_order() {
    let collections = [
        collection(10, "Beta", &[1, 2], None),
        collection(11, "alpha", &[3, 4], None),
    ];
    let config = RunConfig::default();
    let ledger = MemoryCache::new();

    let forward = FakeLibrary::with_movies(&[1, 2, 3, 4]);
    let reverse = FakeLibrary::with_movies(&[4, 3, 2, 1]);
    let provider = FakeProvider::with(&collections);
    let a = Reconciler::new(&config, &forward, &provider, &ledger)
        .run()
        .await
        .unwrap();
    let b = Reconciler::new(&config, &reverse, &provider, &ledger)
        .run()
        .await
        .unwrap();

    assert_eq!(a.plans, b.plans);
    let names: Vec<&str> = a.plans.iter().map(|p| p.grouping_name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "Beta"]);
}

#[tokio::test]
async fn test_missing_title_forwarded_once() {
    // 9 belongs to both collections and must be requested a single time.
    let library = FakeLibrary::with_movies(&[1, 2, 3, 4]);
    let provider = FakeProvider::with(&[
        collection(10, "C", &[1, 2, 9], None),
        collection(11, "D", &[3, 4, 9], None),
    ]);
    let ledger = MemoryCache::new();
    let requests = FakeRequests::default();
    let config = RunConfig {
        forward: ForwardMode::Send,
        ..live_config()
    };

    let report = Reconciler::new(&config, &library, &provider, &ledger)
        .with_requests(&requests)
        .run()
        .await
        .unwrap();
    assert_eq!(report.missing.missing.len(), 1);
    assert_eq!(report.summary().requests_sent, 1);
    assert_eq!(requests.creates.borrow().len(), 1);

    let again = Reconciler::new(&config, &library, &provider, &ledger)
        .with_requests(&requests)
        .run()
        .await
        .unwrap();
    let forward = again.forward.unwrap();
    assert_eq!(
        forward.already_requested[0].state,
        ForwardState::AlreadyRequested(RequestStatus::Pending)
    );
    assert_eq!(requests.creates.borrow().len(), 1);
}

#[tokio::test]
async fn test_dry_run_send_only_checks() {
    let library = FakeLibrary::with_movies(&[1, 2]);
    let provider = FakeProvider::with(&[collection(10, "C", &[1, 2, 3], None)]);
    let ledger = MemoryCache::new();
    let requests = FakeRequests::default();
    let config = RunConfig {
        forward: ForwardMode::Send,
        ..RunConfig::default()
    };

    let report = Reconciler::new(&config, &library, &provider, &ledger)
        .with_requests(&requests)
        .run()
        .await
        .unwrap();
    let forward = report.forward.unwrap();
    assert_eq!(forward.mode, ForwardMode::CheckOnly);
    assert_eq!(forward.eligible.len(), 1);
    assert!(requests.creates.borrow().is_empty());
}

#[tokio::test]
async fn test_failing_grouping_does_not_stop_the_run() {
    let mut library = FakeLibrary::with_movies(&[1, 2, 3, 4]);
    library.broken_names = vec!["Broken".into()];
    let provider = FakeProvider::with(&[
        collection(10, "Broken", &[1, 2], None),
        collection(11, "Fine", &[3, 4], None),
    ]);
    let ledger = MemoryCache::new();
    let config = live_config();

    let report = Reconciler::new(&config, &library, &provider, &ledger)
        .run()
        .await
        .unwrap();
    let summary = report.summary();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.created, 1);
    assert!(report.apply.failed[0].added.is_empty());
    assert!(report.apply.failed[0].note.is_some());
    assert!(library.grouping_named("Fine").is_some());
}

#[tokio::test]
async fn test_lost_create_response_adopts_the_new_grouping() {
    let library = FakeLibrary::with_movies(&[1, 2]);
    library.lost_creates.set(1);
    let provider = FakeProvider::with(&[collection(10, "C", &[1, 2], None)]);
    let ledger = MemoryCache::new();
    let config = live_config();

    let report = Reconciler::new(&config, &library, &provider, &ledger)
        .run()
        .await
        .unwrap();
    assert_eq!(report.apply.created.len(), 1);
    assert_eq!(report.apply.created[0].grouping_id.as_deref(), Some("box-1"));
    assert_eq!(library.grouping_count(), 1);
    assert_eq!(library.grouping_named("C").unwrap().member_ids.len(), 2);

    let again = Reconciler::new(&config, &library, &provider, &ledger)
        .run()
        .await
        .unwrap();
    assert_eq!(
        again.plans[0].action,
        PlanAction::Noop {
            grouping_id: "box-1".into()
        }
    );
}

#[tokio::test]
async fn test_transient_add_failures_are_retried() {
    let library = FakeLibrary::with_movies(&[1, 2]);
    library
        .add_failures
        .borrow_mut()
        .extend([ServiceError::Timeout, ServiceError::Server { status: 500 }]);
    let provider = FakeProvider::with(&[collection(10, "C", &[1, 2], None)]);
    let ledger = MemoryCache::new();
    let config = live_config();

    let report = Reconciler::new(&config, &library, &provider, &ledger)
        .run()
        .await
        .unwrap();
    assert_eq!(report.apply.created[0].added, vec!["Movie 1", "Movie 2"]);
    assert!(report.apply.failed.is_empty());
    assert_eq!(
        *library.mutations.borrow(),
        vec![
            Mutation::Create("C".into()),
            Mutation::Add("box-1".into(), vec!["jf-1".into(), "jf-2".into()]),
        ]
    );
}

#[tokio::test]
async fn test_artwork_failure_keeps_added_titles() {
    let library = FakeLibrary::with_movies(&[1, 2]);
    let provider = FakeProvider::with(&[collection(10, "C", &[1, 2], Some("/c.jpg"))]);
    let ledger = MemoryCache::new();
    let config = RunConfig {
        catalog: CatalogMode::Live,
        ..live_config()
    };
    let artwork = FakeArtwork {
        broken: true,
        ..FakeArtwork::default()
    };

    let report = Reconciler::new(&config, &library, &provider, &ledger)
        .with_artwork(&artwork)
        .run()
        .await
        .unwrap();
    assert!(report.apply.created.is_empty());
    let failed = &report.apply.failed[0];
    assert_eq!(failed.added, vec!["Movie 1", "Movie 2"]);
    assert_eq!(failed.grouping_id.as_deref(), Some("box-1"));
    assert!(failed.note.is_some());
    assert_eq!(library.grouping_named("C").unwrap().member_ids.len(), 2);
    assert_eq!(applied_artwork(&ledger, id(10)), None);
}

#[tokio::test]
async fn test_snapshot_mode_reports_artwork_unavailable() {
    let library = FakeLibrary::with_movies(&[1, 2]);
    let provider = FakeProvider::with(&[collection(10, "C", &[1, 2], Some("/c.jpg"))]);
    let ledger = MemoryCache::new();
    let config = live_config();
    let artwork = FakeArtwork::default();

    let report = Reconciler::new(&config, &library, &provider, &ledger)
        .with_artwork(&artwork)
        .run()
        .await
        .unwrap();
    assert!(report.plans[0].needs_artwork);
    assert_eq!(report.apply.created[0].artwork, ArtworkChange::Unavailable);
    assert!(artwork.fetches.borrow().is_empty());
    assert!(
        !library
            .mutations
            .borrow()
            .iter()
            .any(|m| matches!(m, Mutation::Artwork(_)))
    );
}

#[tokio::test]
async fn test_under_threshold_collection_forwards_nothing() {
    let library = FakeLibrary::with_movies(&[1]);
    let provider = FakeProvider::with(&[collection(10, "C", &[1, 2], None)]);
    let ledger = MemoryCache::new();
    let requests = FakeRequests::default();
    let config = RunConfig {
        forward: ForwardMode::Send,
        min_owned_members: 2,
        ..live_config()
    };

    let report = Reconciler::new(&config, &library, &provider, &ledger)
        .with_requests(&requests)
        .run()
        .await
        .unwrap();
    assert!(matches!(report.plans[0].action, PlanAction::Skip(_)));
    assert!(report.missing.missing.is_empty());
    assert!(requests.creates.borrow().is_empty());
}

#[tokio::test]
async fn test_unreachable_library_aborts() {
    let library = FakeLibrary::unreachable();
    let provider = FakeProvider::default();
    let ledger = MemoryCache::new();
    let config = live_config();

    let err = Reconciler::new(&config, &library, &provider, &ledger)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Library(_)));
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let library = FakeLibrary::with_movies(&[1, 2]);
    let provider = FakeProvider::default();
    let ledger = MemoryCache::new();
    let config = live_config();

    let err = Reconciler::new(&config, &library, &provider, &ledger)
        .with_cancel_flag(Arc::new(AtomicBool::new(true)))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Cancelled(Stage::Library)));
    assert!(provider.lookups.borrow().is_empty());
}

#[tokio::test]
async fn test_forwarding_without_service_is_a_config_error() {
    let library = FakeLibrary::with_movies(&[1]);
    let provider = FakeProvider::default();
    let ledger = MemoryCache::new();
    let config = RunConfig {
        forward: ForwardMode::CheckOnly,
        ..live_config()
    };

    let err = Reconciler::new(&config, &library, &provider, &ledger)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Config(_)));
}

#[tokio::test]
async fn test_events_cover_every_stage() {
    let library = FakeLibrary::with_movies(&[1, 2]);
    let provider = FakeProvider::with(&[collection(10, "C", &[1, 2], None)]);
    let ledger = MemoryCache::new();
    let config = RunConfig::default();
    let (sink, rx) = EventSink::channel();

    let reconciler = Reconciler::new(&config, &library, &provider, &ledger).with_events(sink);
    let mut events = Vec::new();
    let run = async move { reconciler.run().await };
    let report = drive_with_events(run, rx, |e| events.push(e)).await;

    assert!(report.is_ok());
    for stage in [Stage::Library, Stage::Resolve, Stage::Plan, Stage::Apply] {
        assert!(events.contains(&RunEvent::StageStarted(stage)));
    }
    assert!(!events.contains(&RunEvent::StageStarted(Stage::Forward)));
    assert_eq!(events.last(), Some(&RunEvent::Done));
}
