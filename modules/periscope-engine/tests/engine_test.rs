//! Behavioral tests for the detection orchestrator, driven entirely by
//! in-memory fakes — no network, no Postgres.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use uuid::Uuid;

use periscope_common::Priority;
use periscope_engine::testutil::{
    raw_connection, target_with_context, FailingReasoner, MemoryProfileStore, MemorySignalSink,
    StubReasoner, TestContext,
};
use periscope_engine::{ConnectionEngine, ConnectionReasoner, RunStatus};

fn engine(
    store: &Arc<MemoryProfileStore>,
    sink: &Arc<MemorySignalSink>,
    reasoner: Arc<dyn ConnectionReasoner>,
) -> ConnectionEngine {
    ConnectionEngine::new(
        store.clone(),
        sink.clone(),
        reasoner,
        1,
        Arc::new(AtomicBool::new(false)),
    )
}

/// Seed one organization with three overlapping targets.
fn seed_org(store: &MemoryProfileStore) -> Uuid {
    let org = store.seed_organization("Initrode");
    store.add_target(
        org,
        target_with_context(
            "Acme",
            Priority::High,
            TestContext::new().relationship("Foo").region("Pacific Northwest"),
        ),
    );
    store.add_target(
        org,
        target_with_context(
            "Globex",
            Priority::Medium,
            TestContext::new().relationship("Foo").region("Pacific Northwest"),
        ),
    );
    store.add_target(
        org,
        target_with_context("Hooli", Priority::Low, TestContext::new().topic("cloud")),
    );
    org
}

// ---------------------------------------------------------------------------
// Single-organization flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn valid_candidate_becomes_a_signal() {
    let store = Arc::new(MemoryProfileStore::new());
    let sink = Arc::new(MemorySignalSink::new());
    let org = seed_org(&store);

    let reasoner = Arc::new(StubReasoner::returning(vec![raw_connection(
        "shared_relationship",
        &["Acme", "Globex"],
        Some(0.7),
    )]));
    let engine = engine(&store, &sink, reasoner.clone());

    let report = engine.run_organization(org, None).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.targets_analyzed, 3);
    assert_eq!(report.connections_detected, 1);
    assert_eq!(report.signals_created, 1);
    assert!(report.errors.is_empty());
    assert_eq!(reasoner.call_count(), 1);

    let signals = sink.signals();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].organization_id, org);
    assert_eq!(signals[0].signal_type, "connection");
    assert_eq!(signals[0].signal_subtype, "shared_relationship");
    assert_eq!(signals[0].confidence_score, 70);
    assert_eq!(signals[0].primary_target_name, "Acme");
    assert_eq!(signals[0].related_target_names, vec!["Globex"]);
}

#[tokio::test]
async fn hallucinated_target_yields_zero_signals() {
    let store = Arc::new(MemoryProfileStore::new());
    let sink = Arc::new(MemorySignalSink::new());
    let org = seed_org(&store);

    // The reasoner proposes a connection naming "Initech", which is not
    // among the monitored targets. The whole candidate is dropped.
    let reasoner = Arc::new(StubReasoner::returning(vec![raw_connection(
        "market_convergence",
        &["Acme", "Initech"],
        Some(0.9),
    )]));
    let engine = engine(&store, &sink, reasoner);

    let report = engine.run_organization(org, None).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.connections_detected, 0);
    assert_eq!(report.signals_created, 0);
    assert!(sink.signals().is_empty());
}

#[tokio::test]
async fn single_target_skips_without_invoking_reasoner() {
    let store = Arc::new(MemoryProfileStore::new());
    let sink = Arc::new(MemorySignalSink::new());
    let org = store.seed_organization("Lone");
    store.add_target(
        org,
        target_with_context("Acme", Priority::High, TestContext::new().facts(5, 1)),
    );

    let reasoner = Arc::new(StubReasoner::returning(vec![raw_connection(
        "topic_overlap",
        &["Acme", "Acme"],
        Some(0.5),
    )]));
    let engine = engine(&store, &sink, reasoner.clone());

    let report = engine.run_organization(org, None).await.unwrap();

    assert_eq!(report.status, RunStatus::Skipped);
    assert_eq!(report.targets_analyzed, 1);
    assert_eq!(report.connections_detected, 0);
    assert_eq!(report.signals_created, 0);
    assert!(report.errors.is_empty());
    assert_eq!(reasoner.call_count(), 0, "gate must run before the reasoner");
}

#[tokio::test]
async fn gate_filters_on_accumulated_totals_not_just_fact_count() {
    let store = Arc::new(MemoryProfileStore::new());
    let sink = Arc::new(MemorySignalSink::new());
    let org = store.seed_organization("Thin");

    // Stored counter says 10, but the accumulated context has not caught up.
    let mut thin = target_with_context("Acme", Priority::High, TestContext::new().facts(0, 0));
    thin.fact_count = 10;
    store.add_target(org, thin);
    store.add_target(org, target_with_context("Globex", Priority::Low, TestContext::new()));

    let reasoner = Arc::new(StubReasoner::empty());
    let engine = engine(&store, &sink, reasoner.clone());

    let report = engine.run_organization(org, None).await.unwrap();

    assert_eq!(report.status, RunStatus::Skipped);
    assert_eq!(report.targets_analyzed, 1);
    assert_eq!(reasoner.call_count(), 0);
}

#[tokio::test]
async fn min_facts_override_tightens_the_gate() {
    let store = Arc::new(MemoryProfileStore::new());
    let sink = Arc::new(MemorySignalSink::new());
    let org = store.seed_organization("Sparse");
    store.add_target(
        org,
        target_with_context("Acme", Priority::High, TestContext::new().facts(3, 1)),
    );
    store.add_target(
        org,
        target_with_context("Globex", Priority::Low, TestContext::new().facts(3, 1)),
    );

    let reasoner = Arc::new(StubReasoner::empty());
    let engine = engine(&store, &sink, reasoner.clone());

    let report = engine.run_organization(org, Some(5)).await.unwrap();
    assert_eq!(report.status, RunStatus::Skipped);
    assert_eq!(reasoner.call_count(), 0);

    let report = engine.run_organization(org, Some(2)).await.unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(reasoner.call_count(), 1);
}

#[tokio::test]
async fn reasoning_failure_is_recovered_not_surfaced() {
    let store = Arc::new(MemoryProfileStore::new());
    let sink = Arc::new(MemorySignalSink::new());
    let org = seed_org(&store);

    let reasoners: Vec<Arc<dyn ConnectionReasoner>> = vec![
        Arc::new(FailingReasoner::engine()),
        Arc::new(FailingReasoner::timeout()),
        Arc::new(FailingReasoner::missing_payload()),
    ];
    for reasoner in reasoners {
        let engine = engine(&store, &sink, reasoner);
        let report = engine.run_organization(org, None).await.unwrap();

        // "No connections found" is a normal, successful outcome.
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.connections_detected, 0);
        assert_eq!(report.signals_created, 0);
        assert!(report.errors.is_empty());
    }
}

#[tokio::test]
async fn insert_failure_is_collected_and_remaining_writes_proceed() {
    let store = Arc::new(MemoryProfileStore::new());
    let sink = Arc::new(MemorySignalSink::new());
    let org = seed_org(&store);

    let doomed = raw_connection("competitive_clash", &["Acme", "Globex"], Some(0.8));
    let fine = raw_connection("topic_overlap", &["Globex", "Hooli"], Some(0.4));
    sink.fail_title(doomed.title.as_deref().unwrap());

    let reasoner = Arc::new(StubReasoner::returning(vec![doomed, fine]));
    let engine = engine(&store, &sink, reasoner);

    let report = engine.run_organization(org, None).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.connections_detected, 2);
    assert_eq!(report.signals_created, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("insert failed"));
    assert_eq!(sink.signals().len(), 1);
}

#[tokio::test]
async fn out_of_range_strength_is_clamped_into_the_signal() {
    let store = Arc::new(MemoryProfileStore::new());
    let sink = Arc::new(MemorySignalSink::new());
    let org = seed_org(&store);

    let reasoner = Arc::new(StubReasoner::returning(vec![raw_connection(
        "supply_chain",
        &["Acme", "Globex"],
        Some(2.0),
    )]));
    let engine = engine(&store, &sink, reasoner);

    engine.run_organization(org, None).await.unwrap();

    let signals = sink.signals();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].confidence_score, 95); // 0.95 after clamping
}

// ---------------------------------------------------------------------------
// All-organizations batch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn batch_runs_every_listed_organization() {
    let store = Arc::new(MemoryProfileStore::new());
    let sink = Arc::new(MemorySignalSink::new());

    let org_a = seed_org(&store);
    let org_b = store.seed_organization("Vandelay");
    store.add_target(
        org_b,
        target_with_context("Kramerica", Priority::Medium, TestContext::new().topic("latex")),
    );
    store.add_target(
        org_b,
        target_with_context("Pendant", Priority::Low, TestContext::new().topic("latex")),
    );
    // One target only — excluded from the batch at listing time.
    let org_c = store.seed_organization("Tiny");
    store.add_target(org_c, target_with_context("Solo", Priority::Low, TestContext::new()));

    let reasoner = Arc::new(StubReasoner::returning(vec![raw_connection(
        "topic_overlap",
        &["Kramerica", "Pendant"],
        Some(0.6),
    )]));
    let engine = engine(&store, &sink, reasoner.clone());

    let batch = engine.run_all(None).await.unwrap();

    assert_eq!(batch.organizations_processed, 2);
    // The candidate names only org B's targets; org A's run validates it
    // away, so exactly one signal lands.
    assert_eq!(batch.signals_created, 1);
    assert_eq!(reasoner.call_count(), 2);
    assert_eq!(sink.signals()[0].organization_id, org_b);
    let _ = org_a;
}

#[tokio::test]
async fn one_organizations_store_failure_does_not_stop_the_batch() {
    let store = Arc::new(MemoryProfileStore::new());
    let sink = Arc::new(MemorySignalSink::new());

    let broken = store.seed_organization("Broken");
    store.add_target(broken, target_with_context("A", Priority::Low, TestContext::new()));
    store.add_target(broken, target_with_context("B", Priority::Low, TestContext::new()));
    store.fail_targets_for(broken);

    let healthy = store.seed_organization("Healthy");
    store.add_target(
        healthy,
        target_with_context("Acme", Priority::High, TestContext::new().relationship("Foo")),
    );
    store.add_target(
        healthy,
        target_with_context("Globex", Priority::Low, TestContext::new().relationship("Foo")),
    );

    let reasoner = Arc::new(StubReasoner::returning(vec![raw_connection(
        "shared_relationship",
        &["Acme", "Globex"],
        Some(0.7),
    )]));
    let engine = engine(&store, &sink, reasoner);

    let batch = engine.run_all(None).await.unwrap();

    assert_eq!(batch.organizations_processed, 2);
    assert_eq!(batch.signals_created, 1);
    assert_eq!(batch.errors.len(), 1);
    assert!(batch.errors[0].contains(&broken.to_string()));
}

#[tokio::test]
async fn cancellation_stops_the_batch_between_organizations() {
    let store = Arc::new(MemoryProfileStore::new());
    let sink = Arc::new(MemorySignalSink::new());
    seed_org(&store);

    let reasoner = Arc::new(StubReasoner::empty());
    let cancelled = Arc::new(AtomicBool::new(true));
    let engine = ConnectionEngine::new(store.clone(), sink.clone(), reasoner.clone(), 1, cancelled);

    let batch = engine.run_all(None).await.unwrap();

    assert_eq!(batch.organizations_processed, 0);
    assert_eq!(reasoner.call_count(), 0);
}

#[tokio::test]
async fn reruns_append_rather_than_update() {
    let store = Arc::new(MemoryProfileStore::new());
    let sink = Arc::new(MemorySignalSink::new());
    let org = seed_org(&store);

    let reasoner = Arc::new(StubReasoner::returning(vec![raw_connection(
        "shared_relationship",
        &["Acme", "Globex"],
        Some(0.7),
    )]));
    let engine = engine(&store, &sink, reasoner);

    engine.run_organization(org, None).await.unwrap();
    engine.run_organization(org, None).await.unwrap();

    // Idempotence is not guaranteed at the storage layer: two runs, two rows.
    assert_eq!(sink.signals().len(), 2);
}
