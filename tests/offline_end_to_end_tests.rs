// End to end: monitor, store and orchestrator wired together, driven only
// by reachability edges, the way the shell wires them.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use brew_drafts::adapters::in_memory::in_memory_key_value_store::InMemoryKeyValueStore;
use brew_drafts::adapters::in_memory::in_memory_submit_brew::InMemorySubmitBrew;
use brew_drafts::application::connectivity::ConnectivityMonitor;
use brew_drafts::application::draft_store::DraftStore;
use brew_drafts::application::orchestrator::SyncOrchestrator;
use brew_drafts::core::ports::SubmitError;
use brew_drafts::core::sync::SyncEvent;
use chrono::Utc;
use common::BrewPayloadBuilder;
use rstest::rstest;

struct Rig {
    store: Arc<DraftStore<InMemoryKeyValueStore>>,
    remote: Arc<InMemorySubmitBrew>,
    monitor: Arc<ConnectivityMonitor>,
    orchestrator: Arc<SyncOrchestrator<InMemoryKeyValueStore, InMemorySubmitBrew>>,
    events: Arc<Mutex<Vec<SyncEvent>>>,
}

fn offline_rig() -> Rig {
    let store = Arc::new(DraftStore::new(Arc::new(InMemoryKeyValueStore::new())));
    let remote = Arc::new(InMemorySubmitBrew::new());
    let monitor = Arc::new(ConnectivityMonitor::new(false));
    let orchestrator = Arc::new(SyncOrchestrator::new(
        store.clone(),
        remote.clone(),
        monitor.clone(),
    ));

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    orchestrator
        .add_sync_listener(move |event| {
            sink.lock().unwrap().push(event.clone());
        })
        .forget();

    Rig {
        store,
        remote,
        monitor,
        orchestrator,
        events,
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within one second");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn it_should_drain_automatically_when_the_connection_comes_back() {
    let rig = offline_rig();
    let auto_sync = rig.orchestrator.start_auto_sync();

    rig.store
        .enqueue(BrewPayloadBuilder::new().name("flat white").build())
        .await
        .unwrap();
    rig.store
        .enqueue(BrewPayloadBuilder::new().name("lungo").build())
        .await
        .unwrap();
    assert_eq!(rig.store.pending_count().await.unwrap(), 2);
    assert_eq!(rig.remote.call_count().await, 0);

    let before = Utc::now();
    rig.monitor.report_reachability(true);

    let events = rig.events.clone();
    wait_until(move || events.lock().unwrap().len() >= 2).await;

    assert_eq!(
        *rig.events.lock().unwrap(),
        vec![
            SyncEvent::Started { drafts_count: 2 },
            SyncEvent::Completed { synced_count: 2 },
        ]
    );
    assert_eq!(rig.store.pending_count().await.unwrap(), 0);
    let info = rig.orchestrator.storage_info().await.unwrap();
    assert!(info.last_sync.unwrap() >= before);

    drop(auto_sync);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn it_should_recover_from_a_connectivity_flap_without_reordering() {
    let rig = offline_rig();
    let auto_sync = rig.orchestrator.start_auto_sync();

    let mut ids = Vec::new();
    for name in ["a", "b", "c"] {
        ids.push(
            rig.store
                .enqueue(BrewPayloadBuilder::new().name(name).build())
                .await
                .unwrap(),
        );
    }
    // The link dies mid-drain, on the second submit.
    rig.remote
        .fail_on_call(2, SubmitError::Network("connection reset".into()))
        .await;

    rig.monitor.report_reachability(true);
    let events = rig.events.clone();
    wait_until(move || events.lock().unwrap().len() >= 2).await;

    // The failed submit degraded the monitor itself.
    assert!(!rig.monitor.is_online());
    {
        let recorded = rig.events.lock().unwrap();
        assert_eq!(recorded[0], SyncEvent::Started { drafts_count: 3 });
        assert!(matches!(recorded[1], SyncEvent::Error { .. }));
    }
    assert_eq!(rig.store.pending_count().await.unwrap(), 2);

    // Second edge drains the remainder in the original order.
    rig.monitor.report_reachability(true);
    let events = rig.events.clone();
    wait_until(move || events.lock().unwrap().len() >= 4).await;

    {
        let recorded = rig.events.lock().unwrap();
        assert_eq!(recorded[2], SyncEvent::Started { drafts_count: 2 });
        assert_eq!(recorded[3], SyncEvent::Completed { synced_count: 2 });
    }
    assert_eq!(rig.store.pending_count().await.unwrap(), 0);
    assert_eq!(
        rig.remote.calls().await,
        vec![ids[0], ids[1], ids[1], ids[2]]
    );
    assert!(rig.store.last_sync().await.unwrap().is_some());

    drop(auto_sync);
}
