//! Background sync lifecycle.

mod common;

use common::{fault, seeded_store, service, update_to, ScriptedRemote};
use faultsync_client::MIN_AUTO_SYNC_INTERVAL;
use faultsync_engine::FetchResponse;
use std::sync::Arc;
use std::time::Duration;

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn auto_sync_runs_immediately_and_stops() {
    let store = seeded_store(&[fault("A", "E1")], Some("1.0.0"), 48).await;
    let remote = Arc::new(
        ScriptedRemote::new()
            .with_check(update_to("1.1.0", 1))
            .with_fetch(FetchResponse::delta("1.1.0", vec![fault("B", "E2")], vec![])),
    );
    let service = service(&store, &remote);

    service.start_auto_sync(Duration::from_secs(3600));
    assert_eq!(service.auto_sync_interval(), Some(Duration::from_secs(3600)));

    wait_for(|| remote.fetch_calls() == 1).await;
    wait_for(|| !service.is_sync_in_progress()).await;
    assert_eq!(store.count().await.unwrap(), 2);

    service.stop_auto_sync();
    assert_eq!(service.auto_sync_interval(), None);

    // Stopping twice is harmless.
    service.stop_auto_sync();
}

#[tokio::test]
async fn restarting_replaces_interval() {
    let store = seeded_store(&[], Some("1.0.0"), 0).await;
    let remote = Arc::new(ScriptedRemote::new());
    let service = service(&store, &remote);

    service.start_auto_sync(Duration::from_secs(3600));
    service.start_auto_sync(Duration::from_secs(7200));
    assert_eq!(service.auto_sync_interval(), Some(Duration::from_secs(7200)));

    // Fresh store: the immediate tick short-circuits without the network.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(remote.check_calls(), 0);

    service.stop_auto_sync();
}

#[tokio::test]
async fn zero_interval_is_raised_to_minimum() {
    let store = seeded_store(&[], Some("1.0.0"), 0).await;
    let remote = Arc::new(ScriptedRemote::new());
    let service = service(&store, &remote);

    service.start_auto_sync(Duration::ZERO);

    // The task is still alive after its first tick.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(service.auto_sync_interval(), Some(MIN_AUTO_SYNC_INTERVAL));

    service.stop_auto_sync();
}
