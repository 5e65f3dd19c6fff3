use super::support::*;
use self_healing_connection::{FaultKind, FaultReport};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_faults_start_one_reconnect() {
    let attempts = Arc::new(AtomicU32::new(0));
    let a = Arc::clone(&attempts);
    let config = config_builder("single-flight")
        .on_reconnect_attempt(move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    let (store, server) = store_with(config).await;
    let mut events = store.subscribe();

    // Park the reconnect so every caller observes generation 0.
    server.hold_connects();
    store.current().close();

    let callers: Vec<_> = (0..50)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .execute_tagged("ID", |conn| Box::pin(conn.id()))
                    .await
            })
        })
        .collect();

    let mut claimed = 0;
    let mut joined = 0;
    for caller in callers {
        let forwarded = caller.await.unwrap();
        assert_eq!(forwarded.generation, 0);
        assert_eq!(forwarded.result, Err(StoreError::Closed));
        match forwarded.report {
            Some(FaultReport::Claimed) => claimed += 1,
            Some(FaultReport::Joined) => joined += 1,
            other => panic!("unexpected report {:?}", other),
        }
    }
    assert_eq!(claimed, 1);
    assert_eq!(joined, 49);

    server.release_connects();
    let event = events.recv().await.unwrap();
    assert_eq!(event.generation, 0);
    assert_eq!(event.new_generation, 1);

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(server.connections(), 2);
    assert_eq!(store.state().reconnects_started(), 1);
    assert_eq!(store.state().reconnects_completed(), 1);
    assert_eq!(store.state().fault_count(), 50);
    assert_eq!(store.state().joined_reports(), 49);
    assert!(events.try_recv().unwrap().is_none());
}

#[tokio::test]
async fn stale_report_is_ignored() {
    let (store, server) = store("stale").await;
    let mut events = store.subscribe();

    break_connection(&store).await.unwrap_err();
    events.recv().await.unwrap();
    assert_eq!(store.generation(), 1);

    // A caller that captured generation 0 reports late.
    let report = store
        .coordinator()
        .report_fault(0, "GET", FaultKind::TransportClosed);
    assert_eq!(report, FaultReport::Stale);

    tokio::task::yield_now().await;
    assert_eq!(store.generation(), 1);
    assert_eq!(server.connections(), 2);
    assert_eq!(store.state().reconnects_started(), 1);
    assert_eq!(store.state().stale_reports(), 1);
    assert!(events.try_recv().unwrap().is_none());
}

#[tokio::test]
async fn in_flight_call_on_old_connection_reports_stale() {
    let (store, server) = store("in-flight").await;
    let mut events = store.subscribe();

    // Capture generation 0 before the swap.
    let old = store.current();
    break_connection(&store).await.unwrap_err();
    events.recv().await.unwrap();

    // The old connection is still alive for whoever holds it.
    assert_eq!(old.generation(), 0);
    assert_eq!(old.id().await, Err(StoreError::Closed));

    let report = store
        .coordinator()
        .report_fault(old.generation(), "ID", FaultKind::TransportClosed);
    assert_eq!(report, FaultReport::Stale);
    assert_eq!(server.connections(), 2);
}

#[tokio::test]
async fn each_generation_reconnects_once() {
    let (store, server) = store("generations").await;
    let mut events = store.subscribe();

    for generation in 0..3u64 {
        assert_eq!(store.generation(), generation);
        break_connection(&store).await.unwrap_err();
        let event = events.recv().await.unwrap();
        assert_eq!(event.generation, generation);
        assert_eq!(event.new_generation, generation + 1);
    }

    assert_eq!(server.connections(), 4);
    assert_eq!(id(&store).await, Ok(3));
}

#[tokio::test]
async fn report_for_future_generation_is_ignored() {
    let (store, server) = store("future").await;

    let report = store
        .coordinator()
        .report_fault(7, "GET", FaultKind::TransportClosed);
    assert_eq!(report, FaultReport::Stale);

    tokio::task::yield_now().await;
    assert_eq!(store.generation(), 0);
    assert_eq!(server.connections(), 1);
}
