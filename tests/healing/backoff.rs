use super::support::*;
use self_healing_connection::{ConnectionState, FaultReport, ReconnectPolicy};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn delays_are_non_decreasing_up_to_cap() {
    let timeline = Arc::new(Mutex::new(Vec::new()));
    let t = Arc::clone(&timeline);

    let config = config_builder("backoff")
        .policy(ReconnectPolicy::exponential(
            Duration::from_millis(100),
            Duration::from_millis(250),
        ))
        .on_reconnect_failed(move |attempt, delay| {
            t.lock().unwrap().push(format!("failed {attempt} {}ms", delay.as_millis()));
        })
        .build();
    let (store, server) = store_with(config).await;
    server.refuse_connects(3);

    let mut events = store.subscribe();
    let t = Arc::clone(&timeline);
    let observer = tokio::spawn(async move {
        let event = events.recv().await.unwrap();
        t.lock().unwrap().push("event".to_string());
        event
    });

    break_connection(&store).await.unwrap_err();
    let event = observer.await.unwrap();
    assert_eq!(event.attempts, 4);
    assert_eq!(event.new_generation, 1);

    // No event until the successful attempt.
    assert_eq!(
        *timeline.lock().unwrap(),
        vec!["failed 1 100ms", "failed 2 200ms", "failed 3 250ms", "event"]
    );

    // The initial connect plus four reconnect attempts.
    let times = server.connect_times();
    assert_eq!(times.len(), 5);
    let gaps: Vec<Duration> = times[1..].windows(2).map(|w| w[1] - w[0]).collect();
    assert_eq!(gaps.len(), 3);
    for pair in gaps.windows(2) {
        assert!(pair[0] <= pair[1], "gaps decreased: {:?}", gaps);
    }
    for gap in &gaps {
        assert!(*gap >= Duration::from_millis(100));
        assert!(*gap <= Duration::from_millis(260), "gap {:?} above cap", gap);
    }

    assert_eq!(store.connection_state(), ConnectionState::Healthy);
    assert_eq!(store.state().attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn reconnect_retries_indefinitely_by_default() {
    let (store, server) = store("forever").await;
    server.refuse_connects(50);
    let mut events = store.subscribe();

    break_connection(&store).await.unwrap_err();
    let event = events.recv().await.unwrap();

    assert_eq!(event.attempts, 51);
    assert_eq!(server.connections(), 2);
}

#[tokio::test(start_paused = true)]
async fn state_is_faulted_between_attempts() {
    let config = config_builder("between")
        .policy(ReconnectPolicy::fixed(Duration::from_secs(10)))
        .build();
    let (store, server) = store_with(config).await;
    server.refuse_connects(1);

    break_connection(&store).await.unwrap_err();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(store.connection_state(), ConnectionState::Faulted);
    assert_eq!(store.state().attempts(), 1);
    assert_eq!(store.generation(), 0);

    // A fault during the wait joins the running cycle.
    let forwarded = store
        .execute_tagged("ID", |conn| Box::pin(conn.id()))
        .await;
    assert_eq!(forwarded.report, Some(FaultReport::Joined));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(store.generation(), 1);
    assert_eq!(store.connection_state(), ConnectionState::Healthy);
}

#[tokio::test(start_paused = true)]
async fn bounded_cycle_is_abandoned_and_restartable() {
    let abandoned = Arc::new(AtomicU32::new(0));
    let a = Arc::clone(&abandoned);
    let config = config_builder("bounded")
        .max_attempts(3)
        .on_reconnect_abandoned(move |attempts| {
            a.store(attempts, Ordering::SeqCst);
        })
        .build();
    let (store, server) = store_with(config).await;
    server.refuse_connects(3);
    let mut events = store.subscribe();

    break_connection(&store).await.unwrap_err();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(abandoned.load(Ordering::SeqCst), 3);
    assert_eq!(store.connection_state(), ConnectionState::Faulted);
    assert_eq!(store.generation(), 0);
    assert!(events.try_recv().unwrap().is_none());

    // The next fault at the same generation starts a fresh cycle.
    let forwarded = store
        .execute_tagged("ID", |conn| Box::pin(conn.id()))
        .await;
    assert_eq!(forwarded.report, Some(FaultReport::Claimed));

    let event = events.recv().await.unwrap();
    assert_eq!(event.generation, 0);
    assert_eq!(event.new_generation, 1);
    assert_eq!(store.state().reconnects_started(), 2);
}

#[tokio::test(start_paused = true)]
async fn dropping_connection_stops_reconnect() {
    let (store, server) = store("dropped").await;
    server.refuse_connects(u32::MAX);

    break_connection(&store).await.unwrap_err();
    tokio::time::sleep(Duration::from_millis(55)).await;
    let before = server.connect_times().len();

    drop(store);
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(server.connect_times().len() <= before + 1);
}
