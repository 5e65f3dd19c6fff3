use super::support::*;
use self_healing_connection::FaultKind;

#[tokio::test]
async fn transport_closed_mid_burst() {
    let (store, server) = store("burst").await;
    let mut events = store.subscribe();

    // Call #5 of the burst finds the socket closed. The reconnect is parked
    // until the whole burst has been dispatched.
    server.close_on_call(5);
    server.hold_connects();

    let calls: Vec<_> = (0..10)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { id(&store).await })
        })
        .collect();

    let mut succeeded = 0;
    let mut failed = 0;
    for call in calls {
        match call.await.unwrap() {
            // Served by the pre-fault connection.
            Ok(connection) => {
                assert_eq!(connection, 0);
                succeeded += 1;
            }
            // Hit the closed connection before the swap; same error.
            Err(error) => {
                assert_eq!(error, StoreError::Closed);
                failed += 1;
            }
        }
    }
    assert_eq!(succeeded, 4);
    assert_eq!(failed, 6);

    server.release_connects();

    let event = events.recv().await.unwrap();
    assert_eq!(event.generation, 0);
    assert_eq!(event.new_generation, 1);
    assert_eq!(event.kind, FaultKind::TransportClosed);
    assert_eq!(event.operation, "ID");

    // Exactly one reconnect cycle ran.
    assert_eq!(store.state().reconnects_started(), 1);
    assert_eq!(server.connections(), 2);
    assert_eq!(store.state().fault_count(), 6);

    // Everything after the swap is served by the new connection.
    let after: Vec<_> = (0..10)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { id(&store).await })
        })
        .collect();
    for call in after {
        assert_eq!(call.await.unwrap(), Ok(1));
    }

    assert!(events.try_recv().unwrap().is_none());
}

#[tokio::test]
async fn data_survives_reconnect() {
    let (store, _server) = store("durable").await;
    let mut events = store.subscribe();

    set(&store, "user", "alice").await.unwrap();
    break_connection(&store).await.unwrap_err();
    events.recv().await.unwrap();

    // The server keeps the data; only the connection was replaced.
    assert_eq!(get(&store, "user").await.unwrap(), "alice");
    assert_eq!(store.generation(), 1);
}
