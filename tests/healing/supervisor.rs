use super::support::*;
use futures::StreamExt;
use self_healing_connection::{ConnectionState, ConnectionSupervisor, SupervisorError};

async fn supervised(names: &[&str]) -> ConnectionSupervisor<MockConnector> {
    let supervisor = ConnectionSupervisor::new();
    for name in names {
        let (store, _server) = store(name).await;
        supervisor.register(store).unwrap();
    }
    supervisor
}

#[tokio::test]
async fn connections_heal_independently() {
    let supervisor = supervised(&["cache", "queue", "sessions"]).await;
    let mut events = supervisor.subscribe();

    let queue = supervisor.connection("queue").unwrap();
    break_connection(&queue).await.unwrap_err();

    let event = events.next().await.unwrap();
    assert_eq!(&*event.connection_name, "queue");

    let generations: Vec<(String, u64)> = supervisor
        .status()
        .into_iter()
        .map(|status| (status.name, status.generation))
        .collect();
    assert_eq!(
        generations,
        vec![
            ("cache".to_string(), 0),
            ("queue".to_string(), 1),
            ("sessions".to_string(), 0),
        ]
    );
    assert!(supervisor.is_healthy());
}

#[tokio::test]
async fn unhealthy_while_any_member_reconnects() {
    let supervisor = ConnectionSupervisor::new();
    let (cache, cache_server) = store("cache").await;
    let (queue, _queue_server) = store("queue").await;
    supervisor.register(cache.clone()).unwrap();
    supervisor.register(queue).unwrap();

    cache_server.hold_connects();
    break_connection(&cache).await.unwrap_err();
    tokio::task::yield_now().await;

    assert!(!supervisor.is_healthy());
    let status = supervisor.status();
    assert_eq!(status[0].state, ConnectionState::Reconnecting);
    assert_eq!(status[0].faults, 1);
    assert_eq!(status[1].state, ConnectionState::Healthy);

    let mut events = cache.subscribe();
    cache_server.release_connects();
    events.recv().await.unwrap();
    assert!(supervisor.is_healthy());
}

#[tokio::test]
async fn registry_operations() {
    let supervisor = supervised(&["a"]).await;

    let (duplicate, _server) = store("a").await;
    assert_eq!(
        supervisor.register(duplicate.clone()).unwrap_err(),
        SupervisorError::DuplicateName("a".to_string())
    );
    supervisor.register_as("b", duplicate).unwrap();
    assert_eq!(supervisor.names(), vec!["a", "b"]);

    let removed = supervisor.remove("a").unwrap();
    assert_eq!(removed.name(), "a");
    assert_eq!(
        supervisor.remove("a").unwrap_err(),
        SupervisorError::UnknownConnection("a".to_string())
    );
    assert_eq!(supervisor.names(), vec!["b"]);
}

#[tokio::test]
async fn removed_connection_leaves_merged_stream() {
    let supervisor = supervised(&["a", "b"]).await;
    let a = supervisor.remove("a").unwrap();
    let mut events = supervisor.subscribe();

    let mut direct = a.subscribe();
    break_connection(&a).await.unwrap_err();
    direct.recv().await.unwrap();

    let b = supervisor.connection("b").unwrap();
    break_connection(&b).await.unwrap_err();
    let event = events.next().await.unwrap();
    assert_eq!(&*event.connection_name, "b");
}
