//! Property tests for forwarding and reconnect coordination.
//!
//! Invariants tested:
//! - Without faults, forwarded results equal direct results
//! - N concurrent reports at one generation claim exactly one reconnect
//! - Generations advance by exactly one per fault, events in order

use super::support::*;
use proptest::prelude::*;
use self_healing_connection::{Connector, FaultKind, FaultReport};
use tokio::runtime::Runtime;

#[derive(Debug, Clone)]
enum Op {
    Set(u8, u8),
    Get(u8),
    Incr(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..4, 0u8..10).prop_map(|(key, value)| Op::Set(key, value)),
        (0u8..4).prop_map(Op::Get),
        (0u8..4).prop_map(Op::Incr),
    ]
}

fn key(k: u8) -> String {
    format!("key-{k}")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: a connection that never faults is transparent
    #[test]
    fn forwarding_is_transparent(ops in proptest::collection::vec(op(), 1..40)) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let direct_server = MockServer::new();
            let direct = MockConnector { server: direct_server }.connect().await.unwrap();
            let (store, server) = store("transparent").await;

            for op in &ops {
                let (expected, actual) = match op {
                    Op::Set(k, v) => (
                        direct.set(&key(*k), &v.to_string()).await.map(|_| String::new()),
                        set(&store, &key(*k), &v.to_string()).await.map(|_| String::new()),
                    ),
                    Op::Get(k) => (direct.get(&key(*k)).await, get(&store, &key(*k)).await),
                    Op::Incr(k) => (
                        direct.incr(&key(*k)).await.map(|n| n.to_string()),
                        incr(&store, &key(*k)).await.map(|n| n.to_string()),
                    ),
                };
                prop_assert_eq!(expected, actual, "diverged on {:?}", op);
            }

            prop_assert_eq!(store.generation(), 0);
            prop_assert_eq!(store.state().fault_count(), 0);
            prop_assert_eq!(server.connections(), 1);
            Ok(())
        })?;
    }

    /// Property: N concurrent reports at one generation start one reconnect
    #[test]
    fn concurrent_reports_claim_once(reporters in 1usize..64) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let (store, server) = store("claims").await;
            server.hold_connects();

            let handles: Vec<_> = (0..reporters)
                .map(|_| {
                    let store = store.clone();
                    tokio::spawn(async move {
                        store
                            .coordinator()
                            .report_fault(0, "GET", FaultKind::ConnectionReset)
                    })
                })
                .collect();

            let mut claimed = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    FaultReport::Claimed => claimed += 1,
                    FaultReport::Joined => {}
                    FaultReport::Stale => prop_assert!(false, "report at current generation was stale"),
                }
            }
            prop_assert_eq!(claimed, 1);

            let mut events = store.subscribe();
            server.release_connects();
            let event = events.recv().await.unwrap();
            prop_assert_eq!(event.new_generation, 1);
            prop_assert_eq!(server.connections(), 2);
            prop_assert_eq!(store.state().reconnects_started(), 1);
            Ok(())
        })?;
    }

    /// Property: k sequential faults advance the generation by exactly k
    #[test]
    fn generations_advance_by_one(faults in 1u64..10) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let (store, server) = store("sequential").await;
            let mut events = store.subscribe();

            for expected in 0..faults {
                prop_assert_eq!(store.generation(), expected);
                let _ = break_connection(&store).await;
                let event = events.recv().await.unwrap();
                prop_assert_eq!(event.generation, expected);
                prop_assert_eq!(event.new_generation, expected + 1);
            }

            prop_assert_eq!(store.generation(), faults);
            prop_assert_eq!(u64::from(server.connections()), faults + 1);
            prop_assert!(events.try_recv().unwrap().is_none());
            Ok(())
        })?;
    }
}
