use futures::StreamExt;
use self_healing_connection::{
    connector_fn, ConnectionSupervisor, Connector, ReconnectPolicy, SelfHealingConfig,
    SelfHealingConnection,
};
use std::io::{Error, ErrorKind};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// An in-memory stand-in for a network connection.
struct Link {
    id: u32,
    up: AtomicBool,
}

impl Link {
    async fn ping(&self) -> Result<u32, Error> {
        if self.up.load(Ordering::SeqCst) {
            Ok(self.id)
        } else {
            Err(Error::new(ErrorKind::ConnectionReset, "link dropped"))
        }
    }
}

fn links() -> impl Connector<Connection = Link, Error = Error> {
    let next_id = Arc::new(AtomicU32::new(0));
    connector_fn(move || {
        let id = next_id.fetch_add(1, Ordering::SeqCst);
        async move {
            println!("  connector: opened link {id}");
            Ok(Link {
                id,
                up: AtomicBool::new(true),
            })
        }
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Supervised Self-Healing Connections\n");

    let supervisor = ConnectionSupervisor::new();
    for name in ["primary", "replica"] {
        let config = SelfHealingConfig::builder()
            .name(name)
            .policy(ReconnectPolicy::exponential(
                Duration::from_millis(50),
                Duration::from_secs(1),
            ))
            .build();
        supervisor.register(SelfHealingConnection::connect(links(), config).await?)?;
    }

    let mut events = supervisor.subscribe_results();
    let primary = supervisor.connection("primary")?;

    // A missing key is an operation error: it passes through untouched.
    let missing = primary
        .execute("GET", |_| {
            Box::pin(async { Err::<(), _>(Error::new(ErrorKind::NotFound, "no such key")) })
        })
        .await;
    println!("GET on primary: {missing:?} (generation {})", primary.generation());

    // A dropped link is terminal: the error is returned and a new link is
    // built in the background.
    primary.current().connection().up.store(false, Ordering::SeqCst);
    let dropped = primary.execute("PING", |link| Box::pin(link.ping())).await;
    println!("PING on primary: {dropped:?}");

    match events.next().await {
        Some(Ok(event)) => println!(
            "fault event: {} {} -> generation {} after {} attempt(s)",
            event.connection_name, event.kind, event.new_generation, event.attempts
        ),
        Some(Err(err)) => println!("subscription error: {err}"),
        None => println!("no more events"),
    }

    let id = primary.execute("PING", |link| Box::pin(link.ping())).await?;
    println!("PING on primary: Ok({id})\n");

    for status in supervisor.status() {
        println!(
            "{:<8} generation={} state={} faults={} reconnects={}",
            status.name,
            status.generation,
            status.state.as_str(),
            status.faults,
            status.reconnects
        );
    }

    Ok(())
}
