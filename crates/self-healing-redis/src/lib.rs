//! Self-healing Redis connections.
//!
//! [`SelfHealingRedis`] wraps a [`redis::aio::MultiplexedConnection`] in a
//! [`SelfHealingConnection`](self_healing_connection::SelfHealingConnection).
//! When the socket drops, the server restarts or credentials expire, the
//! connection is re-established in the background while callers keep getting
//! their own results.
//!
//! # Example
//!
//! ```no_run
//! use self_healing_redis::SelfHealingRedis;
//! use self_healing_connection::ReconnectPolicy;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> redis::RedisResult<()> {
//! let config = SelfHealingRedis::config_builder()
//!     .name("sessions")
//!     .policy(ReconnectPolicy::exponential(
//!         Duration::from_millis(100),
//!         Duration::from_secs(10),
//!     ))
//!     .build();
//!
//! let redis = SelfHealingRedis::open("redis://127.0.0.1/", config).await?;
//! let mut reconnects = redis.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(event) = reconnects.recv().await {
//!         // Re-subscribe pub/sub channels here.
//!         println!("reconnected at generation {}", event.new_generation);
//!     }
//! });
//!
//! redis.hset("session:1", "user", "alice").await?;
//! # Ok(())
//! # }
//! ```

mod classify;
mod client;
mod connector;

pub use classify::{fault_kind, RedisClassifier};
pub use client::SelfHealingRedis;
pub use connector::RedisConnector;
