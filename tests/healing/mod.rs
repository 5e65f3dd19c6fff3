//! Test organization:
//! - forwarding.rs: pass-through and classification of operation results
//! - single_flight.rs: concurrent and stale fault reports
//! - events.rs: fault event delivery and ordering
//! - backoff.rs: reconnect delays, bounds and shutdown
//! - scenario.rs: end-to-end fault under concurrent load
//! - supervisor.rs: named sets of connections
//! - support.rs: in-memory store used by all of the above

mod backoff;
mod scenario;
mod single_flight;
mod supervisor;
