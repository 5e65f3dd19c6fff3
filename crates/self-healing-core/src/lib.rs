//! Core infrastructure for self-healing connections.
//!
//! This crate provides the pieces shared by every self-healing crate:
//! - Event system for observability
//! - Fault taxonomy used to tell terminal connection faults from ordinary
//!   operation errors

pub mod events;
pub mod fault;

pub use events::{EventListener, EventListeners, FnListener, HealingEvent};
pub use fault::{FaultKind, FaultTagged, ParseFaultKindError};
