//! Property-based tests for self-healing connections.
//!
//! Run with: cargo test --test property_tests
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold across forwarding, classification and backoff.

pub mod backoff;
pub mod classifier;
pub mod forwarding;

#[path = "../healing/support.rs"]
#[allow(dead_code)]
pub mod support;
