//! Integration tests for the Stakeline reconciler
//!
//! This test suite drives the full engine (all six phases, in pipeline
//! order) against the in-memory mission store and the scripted ledger:
//! - Staking completion and cancellation, including retry exhaustion
//! - Pending start confirmation and restaking cycles
//! - Submission failures, store outages and idempotent passes

pub mod test_utils;

#[cfg(test)]
mod lifecycle_tests;

#[cfg(test)]
mod failure_tests;
