//! Mission lifecycle reconciliation for Stakeline
//!
//! Missions advance through their lifecycle when the ledger confirms the
//! transfers submitted on their behalf. This crate periodically reconciles
//! the mission store with the ledger:
//!
//! - [`phases`]: one phase per lifecycle state, run in a fixed order
//! - [`tracker`]: per-phase consecutive-miss counters with a retry bound
//! - [`reward`]: reward accrual for completed and canceled missions
//! - [`pipeline`] and [`scheduler`]: sequential, non-overlapping passes
//!
//! # Example
//!
//! ```no_run
//! use stakeline_core::ReconcilerConfig;
//! use stakeline_ledger::ScriptedLedger;
//! use stakeline_reconciler::{ReconcilerEngine, Scheduler};
//! use stakeline_store::InMemoryMissionStore;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let config = ReconcilerConfig::default();
//! let engine = ReconcilerEngine::from_config(
//!     Arc::new(InMemoryMissionStore::new()),
//!     Arc::new(ScriptedLedger::new()),
//!     &config,
//! );
//! Scheduler::new(engine).run().await;
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod phases;
pub mod pipeline;
pub mod reward;
pub mod scheduler;
pub mod table;
pub mod tracker;

pub use engine::ReconcilerEngine;
pub use error::{PhaseError, Result};
pub use phases::{Phase, PhaseContext, PhaseReport};
pub use pipeline::{PassReport, PhaseOutcome, Pipeline};
pub use reward::RewardCalculator;
pub use scheduler::Scheduler;
pub use table::KeyedTable;
pub use tracker::{ConfirmationTracker, MissOutcome, TrackerEntry};
