//! Core functionality for the Stakeline mission reconciler.
//!
//! This crate provides the mission data model, lifecycle states, mission
//! type parameters, configuration, and logging shared by the store, ledger
//! and reconciler crates.

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod mission;
pub mod mission_type;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    CancelGiveUpReward, EngineConfig, LedgerConfig, LoggingConfig, ReconcilerConfig, StoreConfig,
};
pub use error::{CoreError, Result};
pub use mission::{
    MintRef, Mission, MissionId, MissionStatus, TransactionEntry, TxLabel, INVALID_SIGNATURE,
};
pub use mission_type::{MissionTypeParams, MissionTypeRegistry, DEFAULT_MISSION_TYPE};
