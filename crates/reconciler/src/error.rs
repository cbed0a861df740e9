//! Reconciler error types

use stakeline_core::{CoreError, MissionId, MissionStatus};
use stakeline_ledger::LedgerError;
use stakeline_store::StoreError;
use thiserror::Error;

/// Errors raised while running a phase
///
/// A store error abandons the whole phase for the current pass. The other
/// variants are raised per mission and handled inside the phase.
#[derive(Debug, Error)]
pub enum PhaseError {
    /// Mission store call failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Ledger call failed
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// Lifecycle edge not allowed by the state machine
    #[error("Invalid transition for mission {mission_id}: {from} -> {to}")]
    InvalidTransition {
        mission_id: MissionId,
        from: MissionStatus,
        to: MissionStatus,
    },
}

/// Result alias for phase operations
pub type Result<T> = std::result::Result<T, PhaseError>;
