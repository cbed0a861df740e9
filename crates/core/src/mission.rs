//! Mission records and lifecycle states
//!
//! A mission is the persisted unit of work the reconciler advances. The
//! record shape matches the mission store's JSON representation so the
//! same types are used by every store adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signature recorded when a transfer is known not to have reached the ledger.
pub const INVALID_SIGNATURE: &str = "invalid";

/// Mission identifier as stored by the mission store.
///
/// The store may hand out numeric or textual keys. The original JSON form
/// is kept so ids can be sent back in typed GraphQL variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MissionId {
    /// Integer primary key
    Int(i64),
    /// Textual primary key
    Text(String),
}

impl MissionId {
    /// Create a textual mission id
    pub fn new(id: impl Into<String>) -> Self {
        Self::Text(id.into())
    }
}

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{}", id),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<&str> for MissionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for MissionId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

impl From<i64> for MissionId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

/// Mission lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissionStatus {
    /// Created externally, waiting for the start transaction to confirm
    Pending,
    /// Earning; reward is re-paid every cycle
    Restaking,
    /// Earning until `extract_at`
    Staking,
    /// Completion transfer submitted, awaiting confirmation
    PendingComplete,
    /// Completion transfer confirmed
    Completed,
    /// Cancellation requested, transfer not yet submitted
    CancelPending,
    /// Cancellation transfer submitted, awaiting confirmation
    CancelVerify,
    /// Mission canceled
    Canceled,
}

impl MissionStatus {
    /// Wire representation used by the mission store
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionStatus::Pending => "pending",
            MissionStatus::Restaking => "restaking",
            MissionStatus::Staking => "staking",
            MissionStatus::PendingComplete => "pending-complete",
            MissionStatus::Completed => "completed",
            MissionStatus::CancelPending => "cancel-pending",
            MissionStatus::CancelVerify => "cancel-verify",
            MissionStatus::Canceled => "canceled",
        }
    }

    /// Check if state is terminal (completed or canceled)
    pub fn is_terminal(&self) -> bool {
        matches!(self, MissionStatus::Completed | MissionStatus::Canceled)
    }

    /// Check if transition to new state is valid
    pub fn can_transition_to(&self, next: MissionStatus) -> bool {
        match (self, next) {
            // From Pending
            (MissionStatus::Pending, MissionStatus::Restaking) => true,
            (MissionStatus::Pending, MissionStatus::Canceled) => true,
            // From Staking
            (MissionStatus::Staking, MissionStatus::PendingComplete) => true,
            // From PendingComplete (forward, or roll back for resubmission)
            (MissionStatus::PendingComplete, MissionStatus::Completed) => true,
            (MissionStatus::PendingComplete, MissionStatus::Staking) => true,
            // From CancelPending
            (MissionStatus::CancelPending, MissionStatus::CancelVerify) => true,
            // From CancelVerify (forward, or roll back for resubmission)
            (MissionStatus::CancelVerify, MissionStatus::Canceled) => true,
            (MissionStatus::CancelVerify, MissionStatus::CancelPending) => true,
            _ => false,
        }
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labels the reconciler reads and writes in a mission's transaction log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxLabel {
    /// Transfer that opened the mission, written by the external creator
    StakingStarted,
    /// Asset return at the end of a staking window
    StakingComplete,
    /// Asset return after a cancellation
    StakingCanceled,
    /// Reward-only payout at the end of a restaking cycle
    RestakeReward,
}

impl TxLabel {
    /// Label text as stored in `tx_info`
    pub fn as_str(&self) -> &'static str {
        match self {
            TxLabel::StakingStarted => "Staking Started",
            TxLabel::StakingComplete => "Staking Complete",
            TxLabel::StakingCanceled => "Staking Canceled",
            TxLabel::RestakeReward => "Restake Reward",
        }
    }
}

impl fmt::Display for TxLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a mission's transaction log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEntry {
    /// Ledger signature, or [`INVALID_SIGNATURE`]
    pub tx: String,
    /// Free-form label; see [`TxLabel`]
    pub tx_info: String,
}

impl TransactionEntry {
    /// Create an entry for a reconciler-owned label
    pub fn new(tx: impl Into<String>, label: TxLabel) -> Self {
        Self {
            tx: tx.into(),
            tx_info: label.as_str().to_string(),
        }
    }

    /// True when the entry records a submission that never reached the ledger
    pub fn is_sentinel(&self) -> bool {
        self.tx.is_empty() || self.tx == INVALID_SIGNATURE
    }

    /// True when the entry carries the given label
    pub fn has_label(&self, label: TxLabel) -> bool {
        self.tx_info == label.as_str()
    }
}

/// Asset held for a mission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRef {
    /// Asset (mint) address
    pub mint: String,
}

impl MintRef {
    /// Create a mint reference
    pub fn new(mint: impl Into<String>) -> Self {
        Self { mint: mint.into() }
    }
}

/// Persisted mission record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    /// Unique mission identifier
    pub id: MissionId,

    /// Current lifecycle state
    pub status: MissionStatus,

    /// Key into the mission type registry
    #[serde(rename = "type")]
    pub mission_type: String,

    /// Destination wallet for returned assets and rewards
    pub wallet: String,

    /// Assets held for this mission
    #[serde(default)]
    pub mints: Vec<MintRef>,

    /// Accrued or finalized reward
    #[serde(default)]
    pub reward: f64,

    /// Start of the current earning window
    pub started_at: DateTime<Utc>,

    /// End of the current earning window
    pub extract_at: DateTime<Utc>,

    /// Ordered transaction log
    #[serde(default)]
    pub transactions: Vec<TransactionEntry>,
}

impl Mission {
    /// Create a pending mission with an empty log
    pub fn new(
        id: impl Into<MissionId>,
        mission_type: impl Into<String>,
        wallet: impl Into<String>,
        started_at: DateTime<Utc>,
        extract_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            status: MissionStatus::Pending,
            mission_type: mission_type.into(),
            wallet: wallet.into(),
            mints: Vec::new(),
            reward: 0.0,
            started_at,
            extract_at,
            transactions: Vec::new(),
        }
    }

    /// Mint addresses in log order
    pub fn mint_addresses(&self) -> Vec<String> {
        self.mints.iter().map(|m| m.mint.clone()).collect()
    }

    /// First entry for `label` that carries a real ledger signature
    pub fn current_transaction(&self, label: TxLabel) -> Option<&TransactionEntry> {
        self.transactions
            .iter()
            .find(|entry| entry.has_label(label) && !entry.is_sentinel())
    }

    /// Log with every entry for `label` removed
    pub fn transactions_without(&self, label: TxLabel) -> Vec<TransactionEntry> {
        self.transactions
            .iter()
            .filter(|entry| !entry.has_label(label))
            .cloned()
            .collect()
    }

    /// Log with stale entries for `label` replaced by a single new attempt
    pub fn transactions_replacing(&self, label: TxLabel, tx: &str) -> Vec<TransactionEntry> {
        let mut log = self.transactions_without(label);
        log.push(TransactionEntry::new(tx, label));
        log
    }

    /// Log with a new entry appended, keeping earlier entries of the same label
    pub fn transactions_appending(&self, label: TxLabel, tx: &str) -> Vec<TransactionEntry> {
        let mut log = self.transactions.clone();
        log.push(TransactionEntry::new(tx, label));
        log
    }
}
