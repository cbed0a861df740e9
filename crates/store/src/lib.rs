//! Mission Store client for Stakeline
//!
//! The reconciler never owns mission persistence. It reads and mutates
//! missions through the [`MissionStore`] trait, which is implemented by:
//! - [`HasuraMissionStore`]: GraphQL mission service used in production
//! - [`InMemoryMissionStore`]: process-local store for tests and dry runs
//!
//! # Consistency
//!
//! Implementations must apply every field of a [`MissionPatch`] to a row
//! atomically. Status-narrowing updates (`update_missions` with a
//! [`MissionSelector::Filter`]) must only return rows they actually moved,
//! so a mission is never visible to two phases at once.

#![warn(missing_docs)]

pub mod hasura;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use stakeline_core::{Mission, MissionId, MissionStatus, TransactionEntry};
use thiserror::Error;

pub use hasura::HasuraMissionStore;
pub use memory::InMemoryMissionStore;

/// Mission store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Request could not be delivered or timed out
    #[error("Store transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Store accepted the request but reported errors
    #[error("Store rejected request: {0}")]
    Rejected(String),

    /// Response did not have the expected shape
    #[error("Malformed store response: {0}")]
    Decode(String),

    /// Store is not reachable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Row predicate for selecting missions
#[derive(Debug, Clone, PartialEq)]
pub struct MissionFilter {
    /// Required mission status
    pub status: MissionStatus,
    /// Only rows whose `extract_at` is strictly before this instant
    pub extract_before: Option<DateTime<Utc>>,
}

impl MissionFilter {
    /// Select every mission in `status`
    pub fn status(status: MissionStatus) -> Self {
        Self {
            status,
            extract_before: None,
        }
    }

    /// Narrow to missions whose window ended before `instant`
    pub fn extracted_before(mut self, instant: DateTime<Utc>) -> Self {
        self.extract_before = Some(instant);
        self
    }

    /// Check whether a mission satisfies the filter
    pub fn matches(&self, mission: &Mission) -> bool {
        mission.status == self.status
            && self
                .extract_before
                .map_or(true, |instant| mission.extract_at < instant)
    }
}

/// Rows targeted by an update
#[derive(Debug, Clone, PartialEq)]
pub enum MissionSelector {
    /// Explicit set of mission ids
    Ids(Vec<MissionId>),
    /// Every row matching a filter at the time of the update
    Filter(MissionFilter),
}

impl MissionSelector {
    /// Check whether the selector can match no rows at all
    pub fn is_empty(&self) -> bool {
        matches!(self, MissionSelector::Ids(ids) if ids.is_empty())
    }
}

/// Field-level changes applied to every selected row
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MissionPatch {
    /// New status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MissionStatus>,
    /// Replacement transaction log
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<TransactionEntry>>,
    /// New reward
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<f64>,
    /// New window start
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// New window end
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract_at: Option<DateTime<Utc>>,
}

impl MissionPatch {
    /// Patch that only changes status
    pub fn status(status: MissionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Replace the transaction log
    pub fn with_transactions(mut self, transactions: Vec<TransactionEntry>) -> Self {
        self.transactions = Some(transactions);
        self
    }

    /// Set the reward
    pub fn with_reward(mut self, reward: f64) -> Self {
        self.reward = Some(reward);
        self
    }

    /// Set the earning window
    pub fn with_window(mut self, started_at: DateTime<Utc>, extract_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self.extract_at = Some(extract_at);
        self
    }

    /// Check if the patch changes nothing
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.transactions.is_none()
            && self.reward.is_none()
            && self.started_at.is_none()
            && self.extract_at.is_none()
    }

    /// Apply the patch to a local copy of a mission
    pub fn apply(&self, mission: &mut Mission) {
        if let Some(status) = self.status {
            mission.status = status;
        }
        if let Some(transactions) = &self.transactions {
            mission.transactions = transactions.clone();
        }
        if let Some(reward) = self.reward {
            mission.reward = reward;
        }
        if let Some(started_at) = self.started_at {
            mission.started_at = started_at;
        }
        if let Some(extract_at) = self.extract_at {
            mission.extract_at = extract_at;
        }
    }
}

/// Query/mutation interface to the mission store
#[async_trait]
pub trait MissionStore: Send + Sync {
    /// Fetch every mission matching `filter`
    async fn select_missions(&self, filter: &MissionFilter) -> Result<Vec<Mission>, StoreError>;

    /// Apply `patch` to the selected rows and return them as updated
    async fn update_missions(
        &self,
        selector: &MissionSelector,
        patch: &MissionPatch,
    ) -> Result<Vec<Mission>, StoreError>;

    /// Insert rows, or on id conflict overwrite `status`, `transactions` and `reward`
    async fn upsert_missions(&self, missions: &[Mission]) -> Result<Vec<Mission>, StoreError>;
}
