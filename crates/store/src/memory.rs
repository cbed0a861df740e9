//! In-memory mission store
//!
//! Keeps missions in a `BTreeMap` behind a tokio `RwLock`. Every row written
//! is counted so tests can assert that a pass changed nothing, and
//! failures can be injected to exercise store-outage handling.

use crate::{MissionFilter, MissionPatch, MissionSelector, MissionStore, StoreError};
use async_trait::async_trait;
use stakeline_core::{Mission, MissionId};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Process-local [`MissionStore`]
///
/// Clones share the same underlying rows.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMissionStore {
    rows: Arc<RwLock<BTreeMap<MissionId, Mission>>>,
    mutations: Arc<AtomicU64>,
    pending_failures: Arc<AtomicU32>,
    pending_write_failures: Arc<AtomicU32>,
}

impl InMemoryMissionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with missions
    pub async fn with_missions(missions: impl IntoIterator<Item = Mission>) -> Self {
        let store = Self::new();
        for mission in missions {
            store.insert(mission).await;
        }
        store
    }

    /// Insert or replace a row without counting it as a mutation
    pub async fn insert(&self, mission: Mission) {
        self.rows.write().await.insert(mission.id.clone(), mission);
    }

    /// Fetch a row by id
    pub async fn get(&self, id: &MissionId) -> Option<Mission> {
        self.rows.read().await.get(id).cloned()
    }

    /// Snapshot of every row in id order
    pub async fn all(&self) -> Vec<Mission> {
        self.rows.read().await.values().cloned().collect()
    }

    /// Number of rows written by update/upsert calls
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Make the next `count` calls of any kind fail with [`StoreError::Unavailable`]
    pub fn fail_next(&self, count: u32) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` update/upsert calls fail, leaving selects alone
    pub fn fail_next_writes(&self, count: u32) {
        self.pending_write_failures.store(count, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        take_failure(&self.pending_failures)
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        self.check_available()?;
        take_failure(&self.pending_write_failures)
    }
}

fn take_failure(counter: &AtomicU32) -> Result<(), StoreError> {
    let injected = counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
            remaining.checked_sub(1)
        })
        .is_ok();

    if injected {
        return Err(StoreError::Unavailable("injected failure".to_string()));
    }
    Ok(())
}

#[async_trait]
impl MissionStore for InMemoryMissionStore {
    async fn select_missions(&self, filter: &MissionFilter) -> Result<Vec<Mission>, StoreError> {
        self.check_available()?;

        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|mission| filter.matches(mission))
            .cloned()
            .collect())
    }

    async fn update_missions(
        &self,
        selector: &MissionSelector,
        patch: &MissionPatch,
    ) -> Result<Vec<Mission>, StoreError> {
        self.check_writable()?;

        let mut rows = self.rows.write().await;
        let mut updated = Vec::new();

        for mission in rows.values_mut() {
            let selected = match selector {
                MissionSelector::Ids(ids) => ids.contains(&mission.id),
                MissionSelector::Filter(filter) => filter.matches(mission),
            };
            if selected {
                patch.apply(mission);
                updated.push(mission.clone());
            }
        }

        self.mutations
            .fetch_add(updated.len() as u64, Ordering::SeqCst);
        debug!(rows = updated.len(), "In-memory update applied");
        Ok(updated)
    }

    async fn upsert_missions(&self, missions: &[Mission]) -> Result<Vec<Mission>, StoreError> {
        self.check_writable()?;

        let mut rows = self.rows.write().await;
        let mut written = Vec::with_capacity(missions.len());

        for incoming in missions {
            let row = rows
                .entry(incoming.id.clone())
                .and_modify(|existing| {
                    existing.status = incoming.status;
                    existing.transactions = incoming.transactions.clone();
                    existing.reward = incoming.reward;
                })
                .or_insert_with(|| incoming.clone());
            written.push(row.clone());
        }

        self.mutations
            .fetch_add(written.len() as u64, Ordering::SeqCst);
        debug!(rows = written.len(), "In-memory upsert applied");
        Ok(written)
    }
}
