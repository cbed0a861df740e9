//! Test utilities for engine-level integration tests

use chrono::{DateTime, Duration, TimeZone, Utc};
use stakeline_core::{
    EngineConfig, ManualClock, MintRef, Mission, MissionId, MissionStatus, MissionTypeRegistry,
    TransactionEntry, TxLabel,
};
use stakeline_ledger::ScriptedLedger;
use stakeline_reconciler::{PassReport, ReconcilerEngine};
use stakeline_store::InMemoryMissionStore;
use std::sync::Arc;

/// Start of every fixture mission's first window
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

/// Initialize tracing only if not already initialized
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Engine wired to in-memory collaborators that tests can inspect
pub struct Fixture {
    pub store: InMemoryMissionStore,
    pub ledger: ScriptedLedger,
    pub clock: ManualClock,
    pub engine: ReconcilerEngine,
}

impl Fixture {
    /// Seed the store and start the clock at `now`
    pub async fn new(missions: Vec<Mission>, now: DateTime<Utc>) -> Self {
        Self::with_config(missions, now, EngineConfig::default()).await
    }

    pub async fn with_config(
        missions: Vec<Mission>,
        now: DateTime<Utc>,
        config: EngineConfig,
    ) -> Self {
        init_tracing();

        let store = InMemoryMissionStore::with_missions(missions).await;
        let ledger = ScriptedLedger::new();
        let clock = ManualClock::new(now);
        let engine = ReconcilerEngine::new(
            Arc::new(store.clone()),
            Arc::new(ledger.clone()),
            config,
            MissionTypeRegistry::default(),
        )
        .with_clock(Arc::new(clock.clone()));

        Self {
            store,
            ledger,
            clock,
            engine,
        }
    }

    pub async fn pass(&mut self) -> PassReport {
        self.engine.run_pass().await
    }

    /// Current row for a mission; panics if it is gone
    pub async fn mission(&self, id: &str) -> Mission {
        self.store
            .get(&MissionId::new(id))
            .await
            .unwrap_or_else(|| panic!("mission {} missing from store", id))
    }

    pub async fn status(&self, id: &str) -> MissionStatus {
        self.mission(id).await.status
    }

    /// Misses recorded for a mission by a confirmation phase
    pub fn misses(&self, phase: &str, id: &str) -> u32 {
        self.engine
            .tracker(phase)
            .map_or(0, |tracker| tracker.misses(&MissionId::new(id)))
    }
}

/// Staking-type mission with a 24h window starting at [`epoch`]
pub fn staking_mission(id: &str, status: MissionStatus) -> Mission {
    let mut mission = Mission::new(
        id,
        "staking",
        wallet(id),
        epoch(),
        epoch() + Duration::hours(24),
    );
    mission.status = status;
    mission.reward = 8.0;
    mission.mints = vec![MintRef::new(format!("mint-{}-1", id)), MintRef::new(format!("mint-{}-2", id))];
    mission
        .transactions
        .push(TransactionEntry::new(format!("start-{}", id), TxLabel::StakingStarted));
    mission
}

pub fn wallet(id: &str) -> String {
    format!("wallet-{}", id)
}

/// Entries in a mission's log carrying `label`
pub fn entries_with(mission: &Mission, label: TxLabel) -> Vec<&TransactionEntry> {
    mission
        .transactions
        .iter()
        .filter(|entry| entry.has_label(label))
        .collect()
}
