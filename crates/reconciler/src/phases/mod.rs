//! Reconciliation phases
//!
//! Each phase owns one lifecycle state: it selects the missions in that
//! state, submits transfers or polls the ledger for them, and writes the
//! resulting transitions back to the store. Phases run in a fixed order
//! (see [`crate::pipeline`]) and never overlap.
//!
//! | Phase             | Input state        | Forward            | Rollback          |
//! |-------------------|--------------------|--------------------|-------------------|
//! | `pending`         | `pending`          | `restaking`        | `canceled`        |
//! | `staked`          | `staking` (ended)  | `pending-complete` | `staking`         |
//! | `stake_pending`   | `pending-complete` | `completed`        | `staking`         |
//! | `restaked`        | `restaking` (ended)| `restaking`        |                   |
//! | `canceled`        | `cancel-pending`   | `cancel-verify`    | `cancel-pending`  |
//! | `cancel_verify`   | `cancel-verify`    | `canceled`         | `cancel-pending`  |

mod cancel_verify;
mod canceled;
mod confirm;
mod pending;
mod restaked;
mod stake_pending;
mod staked;
mod submit;

pub use cancel_verify::CancelVerifyPhase;
pub use canceled::CanceledPhase;
pub use pending::PendingPhase;
pub use restaked::RestakedPhase;
pub use stake_pending::StakePendingPhase;
pub use staked::StakedPhase;

use crate::error::{PhaseError, Result};
use crate::tracker::ConfirmationTracker;
use async_trait::async_trait;
use stakeline_core::{Clock, EngineConfig, Mission, MissionStatus, MissionTypeRegistry};
use stakeline_ledger::LedgerClient;
use stakeline_store::MissionStore;
use std::sync::Arc;

/// Collaborators and settings shared by every phase
#[derive(Clone)]
pub struct PhaseContext {
    pub store: Arc<dyn MissionStore>,
    pub ledger: Arc<dyn LedgerClient>,
    pub clock: Arc<dyn Clock>,
    pub mission_types: MissionTypeRegistry,
    pub config: EngineConfig,
}

impl PhaseContext {
    /// Ledger calls allowed in flight within a phase
    pub(crate) fn fan_out(&self) -> usize {
        self.config.max_in_flight.max(1)
    }
}

/// Per-phase counts for one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseReport {
    /// Missions the phase picked up
    pub selected: usize,
    /// Missions moved forward (or submitted)
    pub advanced: usize,
    /// Missions still awaiting confirmation
    pub waiting: usize,
    /// Missions rolled back after exhausting retries or a failed submission
    pub rolled_back: usize,
    /// Missions skipped because of a per-mission error
    pub failed: usize,
}

/// One stage of the reconciliation pipeline
#[async_trait]
pub trait Phase: Send {
    /// Stable name used in logs and reports
    fn name(&self) -> &'static str;

    /// Run the phase once
    async fn run(&mut self, ctx: &PhaseContext) -> Result<PhaseReport>;

    /// Confirmation tracker owned by the phase, if it polls the ledger
    fn tracker(&self) -> Option<&ConfirmationTracker> {
        None
    }
}

/// Copy of `mission` moved to `next`, if the state machine allows it
pub(crate) fn transition(mission: &Mission, next: MissionStatus) -> Result<Mission> {
    if !mission.status.can_transition_to(next) {
        return Err(PhaseError::InvalidTransition {
            mission_id: mission.id.clone(),
            from: mission.status,
            to: next,
        });
    }

    let mut updated = mission.clone();
    updated.status = next;
    Ok(updated)
}

/// Build the six phases in pipeline order
pub fn standard_phases(config: &EngineConfig) -> Vec<Box<dyn Phase>> {
    vec![
        Box::new(PendingPhase::new(config.retry_bound)),
        Box::new(StakedPhase::new()),
        Box::new(StakePendingPhase::new(config.retry_bound)),
        Box::new(RestakedPhase::new()),
        Box::new(CanceledPhase::new()),
        Box::new(CancelVerifyPhase::new(
            config.retry_bound,
            config.cancel_give_up_reward,
        )),
    ]
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use stakeline_core::{ManualClock, MintRef, MissionId, TransactionEntry, TxLabel};
    use stakeline_ledger::{LedgerError, ScriptedLedger, TransactionStatus, TransferOutcome};
    use stakeline_store::{
        InMemoryMissionStore, MissionFilter, MissionPatch, MissionSelector, StoreError,
    };
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    pub struct Harness {
        pub store: InMemoryMissionStore,
        pub ledger: ScriptedLedger,
        pub clock: ManualClock,
        pub ctx: PhaseContext,
    }

    pub async fn harness(missions: Vec<Mission>) -> Harness {
        let store = InMemoryMissionStore::with_missions(missions).await;
        let ledger = ScriptedLedger::new();
        let clock = ManualClock::new(epoch() + Duration::hours(48));

        let ctx = PhaseContext {
            store: Arc::new(store.clone()),
            ledger: Arc::new(ledger.clone()),
            clock: Arc::new(clock.clone()),
            mission_types: MissionTypeRegistry::default(),
            config: EngineConfig::default(),
        };

        Harness {
            store,
            ledger,
            clock,
            ctx,
        }
    }

    pub fn mission(id: &str, status: MissionStatus) -> Mission {
        let mut mission = Mission::new(
            id,
            "staking",
            format!("wallet-{}", id),
            epoch(),
            epoch() + Duration::hours(24),
        );
        mission.status = status;
        mission.reward = 8.0;
        mission.mints = vec![MintRef::new(format!("mint-{}", id))];
        mission
    }

    pub fn with_tx(mut mission: Mission, tx: &str, label: TxLabel) -> Mission {
        mission.transactions.push(TransactionEntry::new(tx, label));
        mission
    }

    /// Ledger that holds every call for a per-key delay and tracks overlap
    ///
    /// Submissions are keyed by wallet, lookups by signature.
    pub struct SlowLedger {
        pub inner: ScriptedLedger,
        delays: HashMap<String, std::time::Duration>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        finished: Mutex<Vec<String>>,
    }

    impl SlowLedger {
        pub fn new(
            inner: ScriptedLedger,
            delays: impl IntoIterator<Item = (String, std::time::Duration)>,
        ) -> Self {
            Self {
                inner,
                delays: delays.into_iter().collect(),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                finished: Mutex::new(Vec::new()),
            }
        }

        async fn hold(&self, key: &str) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let delay = self.delays.get(key).copied().unwrap_or_default();
            tokio::time::sleep(delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.finished.lock().unwrap().push(key.to_string());
        }

        /// Most calls seen in flight at once
        pub fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }

        /// Keys in the order their calls returned
        pub fn finished(&self) -> Vec<String> {
            self.finished.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LedgerClient for SlowLedger {
        async fn submit_reward_transfer(
            &self,
            wallet: &str,
            amount: f64,
        ) -> std::result::Result<TransferOutcome, LedgerError> {
            self.hold(wallet).await;
            self.inner.submit_reward_transfer(wallet, amount).await
        }

        async fn submit_asset_return(
            &self,
            mints: &[String],
            wallet: &str,
            amount: f64,
        ) -> std::result::Result<TransferOutcome, LedgerError> {
            self.hold(wallet).await;
            self.inner.submit_asset_return(mints, wallet, amount).await
        }

        async fn transaction_status(
            &self,
            signature: &str,
        ) -> std::result::Result<Option<TransactionStatus>, LedgerError> {
            self.hold(signature).await;
            self.inner.transaction_status(signature).await
        }
    }

    /// Store wrapper remembering which ids were written, in call order
    pub struct RecordingStore {
        pub inner: InMemoryMissionStore,
        written: Mutex<Vec<MissionId>>,
    }

    impl RecordingStore {
        pub fn new(inner: InMemoryMissionStore) -> Self {
            Self {
                inner,
                written: Mutex::new(Vec::new()),
            }
        }

        pub fn written(&self) -> Vec<MissionId> {
            self.written.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MissionStore for RecordingStore {
        async fn select_missions(
            &self,
            filter: &MissionFilter,
        ) -> std::result::Result<Vec<Mission>, StoreError> {
            self.inner.select_missions(filter).await
        }

        async fn update_missions(
            &self,
            selector: &MissionSelector,
            patch: &MissionPatch,
        ) -> std::result::Result<Vec<Mission>, StoreError> {
            if let MissionSelector::Ids(ids) = selector {
                self.written.lock().unwrap().extend(ids.iter().cloned());
            }
            self.inner.update_missions(selector, patch).await
        }

        async fn upsert_missions(
            &self,
            missions: &[Mission],
        ) -> std::result::Result<Vec<Mission>, StoreError> {
            self.written
                .lock()
                .unwrap()
                .extend(missions.iter().map(|m| m.id.clone()));
            self.inner.upsert_missions(missions).await
        }
    }
}
