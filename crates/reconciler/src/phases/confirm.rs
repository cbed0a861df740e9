//! Shared confirmation polling
//!
//! Used by the three phases that wait on a previously submitted transfer.

use super::{PhaseContext, PhaseReport};
use crate::error::Result;
use crate::tracker::{ConfirmationTracker, MissOutcome};
use futures_util::stream::{self, StreamExt};
use stakeline_core::{Mission, MissionId, MissionStatus, TxLabel};
use stakeline_store::MissionFilter;
use tracing::{debug, error, info, warn};

/// Ledger verdict for one mission in one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Observation {
    Confirmed,
    Missed,
}

/// How a tracked mission was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    Confirmed,
    GaveUp,
}

/// Inputs of a confirmation-polling phase
pub(crate) struct ConfirmationCheck {
    pub phase: &'static str,
    pub source: MissionStatus,
    pub label: TxLabel,
}

async fn check_one(
    ctx: &PhaseContext,
    phase: &'static str,
    mission: &Mission,
    label: TxLabel,
) -> Observation {
    let Some(entry) = mission.current_transaction(label) else {
        debug!(phase, mission_id = %mission.id, label = %label, "No signature on record");
        return Observation::Missed;
    };

    match ctx.ledger.transaction_status(&entry.tx).await {
        Ok(Some(status)) if status.confirmed => Observation::Confirmed,
        Ok(Some(_)) => {
            warn!(phase, mission_id = %mission.id, signature = %entry.tx, "Transaction landed with an error");
            Observation::Missed
        }
        Ok(None) => {
            debug!(phase, mission_id = %mission.id, signature = %entry.tx, "Transaction not found");
            Observation::Missed
        }
        Err(e) => {
            warn!(phase, mission_id = %mission.id, signature = %entry.tx, error = %e, "Transaction lookup failed");
            Observation::Missed
        }
    }
}

/// Look up the current `label` transaction of every mission, in input order
pub(crate) async fn observe(
    ctx: &PhaseContext,
    phase: &'static str,
    missions: &[Mission],
    label: TxLabel,
) -> Vec<Observation> {
    stream::iter(missions.to_vec())
        .map(|mission| async move { check_one(ctx, phase, &mission, label).await })
        .buffered(ctx.fan_out())
        .collect()
        .await
}

/// Poll, count misses and write back resolved missions
///
/// Tracker changes are staged on a copy and committed only after the store
/// accepted the writes, so a store failure leaves `tracker` untouched.
pub(crate) async fn reconcile<F>(
    check: ConfirmationCheck,
    ctx: &PhaseContext,
    tracker: &mut ConfirmationTracker,
    resolve: F,
) -> Result<PhaseReport>
where
    F: Fn(&Mission, Resolution) -> Result<Mission> + Send,
{
    let phase = check.phase;
    let missions = ctx
        .store
        .select_missions(&MissionFilter::status(check.source))
        .await?;

    let mut report = PhaseReport {
        selected: missions.len(),
        ..PhaseReport::default()
    };

    let mut staged = tracker.clone();
    let ids: Vec<MissionId> = missions.iter().map(|m| m.id.clone()).collect();
    staged.retain_only(&ids);

    let observations = observe(ctx, phase, &missions, check.label).await;
    let mut updates = Vec::new();

    for (mission, observation) in missions.iter().zip(observations) {
        let resolution = match observation {
            Observation::Confirmed => {
                staged.observe_confirm(&mission.id);
                Resolution::Confirmed
            }
            Observation::Missed => match staged.observe_miss(mission) {
                MissOutcome::Waiting { misses } => {
                    info!(phase, mission_id = %mission.id, misses, bound = staged.bound(), "Awaiting confirmation");
                    report.waiting += 1;
                    continue;
                }
                MissOutcome::GaveUp { misses } => {
                    warn!(phase, mission_id = %mission.id, misses, "Confirmation retries exhausted");
                    Resolution::GaveUp
                }
            },
        };

        match resolve(mission, resolution) {
            Ok(updated) => {
                match resolution {
                    Resolution::Confirmed => report.advanced += 1,
                    Resolution::GaveUp => report.rolled_back += 1,
                }
                debug!(phase, mission_id = %mission.id, from = %mission.status, to = %updated.status, "Mission resolved");
                updates.push(updated);
            }
            Err(e) => {
                error!(phase, mission_id = %mission.id, error = %e, "Could not resolve mission");
                report.failed += 1;
            }
        }
    }

    if !updates.is_empty() {
        ctx.store.upsert_missions(&updates).await?;
        info!(
            phase,
            advanced = report.advanced,
            rolled_back = report.rolled_back,
            "Applied confirmation results"
        );
    }

    *tracker = staged;
    Ok(report)
}
