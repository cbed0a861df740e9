//! Asset return submission shared by the completion and cancellation phases

use super::{PhaseContext, PhaseReport};
use crate::error::{PhaseError, Result};
use futures_util::stream::{self, StreamExt};
use stakeline_core::{Mission, MissionStatus, TxLabel};
use stakeline_ledger::TransferOutcome;
use stakeline_store::{MissionPatch, MissionSelector};
use tracing::{error, info, warn};

/// Where a narrowed mission's asset return is logged, and where it goes back to on failure
pub(crate) struct AssetReturn {
    pub phase: &'static str,
    pub label: TxLabel,
    pub revert_to: MissionStatus,
    pub record_reward: bool,
}

/// Submit one asset return per narrowed mission and record the outcome
///
/// Ledger calls run with bounded parallelism; store writes are applied one
/// mission at a time. A failed submission reverts the mission to
/// `revert_to`. A failed store write is logged and left for the
/// confirmation phase to roll back.
pub(crate) async fn return_assets<F>(
    plan: AssetReturn,
    ctx: &PhaseContext,
    narrowed: Vec<Mission>,
    amount_for: F,
) -> PhaseReport
where
    F: Fn(&Mission) -> Result<f64>,
{
    let phase = plan.phase;
    let mut report = PhaseReport {
        selected: narrowed.len(),
        ..PhaseReport::default()
    };

    let planned: Vec<(Mission, Result<f64>)> = narrowed
        .into_iter()
        .map(|mission| {
            let amount = amount_for(&mission);
            (mission, amount)
        })
        .collect();

    let submissions: Vec<(Mission, Result<(TransferOutcome, f64)>)> = stream::iter(planned)
        .map(|(mission, amount)| async move {
            let result = match amount {
                Ok(amount) => ctx
                    .ledger
                    .submit_asset_return(&mission.mint_addresses(), &mission.wallet, amount)
                    .await
                    .map(|outcome| (outcome, amount))
                    .map_err(PhaseError::from),
                Err(e) => Err(e),
            };
            (mission, result)
        })
        .buffered(ctx.fan_out())
        .collect()
        .await;

    for (mission, result) in submissions {
        let selector = MissionSelector::Ids(vec![mission.id.clone()]);

        match result {
            Ok((outcome, amount)) => {
                if !outcome.is_submitted() {
                    warn!(phase, mission_id = %mission.id, "Transfer did not reach the ledger, recording sentinel");
                }

                let mut patch = MissionPatch::default()
                    .with_transactions(mission.transactions_replacing(plan.label, outcome.log_value()));
                if plan.record_reward {
                    patch = patch.with_reward(amount);
                }

                match ctx.store.update_missions(&selector, &patch).await {
                    Ok(_) => {
                        info!(phase, mission_id = %mission.id, signature = outcome.log_value(), amount, "Asset return submitted");
                        report.advanced += 1;
                    }
                    Err(e) => {
                        error!(phase, mission_id = %mission.id, signature = outcome.log_value(), error = %e, "Failed to record submitted transfer");
                        report.failed += 1;
                    }
                }
            }
            Err(e) => {
                warn!(phase, mission_id = %mission.id, error = %e, revert_to = %plan.revert_to, "Asset return failed, reverting");

                match ctx
                    .store
                    .update_missions(&selector, &MissionPatch::status(plan.revert_to))
                    .await
                {
                    Ok(_) => report.rolled_back += 1,
                    Err(e) => {
                        error!(phase, mission_id = %mission.id, error = %e, "Failed to revert mission");
                        report.failed += 1;
                    }
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use crate::phases::test_support::{harness, mission, RecordingStore, SlowLedger};
    use crate::phases::{Phase, StakedPhase};
    use stakeline_core::{MissionId, MissionStatus, TxLabel};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_submissions_overlap_up_to_fan_out_and_apply_in_order() {
        let ids = ["a", "b", "c", "d", "e", "f"];
        let mut h = harness(ids.iter().map(|id| mission(id, MissionStatus::Staking)).collect()).await;

        // earlier missions take longer, so calls finish out of order
        let ledger = Arc::new(SlowLedger::new(
            h.ledger.clone(),
            ids.iter().enumerate().map(|(i, id)| {
                (format!("wallet-{}", id), Duration::from_millis(100 - 10 * i as u64))
            }),
        ));
        let store = Arc::new(RecordingStore::new(h.store.clone()));
        h.ctx.ledger = ledger.clone();
        h.ctx.store = store.clone();
        h.ctx.config.max_in_flight = 2;

        let report = StakedPhase::new().run(&h.ctx).await.unwrap();
        assert_eq!(report.advanced, 6);
        assert_eq!(ledger.peak(), 2);
        assert_eq!(ledger.finished()[0], "wallet-b");

        let expected: Vec<MissionId> = ids.iter().map(|id| MissionId::new(*id)).collect();
        assert_eq!(store.written(), expected);

        for id in ids {
            let row = h.store.get(&MissionId::new(id)).await.unwrap();
            let transfers = h.ledger.transfers_for(&format!("wallet-{}", id));
            let signature = transfers[0].outcome.as_ref().unwrap().log_value().to_string();
            assert_eq!(row.current_transaction(TxLabel::StakingComplete).unwrap().tx, signature);
        }
    }
}
