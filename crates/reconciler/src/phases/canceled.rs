//! Cancellation submission phase

use super::submit::{self, AssetReturn};
use super::{Phase, PhaseContext, PhaseReport};
use crate::error::Result;
use crate::reward::RewardCalculator;
use async_trait::async_trait;
use stakeline_core::{MissionStatus, TxLabel};
use stakeline_store::{MissionFilter, MissionPatch, MissionSelector};

/// Narrows `cancel-pending` missions to `cancel-verify` and returns their
/// assets with the reward accrued so far
#[derive(Debug, Clone, Default)]
pub struct CanceledPhase;

impl CanceledPhase {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Phase for CanceledPhase {
    fn name(&self) -> &'static str {
        "canceled"
    }

    async fn run(&mut self, ctx: &PhaseContext) -> Result<PhaseReport> {
        let narrowed = ctx
            .store
            .update_missions(
                &MissionSelector::Filter(MissionFilter::status(MissionStatus::CancelPending)),
                &MissionPatch::status(MissionStatus::CancelVerify),
            )
            .await?;

        if narrowed.is_empty() {
            return Ok(PhaseReport::default());
        }

        let now = ctx.clock.now();
        let plan = AssetReturn {
            phase: self.name(),
            label: TxLabel::StakingCanceled,
            revert_to: MissionStatus::CancelPending,
            record_reward: true,
        };

        Ok(submit::return_assets(plan, ctx, narrowed, |mission| {
            let params = ctx.mission_types.for_mission(mission)?;
            Ok(RewardCalculator::new(params).accrued(mission, true, now))
        })
        .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phases::test_support::{epoch, harness, mission, with_tx};
    use chrono::Duration;
    use stakeline_core::MissionId;

    #[tokio::test]
    async fn test_submits_accrued_reward() {
        let h = harness(vec![with_tx(
            mission("a", MissionStatus::CancelPending),
            "old-cancel",
            TxLabel::StakingCanceled,
        )])
        .await;
        h.clock.set(epoch() + Duration::hours(6));
        h.ledger.script_signature("wallet-a", "cancel-1");

        let report = CanceledPhase::new().run(&h.ctx).await.unwrap();
        assert_eq!(report.advanced, 1);

        let row = h.store.get(&MissionId::new("a")).await.unwrap();
        assert_eq!(row.status, MissionStatus::CancelVerify);
        assert_eq!(row.reward, 2.0);
        assert_eq!(row.transactions.len(), 1);
        assert_eq!(
            row.current_transaction(TxLabel::StakingCanceled).unwrap().tx,
            "cancel-1"
        );
        assert_eq!(h.ledger.transfers()[0].amount, 2.0);
    }

    #[tokio::test]
    async fn test_submission_error_reverts_to_cancel_pending() {
        let h = harness(vec![mission("a", MissionStatus::CancelPending)]).await;
        h.ledger.script_submission_error("wallet-a", "timeout");

        let report = CanceledPhase::new().run(&h.ctx).await.unwrap();
        assert_eq!(report.rolled_back, 1);

        let row = h.store.get(&MissionId::new("a")).await.unwrap();
        assert_eq!(row.status, MissionStatus::CancelPending);
        assert_eq!(row.reward, 8.0);
    }

    #[tokio::test]
    async fn test_store_failure_abandons_phase() {
        let h = harness(vec![mission("a", MissionStatus::CancelPending)]).await;
        h.store.fail_next_writes(1);

        assert!(CanceledPhase::new().run(&h.ctx).await.is_err());
        assert!(h.ledger.transfers().is_empty());
    }
}
