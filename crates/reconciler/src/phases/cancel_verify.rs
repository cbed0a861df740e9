//! Cancellation confirmation phase

use super::confirm::{self, ConfirmationCheck, Resolution};
use super::{transition, Phase, PhaseContext, PhaseReport};
use crate::error::Result;
use crate::reward::RewardCalculator;
use crate::tracker::ConfirmationTracker;
use async_trait::async_trait;
use stakeline_core::{CancelGiveUpReward, MissionStatus, TxLabel};

/// Moves `cancel-verify` missions to `canceled` once the cancellation
/// transfer confirms. On give-up the mission returns to `cancel-pending`
/// with its "Staking Canceled" entry stripped and its reward set according
/// to the configured [`CancelGiveUpReward`] policy.
#[derive(Debug, Clone)]
pub struct CancelVerifyPhase {
    tracker: ConfirmationTracker,
    give_up_reward: CancelGiveUpReward,
}

impl CancelVerifyPhase {
    pub fn new(retry_bound: u32, give_up_reward: CancelGiveUpReward) -> Self {
        Self {
            tracker: ConfirmationTracker::new(retry_bound),
            give_up_reward,
        }
    }
}

#[async_trait]
impl Phase for CancelVerifyPhase {
    fn name(&self) -> &'static str {
        "cancel_verify"
    }

    async fn run(&mut self, ctx: &PhaseContext) -> Result<PhaseReport> {
        let check = ConfirmationCheck {
            phase: self.name(),
            source: MissionStatus::CancelVerify,
            label: TxLabel::StakingCanceled,
        };
        let policy = self.give_up_reward;

        confirm::reconcile(check, ctx, &mut self.tracker, |mission, resolution| {
            match resolution {
                Resolution::Confirmed => transition(mission, MissionStatus::Canceled),
                Resolution::GaveUp => {
                    let mut updated = transition(mission, MissionStatus::CancelPending)?;
                    updated.transactions = mission.transactions_without(TxLabel::StakingCanceled);
                    if policy == CancelGiveUpReward::RestoreNominal {
                        let params = ctx.mission_types.for_mission(mission)?;
                        updated.reward = RewardCalculator::new(params).nominal();
                    }
                    Ok(updated)
                }
            }
        })
        .await
    }

    fn tracker(&self) -> Option<&ConfirmationTracker> {
        Some(&self.tracker)
    }
}
