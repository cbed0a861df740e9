//! Completion confirmation phase

use super::confirm::{self, ConfirmationCheck, Resolution};
use super::{transition, Phase, PhaseContext, PhaseReport};
use crate::error::Result;
use crate::tracker::ConfirmationTracker;
use async_trait::async_trait;
use stakeline_core::{MissionStatus, TxLabel};

/// Moves `pending-complete` missions to `completed` once the completion
/// transfer confirms. On give-up the mission returns to `staking` with its
/// "Staking Complete" entry stripped so the transfer is submitted again.
#[derive(Debug, Clone)]
pub struct StakePendingPhase {
    tracker: ConfirmationTracker,
}

impl StakePendingPhase {
    pub fn new(retry_bound: u32) -> Self {
        Self {
            tracker: ConfirmationTracker::new(retry_bound),
        }
    }
}

#[async_trait]
impl Phase for StakePendingPhase {
    fn name(&self) -> &'static str {
        "stake_pending"
    }

    async fn run(&mut self, ctx: &PhaseContext) -> Result<PhaseReport> {
        let check = ConfirmationCheck {
            phase: self.name(),
            source: MissionStatus::PendingComplete,
            label: TxLabel::StakingComplete,
        };

        confirm::reconcile(check, ctx, &mut self.tracker, |mission, resolution| {
            match resolution {
                Resolution::Confirmed => transition(mission, MissionStatus::Completed),
                Resolution::GaveUp => {
                    let mut updated = transition(mission, MissionStatus::Staking)?;
                    updated.transactions = mission.transactions_without(TxLabel::StakingComplete);
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
