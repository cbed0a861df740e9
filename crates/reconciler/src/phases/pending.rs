//! Pending phase: wait for the externally submitted start transfer

use super::confirm::{self, ConfirmationCheck, Resolution};
use super::{transition, Phase, PhaseContext, PhaseReport};
use crate::error::Result;
use crate::tracker::ConfirmationTracker;
use async_trait::async_trait;
use stakeline_core::{MissionStatus, TxLabel};

/// Moves `pending` missions to `restaking` once their "Staking Started"
/// transaction confirms, or to `canceled` when it never does
#[derive(Debug, Clone)]
pub struct PendingPhase {
    tracker: ConfirmationTracker,
}

impl PendingPhase {
    pub fn new(retry_bound: u32) -> Self {
        Self {
            tracker: ConfirmationTracker::new(retry_bound),
        }
    }
}

#[async_trait]
impl Phase for PendingPhase {
    fn name(&self) -> &'static str {
        "pending"
    }

    async fn run(&mut self, ctx: &PhaseContext) -> Result<PhaseReport> {
        let check = ConfirmationCheck {
            phase: self.name(),
            source: MissionStatus::Pending,
            label: TxLabel::StakingStarted,
        };

        confirm::reconcile(check, ctx, &mut self.tracker, |mission, resolution| {
            match resolution {
                Resolution::Confirmed => transition(mission, MissionStatus::Restaking),
                Resolution::GaveUp => transition(mission, MissionStatus::Canceled),
            }
        })
        .await
    }

    fn tracker(&self) -> Option<&ConfirmationTracker> {
        Some(&self.tracker)
    }
}
