//! Staking completion phase

use super::submit::{self, AssetReturn};
use super::{Phase, PhaseContext, PhaseReport};
use crate::error::Result;
use crate::reward::RewardCalculator;
use async_trait::async_trait;
use stakeline_core::{MissionStatus, TxLabel};
use stakeline_store::{MissionFilter, MissionPatch, MissionSelector};
use tracing::debug;

/// Narrows `staking` missions whose window has ended to `pending-complete`
/// and returns their assets with the type's nominal reward
#[derive(Debug, Clone, Default)]
pub struct StakedPhase;

impl StakedPhase {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Phase for StakedPhase {
    fn name(&self) -> &'static str {
        "staked"
    }

    async fn run(&mut self, ctx: &PhaseContext) -> Result<PhaseReport> {
        let now = ctx.clock.now();
        let ended = MissionFilter::status(MissionStatus::Staking).extracted_before(now);

        let narrowed = ctx
            .store
            .update_missions(
                &MissionSelector::Filter(ended),
                &MissionPatch::status(MissionStatus::PendingComplete),
            )
            .await?;

        if narrowed.is_empty() {
            return Ok(PhaseReport::default());
        }
        debug!(phase = self.name(), count = narrowed.len(), "Missions reached end of window");

        let plan = AssetReturn {
            phase: self.name(),
            label: TxLabel::StakingComplete,
            revert_to: MissionStatus::Staking,
            record_reward: false,
        };

        Ok(submit::return_assets(plan, ctx, narrowed, |mission| {
            let params = ctx.mission_types.for_mission(mission)?;
            Ok(RewardCalculator::new(params).nominal())
        })
        .await)
    }
}
