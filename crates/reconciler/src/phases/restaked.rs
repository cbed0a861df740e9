//! Restaking phase: pay out each ended cycle and open the next one

use super::{Phase, PhaseContext, PhaseReport};
use crate::error::{PhaseError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures_util::stream::{self, StreamExt};
use stakeline_core::{Mission, MissionStatus, TxLabel};
use stakeline_ledger::TransferOutcome;
use stakeline_store::{MissionFilter, MissionPatch, MissionSelector};
use tracing::{error, info, warn};

/// Pays `restaking` missions whose window has ended and rolls the window forward
#[derive(Debug, Clone, Default)]
pub struct RestakedPhase;

impl RestakedPhase {
    pub fn new() -> Self {
        Self
    }
}

/// Length of the next window: the previous one in whole hours, or one
/// earning cycle when that truncates to zero
fn next_window(mission: &Mission, ctx: &PhaseContext) -> Result<Duration> {
    let hours = (mission.extract_at - mission.started_at).num_hours().abs();
    if hours > 0 {
        return Ok(Duration::hours(hours));
    }

    let params = ctx.mission_types.for_mission(mission)?;
    Ok(Duration::hours(i64::from(params.earning_cycle_hours)))
}

fn restake_patch(
    mission: &Mission,
    signature: &str,
    now: DateTime<Utc>,
    window: Duration,
) -> MissionPatch {
    MissionPatch::default()
        .with_transactions(mission.transactions_appending(TxLabel::RestakeReward, signature))
        .with_window(now, now + window)
}

#[async_trait]
impl Phase for RestakedPhase {
    fn name(&self) -> &'static str {
        "restaked"
    }

    async fn run(&mut self, ctx: &PhaseContext) -> Result<PhaseReport> {
        let phase = self.name();
        let now = ctx.clock.now();
        let missions = ctx
            .store
            .select_missions(&MissionFilter::status(MissionStatus::Restaking).extracted_before(now))
            .await?;

        let mut report = PhaseReport {
            selected: missions.len(),
            ..PhaseReport::default()
        };

        let submissions: Vec<(Mission, Result<(TransferOutcome, Duration)>)> =
            stream::iter(missions)
                .map(|mission| async move {
                    let result = match next_window(&mission, ctx) {
                        Ok(window) => ctx
                            .ledger
                            .submit_reward_transfer(&mission.wallet, mission.reward)
                            .await
                            .map(|outcome| (outcome, window))
                            .map_err(PhaseError::from),
                        Err(e) => Err(e),
                    };
                    (mission, result)
                })
                .buffered(ctx.fan_out())
                .collect()
                .await;

        for (mission, result) in submissions {
            match result {
                Ok((TransferOutcome::Submitted(signature), window)) => {
                    let patch = restake_patch(&mission, &signature, now, window);
                    let selector = MissionSelector::Ids(vec![mission.id.clone()]);

                    match ctx.store.update_missions(&selector, &patch).await {
                        Ok(_) => {
                            info!(phase, mission_id = %mission.id, signature = %signature, reward = mission.reward, "Restake reward paid");
                            report.advanced += 1;
                        }
                        Err(e) => {
                            error!(phase, mission_id = %mission.id, signature = %signature, error = %e, "Failed to record restake");
                            report.failed += 1;
                        }
                    }
                }
                Ok((TransferOutcome::Invalid, _)) => {
                    warn!(phase, mission_id = %mission.id, "Restake transfer did not reach the ledger");
                    report.waiting += 1;
                }
                Err(e) => {
                    warn!(phase, mission_id = %mission.id, error = %e, "Restake transfer failed");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}
