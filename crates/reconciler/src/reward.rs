//! Reward accrual

use chrono::{DateTime, Utc};
use stakeline_core::{Mission, MissionTypeParams};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Computes rewards for missions of one type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardCalculator {
    nominal: f64,
    earning_cycle_hours: u32,
    cancel_penalty: f64,
}

impl RewardCalculator {
    pub fn new(params: &MissionTypeParams) -> Self {
        Self {
            nominal: params.reward,
            earning_cycle_hours: params.earning_cycle_hours,
            cancel_penalty: params.cancel_penalty,
        }
    }

    /// Full reward for one earning cycle
    pub fn nominal(&self) -> f64 {
        self.nominal
    }

    /// Reward owed for `mission` at `now`
    ///
    /// Missions that ran to completion earn the nominal reward. Canceled
    /// missions earn pro rata for the whole seconds elapsed since
    /// `started_at`, less the type's cancellation penalty, rounded to three
    /// decimals and never more than the nominal reward.
    pub fn accrued(&self, mission: &Mission, canceled: bool, now: DateTime<Utc>) -> f64 {
        if !canceled || self.earning_cycle_hours == 0 {
            return self.nominal;
        }

        let elapsed = (now - mission.started_at).num_seconds().unsigned_abs() as f64;
        let per_second = self.nominal / (f64::from(self.earning_cycle_hours) * SECONDS_PER_HOUR);

        let raw = elapsed * per_second;
        let penalized = raw - raw * self.cancel_penalty;

        round_to_thousandths(penalized).min(self.nominal)
    }
}

fn round_to_thousandths(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
