//! Ordered phase pipeline

use crate::phases::{standard_phases, Phase, PhaseContext, PhaseReport};
use crate::tracker::ConfirmationTracker;
use stakeline_core::EngineConfig;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error};

/// Result of one phase within a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOutcome {
    pub phase: &'static str,
    /// Phase counts, or the error that abandoned the phase
    pub result: Result<PhaseReport, String>,
}

/// Summary of one full pipeline pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    /// Pass number, starting at 1
    pub pass: u64,
    pub outcomes: Vec<PhaseOutcome>,
    pub duration: Duration,
}

impl PassReport {
    /// Counts reported by a phase, if it succeeded
    pub fn phase(&self, name: &str) -> Option<&PhaseReport> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.phase == name)
            .and_then(|outcome| outcome.result.as_ref().ok())
    }

    /// Names of phases that were abandoned this pass
    pub fn failed_phases(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .map(|outcome| outcome.phase)
            .collect()
    }

    /// Missions moved forward across all phases
    pub fn advanced(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok())
            .map(|report| report.advanced)
            .sum()
    }
}

/// Phases executed strictly in sequence
pub struct Pipeline {
    phases: Vec<Box<dyn Phase>>,
}

impl Pipeline {
    pub fn new(phases: Vec<Box<dyn Phase>>) -> Self {
        Self { phases }
    }

    /// pending, staked, stake_pending, restaked, canceled, cancel_verify
    pub fn standard(config: &EngineConfig) -> Self {
        Self::new(standard_phases(config))
    }

    pub fn phase_names(&self) -> Vec<&'static str> {
        self.phases.iter().map(|phase| phase.name()).collect()
    }

    /// Confirmation tracker of the named phase
    pub fn tracker(&self, name: &str) -> Option<&ConfirmationTracker> {
        self.phases
            .iter()
            .find(|phase| phase.name() == name)
            .and_then(|phase| phase.tracker())
    }

    /// Run every phase once, in order
    ///
    /// A failing phase is logged and the pass continues with the next one.
    pub async fn run_pass(&mut self, ctx: &PhaseContext, pass: u64) -> PassReport {
        let started = Instant::now();
        let mut outcomes = Vec::with_capacity(self.phases.len());

        for phase in self.phases.iter_mut() {
            let name = phase.name();
            let result = match phase.run(ctx).await {
                Ok(report) => {
                    debug!(pass, phase = name, ?report, "Phase finished");
                    Ok(report)
                }
                Err(e) => {
                    error!(pass, phase = name, error = %e, "Phase failed, continuing with next phase");
                    Err(e.to_string())
                }
            };
            outcomes.push(PhaseOutcome {
                phase: name,
                result,
            });
        }

        PassReport {
            pass,
            outcomes,
            duration: started.elapsed(),
        }
    }
}
