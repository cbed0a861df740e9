//! Reconciliation engine
//!
//! Owns the phase pipeline, the trackers inside it and the collaborators
//! the phases talk to. One engine instance drives one reconciliation loop;
//! nothing is shared between instances.

use crate::phases::PhaseContext;
use crate::pipeline::{PassReport, Pipeline};
use crate::tracker::ConfirmationTracker;
use stakeline_core::{Clock, EngineConfig, MissionTypeRegistry, ReconcilerConfig, SystemClock};
use stakeline_ledger::LedgerClient;
use stakeline_store::MissionStore;
use std::sync::Arc;
use tracing::{info, warn};

pub struct ReconcilerEngine {
    ctx: PhaseContext,
    pipeline: Pipeline,
    passes: u64,
}

impl ReconcilerEngine {
    /// Create an engine with the standard pipeline and the system clock
    pub fn new(
        store: Arc<dyn MissionStore>,
        ledger: Arc<dyn LedgerClient>,
        config: EngineConfig,
        mission_types: MissionTypeRegistry,
    ) -> Self {
        let pipeline = Pipeline::standard(&config);
        Self {
            ctx: PhaseContext {
                store,
                ledger,
                clock: Arc::new(SystemClock),
                mission_types,
                config,
            },
            pipeline,
            passes: 0,
        }
    }

    /// Create an engine from a loaded configuration
    pub fn from_config(
        store: Arc<dyn MissionStore>,
        ledger: Arc<dyn LedgerClient>,
        config: &ReconcilerConfig,
    ) -> Self {
        Self::new(
            store,
            ledger,
            config.engine.clone(),
            config.mission_types.clone(),
        )
    }

    /// Replace the clock used for window expiry and reward accrual
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.ctx.clock = clock;
        self
    }

    /// Replace the phase pipeline
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }

    /// Number of passes run so far
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Confirmation tracker of the named phase
    pub fn tracker(&self, phase: &str) -> Option<&ConfirmationTracker> {
        self.pipeline.tracker(phase)
    }

    /// Run every phase once
    pub async fn run_pass(&mut self) -> PassReport {
        self.passes += 1;
        let report = self.pipeline.run_pass(&self.ctx, self.passes).await;

        let failed = report.failed_phases();
        if failed.is_empty() {
            info!(
                pass = report.pass,
                advanced = report.advanced(),
                duration_ms = report.duration.as_millis() as u64,
                "Reconciliation pass complete"
            );
        } else {
            warn!(
                pass = report.pass,
                advanced = report.advanced(),
                failed_phases = ?failed,
                duration_ms = report.duration.as_millis() as u64,
                "Reconciliation pass complete with failed phases"
            );
        }

        report
    }
}
