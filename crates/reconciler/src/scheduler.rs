//! Fixed-cadence scheduler
//!
//! The next pass is armed only after the previous one has finished, so
//! passes never overlap regardless of how slow the store or ledger are.
//! Shutdown is only observed while waiting between passes.

use crate::engine::ReconcilerEngine;
use std::future::Future;
use std::time::Duration;
use tracing::info;

pub struct Scheduler {
    engine: ReconcilerEngine,
    cadence: Duration,
}

impl Scheduler {
    /// Schedule `engine` at its configured cadence
    pub fn new(engine: ReconcilerEngine) -> Self {
        let cadence = engine.config().cadence();
        Self { engine, cadence }
    }

    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    /// Run passes for the lifetime of the process
    pub async fn run(self) {
        self.run_until(std::future::pending::<()>()).await;
    }

    /// Run passes until `shutdown` resolves, then hand the engine back
    pub async fn run_until<F>(mut self, shutdown: F) -> ReconcilerEngine
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(cadence_ms = self.cadence.as_millis() as u64, "Scheduler started");

        loop {
            self.engine.run_pass().await;

            tokio::select! {
                _ = tokio::time::sleep(self.cadence) => {}
                _ = &mut shutdown => {
                    info!(passes = self.engine.passes(), "Shutdown requested, scheduler stopped");
                    break;
                }
            }
        }

        self.engine
    }
}
