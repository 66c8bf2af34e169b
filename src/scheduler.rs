// src/scheduler.rs
//! Background trigger: periodic pipeline runs. Carries no logic of its own
//! beyond invoking the orchestrator and logging the aggregate.

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::pipeline;
use crate::state::AppState;

pub const ENV_INTERVAL_SECS: &str = "PIPELINE_INTERVAL_SECS";

/// Spawn the periodic pipeline ticker. The interval comes from the env
/// override or config; it is floored at 5s to keep a bad value from
/// busy-looping.
pub fn spawn_pipeline_scheduler(state: AppState) -> JoinHandle<()> {
    let interval_secs: u64 = std::env::var(ENV_INTERVAL_SECS)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(state.config.scheduler.interval_secs)
        .max(5);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            match pipeline::run_pipeline(&state).await {
                Ok(report) => {
                    info!(
                        target: "scheduler",
                        ingested = report.ingested,
                        decisions = report.decisions_created,
                        replies_ok = report.replies_succeeded,
                        skipped = ?report.skipped,
                        "pipeline tick"
                    );
                }
                Err(e) => {
                    // Store was unreachable; the run is lost and the next
                    // tick retries via the idempotent dedupe.
                    warn!("scheduled pipeline run failed: {e:#}");
                }
            }
        }
    })
}
