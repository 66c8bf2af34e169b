//! Community Risk Sentinel — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the store, platform collaborators,
//! shared state, and the background pipeline scheduler.
//!
//! See `README.md` for quickstart and `DESIGN.md` for architecture notes.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use community_risk_sentinel::config::SentinelConfig;
use community_risk_sentinel::metrics::Metrics;
use community_risk_sentinel::reply::polish;
use community_risk_sentinel::store::JsonStore;
use community_risk_sentinel::{api, ingest, platform, scheduler, AppState};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - SENTINEL_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("SENTINEL_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pipeline=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments. This enables the
    // bridge/webhook endpoints and SENTINEL_CONFIG_PATH from .env.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let config = SentinelConfig::load();
    let metrics = Metrics::init();

    // Decisions and activations must be durable; refusing to boot beats
    // silently dropping records.
    let store = Arc::new(
        JsonStore::open_default()
            .await
            .expect("Failed to open decision store"),
    );

    let source = ingest::build_source();
    let verifier = platform::build_verifier(&config.moderators);
    let sink = platform::build_reply_sink();
    let composer = polish::build_composer();

    let state = AppState::new(config, store, source, verifier, sink, composer);

    if state.config.scheduler.enabled {
        scheduler::spawn_pipeline_scheduler(state.clone());
    }

    let router = api::create_router(state).merge(metrics.router());
    Ok(router.into())
}
