//! Shared application state wired into the router and background jobs.
//!
//! Everything mutable (rate-limit windows, breaker state) lives behind the
//! `Arc`s constructed here; there is no module-global state, so tests can
//! build fully isolated instances.

use std::sync::Arc;

use crate::abuse::{CircuitBreaker, RateLimiter};
use crate::command::CommandEngine;
use crate::config::SentinelConfig;
use crate::ingest::IngestSource;
use crate::platform::{ModeratorVerifier, ReplySink};
use crate::reply::{Replier, ReplyComposer};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SentinelConfig>,
    pub limiter: Arc<RateLimiter>,
    pub breaker: Arc<CircuitBreaker>,
    pub store: Arc<dyn Store>,
    pub source: Arc<dyn IngestSource>,
    pub replier: Arc<Replier>,
    pub commands: Arc<CommandEngine>,
    pub composer: Arc<dyn ReplyComposer>,
    /// Serializes pipeline invocations: a second concurrent trigger is
    /// declined rather than interleaved with the first.
    pub run_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(
        config: SentinelConfig,
        store: Arc<dyn Store>,
        source: Arc<dyn IngestSource>,
        verifier: Arc<dyn ModeratorVerifier>,
        sink: Arc<dyn ReplySink>,
        composer: Arc<dyn ReplyComposer>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.limiter));
        let breaker = Arc::new(CircuitBreaker::new(config.breaker));
        let replier = Arc::new(Replier::new(
            breaker.clone(),
            limiter.clone(),
            composer.clone(),
            sink,
        ));
        let commands = Arc::new(CommandEngine::new(limiter.clone(), verifier, store.clone()));

        Self {
            config: Arc::new(config),
            limiter,
            breaker,
            store,
            source,
            replier,
            commands,
            composer,
            run_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}
