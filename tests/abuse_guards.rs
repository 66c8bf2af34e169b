// tests/abuse_guards.rs
//
// The abuse-protection layer observed through full pipeline runs: breaker
// short-circuit, breaker trip on sink outage, and the global reply cap.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use common::{build_state, post, CountingSink, ScriptedSource};
use community_risk_sentinel::abuse::BreakerState;
use community_risk_sentinel::config::SentinelConfig;
use community_risk_sentinel::pipeline::run_pipeline;
use community_risk_sentinel::store::{MemoryStore, ScopeActivation, ScopeStatus, Store};

async fn activate(store: &MemoryStore, scope: &str) {
    store
        .upsert_activation(ScopeActivation {
            scope_id: scope.to_string(),
            status: ScopeStatus::Active,
            activated_at: Utc::now(),
            activated_by: "mod-0".to_string(),
        })
        .await
        .unwrap();
}

fn scam_posts(n: usize) -> Vec<community_risk_sentinel::NormalizedPost> {
    (0..n)
        .map(|i| {
            post(
                &format!("p{i}"),
                "s1",
                &format!("a{i}"),
                "fresh drop on pumpfun right here",
            )
        })
        .collect()
}

#[tokio::test]
async fn open_breaker_short_circuits_the_whole_run() {
    let store = Arc::new(MemoryStore::new());
    activate(&store, "s1").await;

    let mut timelines = HashMap::new();
    timelines.insert("s1".to_string(), scam_posts(3));
    let source = Arc::new(ScriptedSource {
        timelines,
        mentions: vec![],
    });
    let sink = CountingSink::ok();

    let state = build_state(
        SentinelConfig::default(),
        store.clone(),
        source,
        sink.clone(),
        HashMap::new(),
    );

    // Trip the breaker before the run.
    for _ in 0..5 {
        state.breaker.record_failure(Utc::now());
    }

    let report = run_pipeline(&state).await.unwrap();
    assert_eq!(report.skipped.as_deref(), Some("circuit breaker open"));
    assert_eq!(report.ingested, 0);
    assert_eq!(report.decisions_created, 0);
    assert_eq!(sink.sent_count(), 0);
}

#[tokio::test]
async fn sink_outage_trips_the_breaker_mid_run() {
    let store = Arc::new(MemoryStore::new());
    activate(&store, "s1").await;

    let mut timelines = HashMap::new();
    timelines.insert("s1".to_string(), scam_posts(7));
    let source = Arc::new(ScriptedSource {
        timelines,
        mentions: vec![],
    });
    let sink = CountingSink::failing();

    let state = build_state(
        SentinelConfig::default(),
        store.clone(),
        source,
        sink.clone(),
        HashMap::new(),
    );

    let report = run_pipeline(&state).await.unwrap();
    // Five sends fail and trip the breaker; the remaining two attempts are
    // refused before reaching the sink.
    assert_eq!(report.replies_attempted, 7);
    assert_eq!(report.replies_succeeded, 0);
    assert_eq!(report.reply_errors.len(), 7);
    assert_eq!(sink.sent_count(), 5);
    assert_eq!(state.breaker.state(), BreakerState::Open);
    assert!(report
        .reply_errors
        .iter()
        .any(|e| e.contains("circuit breaker open")));

    // Every decision is still recorded, reply or not.
    assert_eq!(report.decisions_created, 7);
    let records = store.recent_decisions(10).await.unwrap();
    assert!(records.iter().all(|r| r.reply_id.is_none()));
}

#[tokio::test]
async fn global_cap_limits_outbound_replies_per_window() {
    let store = Arc::new(MemoryStore::new());
    activate(&store, "s1").await;

    let mut timelines = HashMap::new();
    timelines.insert("s1".to_string(), scam_posts(4));
    let source = Arc::new(ScriptedSource {
        timelines,
        mentions: vec![],
    });
    let sink = CountingSink::ok();

    let mut config = SentinelConfig::default();
    config.limiter.global_replies_per_minute = 2;

    let state = build_state(config, store.clone(), source, sink.clone(), HashMap::new());

    let report = run_pipeline(&state).await.unwrap();
    assert_eq!(report.replies_attempted, 4);
    assert_eq!(report.replies_succeeded, 2);
    assert_eq!(sink.sent_count(), 2);
    assert_eq!(
        report
            .reply_errors
            .iter()
            .filter(|e| e.contains("rate limit"))
            .count(),
        2
    );
    // Rate-limited posts still get their decision record.
    assert_eq!(report.decisions_created, 4);
}
