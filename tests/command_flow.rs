// tests/command_flow.rs
//
// Activation/deactivation through the pipeline: moderator verification,
// the per-actor cooldown, and activation history.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{build_state, mention, mods, CountingSink, ScriptedSource};
use community_risk_sentinel::config::SentinelConfig;
use community_risk_sentinel::pipeline::run_pipeline;
use community_risk_sentinel::store::{MemoryStore, ScopeStatus, Store};

#[tokio::test]
async fn moderator_activation_turns_a_scope_on() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(ScriptedSource {
        timelines: HashMap::new(),
        mentions: vec![mention(
            "c1",
            "s1",
            "mod-1",
            "hey @Comm_Sentinel activate please",
        )],
    });
    let state = build_state(
        SentinelConfig::default(),
        store.clone(),
        source,
        CountingSink::ok(),
        mods("s1", &["mod-1"]),
    );

    let report = run_pipeline(&state).await.unwrap();
    assert_eq!(report.commands_processed, 1);
    // Commands are never classified, so nothing was recorded.
    assert_eq!(report.decisions_created, 0);
    assert_eq!(store.active_scope_ids().await.unwrap(), vec!["s1"]);
}

#[tokio::test]
async fn non_moderators_are_refused() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(ScriptedSource {
        timelines: HashMap::new(),
        mentions: vec![mention("c1", "s1", "rando-7", "@Comm_Sentinel activate")],
    });
    let state = build_state(
        SentinelConfig::default(),
        store.clone(),
        source,
        CountingSink::ok(),
        mods("s1", &["mod-1"]),
    );

    let report = run_pipeline(&state).await.unwrap();
    assert_eq!(report.commands_processed, 0);
    assert!(store.active_scope_ids().await.unwrap().is_empty());
}

#[tokio::test]
async fn second_command_from_the_same_actor_hits_the_cooldown() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(ScriptedSource {
        timelines: HashMap::new(),
        mentions: vec![
            mention("c1", "s1", "mod-1", "@Comm_Sentinel activate"),
            mention("c2", "s1", "mod-1", "@Comm_Sentinel deactivate"),
        ],
    });
    let state = build_state(
        SentinelConfig::default(),
        store.clone(),
        source,
        CountingSink::ok(),
        mods("s1", &["mod-1"]),
    );

    let report = run_pipeline(&state).await.unwrap();
    // The activation lands; the deactivation 60s-cooldown-refuses.
    assert_eq!(report.commands_processed, 1);
    assert_eq!(store.active_scope_ids().await.unwrap(), vec!["s1"]);
}

#[tokio::test]
async fn deactivation_flips_status_but_keeps_history() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(ScriptedSource {
        timelines: HashMap::new(),
        mentions: vec![
            mention("c1", "s1", "mod-1", "@Comm_Sentinel activate"),
            mention("c2", "s1", "mod-2", "@Comm_Sentinel deactivate"),
        ],
    });
    let state = build_state(
        SentinelConfig::default(),
        store.clone(),
        source,
        CountingSink::ok(),
        mods("s1", &["mod-1", "mod-2"]),
    );

    let report = run_pipeline(&state).await.unwrap();
    assert_eq!(report.commands_processed, 2);
    assert!(store.active_scope_ids().await.unwrap().is_empty());

    let scopes = store.scope_activations().await.unwrap();
    assert_eq!(scopes.len(), 1);
    assert_eq!(scopes[0].status, ScopeStatus::Inactive);
    // Who activated it, and when, survives the deactivation.
    assert_eq!(scopes[0].activated_by, "mod-1");
}

#[tokio::test]
async fn command_posts_with_risky_wording_are_still_commands() {
    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(ScriptedSource {
        timelines: HashMap::new(),
        mentions: vec![mention(
            "c1",
            "s1",
            "mod-1",
            "@Comm_Sentinel activate now, dev is selling and it's chaos",
        )],
    });
    let state = build_state(
        SentinelConfig::default(),
        store.clone(),
        source,
        CountingSink::ok(),
        mods("s1", &["mod-1"]),
    );

    let report = run_pipeline(&state).await.unwrap();
    assert_eq!(report.commands_processed, 1);
    // The manipulative wording inside the command never reaches the
    // classifier.
    assert_eq!(report.decisions_created, 0);
    assert!(store.recent_decisions(10).await.unwrap().is_empty());
}
