//! # Pipeline Orchestrator
//! One invocation: guard → ingest → dedupe → decide → act → record.
//!
//! Posts are processed strictly one at a time in the deduplicated, merged
//! order: outbound actions must observe the shared rate-limit and breaker
//! state without races. Overlapping invocations are serialized by a
//! run-level lock; the loser is declined, not queued. Nothing in here
//! retries: a failed reply feeds the breaker and the next scheduled run
//! picks the post up again through the idempotent dedupe.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use metrics::{counter, gauge};
use serde::Serialize;
use tracing::{info, warn};

use crate::assessment::{ActionTier, Assessment};
use crate::classifier::{self, AssessContext};
use crate::command::{self, Command, CommandOutcome};
use crate::post::NormalizedPost;
use crate::state::AppState;
use crate::store::DecisionRecord;

/// Aggregate result of one pipeline invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub ingested: usize,
    pub commands_processed: usize,
    pub decisions_created: usize,
    pub replies_attempted: usize,
    pub replies_succeeded: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reply_errors: Vec<String>,
    /// Set when the run did no work at all (breaker open, overlapping run).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl PipelineReport {
    fn skipped(reason: &str) -> Self {
        Self {
            skipped: Some(reason.to_string()),
            ..Default::default()
        }
    }
}

/// Run the full pipeline once. Policy refusals surface inside the report;
/// `Err` means the store itself is unavailable and the run is lost.
pub async fn run_pipeline(state: &AppState) -> Result<PipelineReport> {
    let Ok(_run_guard) = state.run_lock.try_lock() else {
        info!("pipeline declined: another run is in progress");
        return Ok(PipelineReport::skipped("run already in progress"));
    };

    counter!("pipeline_runs_total").increment(1);

    if state.breaker.is_open(Utc::now()) {
        counter!("pipeline_skipped_total").increment(1);
        return Ok(PipelineReport::skipped("circuit breaker open"));
    }

    // Ingestion targets come from the store; a store failure is fatal here.
    let scope_ids = state.store.active_scope_ids().await?;

    // Both sources fetched concurrently; a failed fetch is an empty batch
    // and never feeds the breaker.
    let (timeline_posts, mention_posts) =
        tokio::join!(fetch_timelines(state, &scope_ids), fetch_mentions(state));

    // Deterministic merge: timelines first, then mentions; first id wins.
    let mut seen: HashSet<String> = HashSet::new();
    let mut posts: Vec<NormalizedPost> = Vec::new();
    for post in timeline_posts.into_iter().chain(mention_posts) {
        if !seen.insert(post.post_id.clone()) {
            continue;
        }
        posts.push(post);
    }

    let mut report = PipelineReport {
        ingested: posts.len(),
        ..Default::default()
    };
    counter!("pipeline_posts_ingested_total").increment(posts.len() as u64);

    let decided = state.store.decided_post_ids().await?;

    // Batch-local author history feeds the coordination boost.
    let mut by_author: HashMap<&str, Vec<&str>> = HashMap::new();
    for p in &posts {
        by_author
            .entry(p.author_id.as_str())
            .or_default()
            .push(p.text.as_str());
    }

    for post in &posts {
        if decided.contains(&post.post_id) {
            continue;
        }
        if !post.is_well_formed() {
            warn!(scope = %post.scope_id, "skipping malformed post");
            continue;
        }

        // Commands short-circuit: they are never classified.
        if let Some(cmd) = command::parse_command(&post.text) {
            let outcome = match cmd {
                Command::Activate => {
                    state
                        .commands
                        .process_activation(&post.scope_id, &post.author_id, Utc::now())
                        .await?
                }
                Command::Deactivate => {
                    state
                        .commands
                        .process_deactivation(&post.scope_id, &post.author_id, Utc::now())
                        .await?
                }
            };
            match outcome {
                CommandOutcome::Honored { .. } => {
                    report.commands_processed += 1;
                    counter!("pipeline_commands_total").increment(1);
                }
                CommandOutcome::Refused { reason } => info!(%reason, "command refused"),
            }
            continue;
        }

        let ctx = coordination_context(post, &by_author);
        let Some(assessment) = classifier::assess(post, Some(&ctx)) else {
            continue;
        };

        info!(
            target: "pipeline",
            id = %anon_hash(&post.text),
            category = ?assessment.category,
            score = assessment.score,
            tier = ?assessment.tier,
            "post assessed"
        );

        // Mentions get a reply even at mod-alert tier: the requester
        // explicitly invoked the bot on that post.
        let should_reply = assessment.tier == ActionTier::Flag
            || (post.from_mention && assessment.tier == ActionTier::ModAlert);

        let mut reply_id = None;
        let mut response_time_ms = None;
        if should_reply {
            report.replies_attempted += 1;
            counter!("pipeline_replies_attempted_total").increment(1);
            let t0 = Instant::now();
            let outcome = state
                .replier
                .reply_to_risky_post(post, assessment.category, Utc::now())
                .await;
            response_time_ms = Some(t0.elapsed().as_millis() as u64);
            match outcome.reply_id {
                Some(id) => {
                    report.replies_succeeded += 1;
                    counter!("pipeline_replies_succeeded_total").increment(1);
                    reply_id = Some(id);
                }
                None => {
                    if let Some(e) = outcome.error {
                        report.reply_errors.push(e);
                    }
                }
            }
        }

        // The record is written whether or not the reply went out; the
        // reply outcome rides along in it.
        let Assessment {
            category,
            score,
            signals,
            tier,
        } = assessment;
        let record = DecisionRecord {
            post_id: post.post_id.clone(),
            scope_id: post.scope_id.clone(),
            category,
            score,
            signals,
            tier,
            reply_id,
            response_time_ms,
            created_at: Utc::now(),
        };
        if state.store.append_decision(record).await? {
            report.decisions_created += 1;
            counter!("pipeline_decisions_total").increment(1);
        } else {
            warn!(id = %anon_hash(&post.text), "decision already recorded, skipping duplicate write");
        }
    }

    gauge!("pipeline_last_run_ts").set(Utc::now().timestamp() as f64);
    info!(
        ingested = report.ingested,
        commands = report.commands_processed,
        decisions = report.decisions_created,
        replies_ok = report.replies_succeeded,
        "pipeline run complete"
    );
    Ok(report)
}

async fn fetch_timelines(state: &AppState, scope_ids: &[String]) -> Vec<NormalizedPost> {
    let mut out = Vec::new();
    for scope_id in scope_ids {
        match state.source.fetch_scope_timeline(scope_id).await {
            Ok(batch) => {
                for post in batch {
                    // Per-scope throughput cap sheds burst ingestion before
                    // it reaches classification.
                    if !state.limiter.allow_scope_ingestion(scope_id, Utc::now()) {
                        counter!("ingest_scope_capped_total").increment(1);
                        continue;
                    }
                    out.push(post);
                }
            }
            Err(e) => {
                counter!("ingest_source_errors_total").increment(1);
                warn!(scope = %scope_id, "scope timeline fetch failed: {e:#}");
            }
        }
    }
    out
}

async fn fetch_mentions(state: &AppState) -> Vec<NormalizedPost> {
    match state.source.fetch_mention_posts().await {
        Ok(batch) => batch,
        Err(e) => {
            counter!("ingest_source_errors_total").increment(1);
            warn!("mention fetch failed: {e:#}");
            Vec::new()
        }
    }
}

/// Recent texts by the same author within this batch, excluding the post
/// itself (one occurrence of its exact text).
fn coordination_context(
    post: &NormalizedPost,
    by_author: &HashMap<&str, Vec<&str>>,
) -> AssessContext {
    let mut recent: Vec<String> = Vec::new();
    if let Some(texts) = by_author.get(post.author_id.as_str()) {
        let mut skipped_self = false;
        for t in texts {
            if !skipped_self && *t == post.text {
                skipped_self = true;
                continue;
            }
            recent.push((*t).to_string());
        }
    }
    AssessContext {
        recent_by_author: recent,
    }
}

/// Short anonymized id for logs; post text is never logged raw.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
