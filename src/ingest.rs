//! Ingestion contract and post-body normalization.
//!
//! Two sources feed the pipeline: activated scope timelines and posts
//! recovered from direct mentions (each mention resolves to the post it
//! replied to). Fetch failures are transient: the source returns an error,
//! the orchestrator treats it as an empty batch and moves on. Ingestion
//! failures never feed the circuit breaker; only outbound actions do.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

use crate::post::NormalizedPost;

/// Scope id assigned to mention-derived posts.
pub const MENTIONS_SCOPE_ID: &str = "mentions";

#[async_trait]
pub trait IngestSource: Send + Sync {
    /// Recent posts from one activated scope's timeline.
    async fn fetch_scope_timeline(&self, scope_id: &str) -> Result<Vec<NormalizedPost>>;

    /// Posts recovered from direct mentions of the bot.
    async fn fetch_mention_posts(&self) -> Result<Vec<NormalizedPost>>;

    fn name(&self) -> &'static str;
}

/// Normalize post text: decode HTML entities, strip tags, fold smart quotes
/// to ASCII, collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Length cap: 1000 chars
    if out.chars().count() > 1000 {
        out = out.chars().take(1000).collect();
    }

    out
}

/// Apply text normalization to a batch in place.
pub fn normalize_batch(posts: &mut [NormalizedPost]) {
    for post in posts.iter_mut() {
        post.text = normalize_text(&post.text);
    }
}

pub const ENV_INGEST_BRIDGE_URL: &str = "INGEST_BRIDGE_URL";

/// HTTP source reading normalized posts from the platform bridge. The
/// bridge owns platform credentials and wire formats; this client only
/// consumes its JSON.
pub struct HttpIngestSource {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl HttpIngestSource {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    async fn fetch(&self, path: &str) -> Result<Vec<NormalizedPost>> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("fetch {url}"))?;
        let resp = resp.error_for_status().with_context(|| format!("status for {url}"))?;
        let mut posts: Vec<NormalizedPost> =
            resp.json().await.with_context(|| format!("parse body of {url}"))?;
        normalize_batch(&mut posts);
        Ok(posts)
    }
}

#[async_trait]
impl IngestSource for HttpIngestSource {
    async fn fetch_scope_timeline(&self, scope_id: &str) -> Result<Vec<NormalizedPost>> {
        self.fetch(&format!("/scopes/{scope_id}/posts")).await
    }

    async fn fetch_mention_posts(&self) -> Result<Vec<NormalizedPost>> {
        let mut posts = self.fetch("/mentions/resolved").await?;
        for p in posts.iter_mut() {
            p.from_mention = true;
            if p.scope_id.is_empty() {
                p.scope_id = MENTIONS_SCOPE_ID.to_string();
            }
        }
        Ok(posts)
    }

    fn name(&self) -> &'static str {
        "HttpIngestSource"
    }
}

/// Stand-in when no bridge is configured: every fetch yields an empty
/// batch, so the pipeline runs but observes nothing.
pub struct DisabledSource;

#[async_trait]
impl IngestSource for DisabledSource {
    async fn fetch_scope_timeline(&self, _scope_id: &str) -> Result<Vec<NormalizedPost>> {
        Ok(Vec::new())
    }

    async fn fetch_mention_posts(&self) -> Result<Vec<NormalizedPost>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "DisabledSource"
    }
}

/// Build the ingestion source from the environment.
pub fn build_source() -> std::sync::Arc<dyn IngestSource> {
    match std::env::var(ENV_INGEST_BRIDGE_URL) {
        Ok(url) if !url.trim().is_empty() => std::sync::Arc::new(HttpIngestSource::new(url)),
        _ => {
            warn!("no ingest bridge configured; ingestion disabled");
            std::sync::Arc::new(DisabledSource)
        }
    }
}
