// tests/common/mod.rs
// Shared mock collaborators for the integration suites.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;

use community_risk_sentinel::config::SentinelConfig;
use community_risk_sentinel::ingest::IngestSource;
use community_risk_sentinel::platform::{AllowlistVerifier, ReplySink, SentReply};
use community_risk_sentinel::reply::TemplateComposer;
use community_risk_sentinel::store::MemoryStore;
use community_risk_sentinel::{AppState, NormalizedPost};

pub fn post(id: &str, scope: &str, author: &str, text: &str) -> NormalizedPost {
    NormalizedPost {
        post_id: id.to_string(),
        author_id: author.to_string(),
        author: Default::default(),
        text: text.to_string(),
        links: vec![],
        created_at: Utc::now(),
        scope_id: scope.to_string(),
        from_mention: false,
    }
}

pub fn mention(id: &str, scope: &str, author: &str, text: &str) -> NormalizedPost {
    let mut p = post(id, scope, author, text);
    p.from_mention = true;
    p
}

/// Ingest source that returns pre-scripted batches.
#[derive(Default)]
pub struct ScriptedSource {
    pub timelines: HashMap<String, Vec<NormalizedPost>>,
    pub mentions: Vec<NormalizedPost>,
}

#[async_trait]
impl IngestSource for ScriptedSource {
    async fn fetch_scope_timeline(&self, scope_id: &str) -> Result<Vec<NormalizedPost>> {
        Ok(self.timelines.get(scope_id).cloned().unwrap_or_default())
    }

    async fn fetch_mention_posts(&self) -> Result<Vec<NormalizedPost>> {
        Ok(self.mentions.clone())
    }

    fn name(&self) -> &'static str {
        "ScriptedSource"
    }
}

/// Sink that counts sends and can be told to fail every one of them.
pub struct CountingSink {
    fail: bool,
    pub sent: AtomicUsize,
}

impl CountingSink {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            sent: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            sent: AtomicUsize::new(0),
        })
    }

    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReplySink for CountingSink {
    async fn send_reply(&self, _post_id: &str, _author_id: &str, _text: &str) -> Result<SentReply> {
        let n = self.sent.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(anyhow!("platform bridge unreachable"))
        } else {
            Ok(SentReply {
                id: format!("reply-{n}"),
            })
        }
    }

    fn name(&self) -> &'static str {
        "CountingSink"
    }
}

/// Full state with mocks everywhere and an in-memory store.
pub fn build_state(
    config: SentinelConfig,
    store: Arc<MemoryStore>,
    source: Arc<ScriptedSource>,
    sink: Arc<CountingSink>,
    moderators: HashMap<String, Vec<String>>,
) -> AppState {
    AppState::new(
        config,
        store,
        source,
        Arc::new(AllowlistVerifier::new(moderators)),
        sink,
        Arc::new(TemplateComposer),
    )
}

pub fn mods(scope: &str, actors: &[&str]) -> HashMap<String, Vec<String>> {
    let mut map = HashMap::new();
    map.insert(
        scope.to_string(),
        actors.iter().map(|a| a.to_string()).collect(),
    );
    map
}
