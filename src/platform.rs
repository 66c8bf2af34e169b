//! Platform-side collaborators: moderator verification and the outbound
//! reply sink.
//!
//! Production implementations speak to a bridge service over HTTP; the
//! bridge owns platform credentials, timeouts, and retry policy. The core
//! never retries on its own: a failed send is recorded and the pipeline
//! moves on.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Successful outbound reply, as acknowledged by the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentReply {
    pub id: String,
}

#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send_reply(&self, post_id: &str, author_id: &str, text: &str) -> Result<SentReply>;
    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait ModeratorVerifier: Send + Sync {
    /// True if `actor_id` is a moderator/admin of `scope_id`. Lookup
    /// failures count as "not verified".
    async fn is_moderator(&self, scope_id: &str, actor_id: &str) -> bool;
}

pub const ENV_REPLY_WEBHOOK_URL: &str = "REPLY_WEBHOOK_URL";
pub const ENV_MOD_BRIDGE_URL: &str = "MOD_BRIDGE_URL";

#[derive(Serialize)]
struct OutboundReplyPayload<'a> {
    post_id: &'a str,
    author_id: &'a str,
    text: &'a str,
}

/// Webhook-backed reply sink. Timeout and bounded retries live here, on the
/// collaborator side of the contract.
#[derive(Clone)]
pub struct WebhookReplySink {
    webhook: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl WebhookReplySink {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }
}

#[async_trait]
impl ReplySink for WebhookReplySink {
    async fn send_reply(&self, post_id: &str, author_id: &str, text: &str) -> Result<SentReply> {
        let payload = OutboundReplyPayload {
            post_id,
            author_id,
            text,
        };

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.webhook)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            match res {
                Ok(rsp) => {
                    if let Err(e) = rsp.error_for_status_ref() {
                        if attempt < self.max_retries {
                            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1)))
                                .await;
                            continue;
                        }
                        return Err(anyhow!("reply webhook HTTP error: {e}"));
                    }
                    let sent: SentReply = rsp.json().await.context("parse reply ack")?;
                    return Ok(sent);
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                        continue;
                    }
                    return Err(anyhow!("reply webhook request failed: {e}"));
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "WebhookReplySink"
    }
}

/// Stand-in when no webhook is configured: every send fails, which feeds
/// the circuit breaker exactly like a platform outage would.
pub struct DisabledSink;

#[async_trait]
impl ReplySink for DisabledSink {
    async fn send_reply(&self, _post_id: &str, _author_id: &str, _text: &str) -> Result<SentReply> {
        Err(anyhow!("reply sink not configured"))
    }

    fn name(&self) -> &'static str {
        "DisabledSink"
    }
}

/// Moderator lookup against the platform bridge.
pub struct HttpModeratorVerifier {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl HttpModeratorVerifier {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl ModeratorVerifier for HttpModeratorVerifier {
    async fn is_moderator(&self, scope_id: &str, actor_id: &str) -> bool {
        let url = format!("{}/scopes/{scope_id}/moderators/{actor_id}", self.base_url);
        match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(rsp) => rsp.status().is_success(),
            Err(e) => {
                warn!("moderator lookup failed, treating as unverified: {e:#}");
                false
            }
        }
    }
}

/// Static allowlist fallback for development: scope id → actor ids.
#[derive(Debug, Default, Clone)]
pub struct AllowlistVerifier {
    moderators: HashMap<String, Vec<String>>,
}

impl AllowlistVerifier {
    pub fn new(moderators: HashMap<String, Vec<String>>) -> Self {
        Self { moderators }
    }
}

#[async_trait]
impl ModeratorVerifier for AllowlistVerifier {
    async fn is_moderator(&self, scope_id: &str, actor_id: &str) -> bool {
        self.moderators
            .get(scope_id)
            .is_some_and(|actors| actors.iter().any(|a| a == actor_id))
    }
}

/// Build the reply sink from the environment.
pub fn build_reply_sink() -> Arc<dyn ReplySink> {
    match std::env::var(ENV_REPLY_WEBHOOK_URL) {
        Ok(url) if !url.trim().is_empty() => Arc::new(WebhookReplySink::new(url)),
        _ => {
            warn!("no reply webhook configured; outbound replies will fail");
            Arc::new(DisabledSink)
        }
    }
}

/// Build the moderator verifier: bridge lookup when configured, otherwise
/// the allowlist from config.
pub fn build_verifier(moderators: &HashMap<String, Vec<String>>) -> Arc<dyn ModeratorVerifier> {
    match std::env::var(ENV_MOD_BRIDGE_URL) {
        Ok(url) if !url.trim().is_empty() => Arc::new(HttpModeratorVerifier::new(url)),
        _ => Arc::new(AllowlistVerifier::new(moderators.clone())),
    }
}
