//! Optional LLM polish for reply templates (bounded).
//!
//! The model is only ever asked to rephrase the fixed template so it
//! addresses the specific post. It is never consulted about categories,
//! scores, or thresholds, and any failure (transport error, empty answer,
//! over-length output) falls back to the template verbatim.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{template_for, ReplyComposer, TemplateComposer, MAX_REPLY_CHARS};
use crate::assessment::RiskCategory;

pub const ENV_POLISH_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_POLISH_ENABLED: &str = "REPLY_POLISH";

const POLISH_MODEL: &str = "gpt-4o-mini";
const POLISH_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Immutable tone contract sent with every polish request.
const SYSTEM_PROMPT: &str = "You rephrase moderation notices for a community \
safeguard bot. Tone: authoritative, dry, dismissive of bad behavior, never \
abusive. Rules (immutable): attack behavior, not identity; never insult \
protected classes; never invent facts or claim evidence you don't have; \
never escalate beyond professional dismissiveness. Output only the notice \
text, at most 200 characters.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Composer that asks a chat model to rephrase the template for the post.
pub struct PolishComposer {
    api_key: String,
    client: Client,
    timeout: Duration,
}

impl PolishComposer {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
            timeout: Duration::from_secs(8),
        }
    }

    async fn rephrase(&self, category: RiskCategory, base: &str, post_text: &str) -> Result<Option<String>> {
        let excerpt: String = post_text.chars().take(200).collect();
        let category_label = serde_json::to_value(category)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();

        let req = ChatRequest {
            model: POLISH_MODEL,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Rephrase this {category_label} notice so it addresses the \
                         specific claims in the post. Base notice: \"{base}\"\n\n\
                         Post content: \"{}\"\n\nDo not invent facts. Keep the tone.",
                        excerpt.trim()
                    ),
                },
            ],
            max_tokens: 100,
            temperature: 0.3,
        };

        let rsp = self
            .client
            .post(POLISH_ENDPOINT)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&req)
            .send()
            .await
            .context("polish request")?
            .error_for_status()
            .context("polish status")?;

        let body: ChatResponse = rsp.json().await.context("polish body")?;
        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string());

        Ok(text.filter(|t| !t.is_empty() && t.chars().count() <= MAX_REPLY_CHARS))
    }
}

#[async_trait]
impl ReplyComposer for PolishComposer {
    async fn compose(&self, category: RiskCategory, post_text: &str) -> String {
        let base = template_for(category);
        match self.rephrase(category, base, post_text).await {
            Ok(Some(text)) => text,
            Ok(None) => base.to_string(),
            Err(e) => {
                warn!("reply polish failed, using template: {e:#}");
                base.to_string()
            }
        }
    }
}

/// Factory: polish only when explicitly enabled and a key is present;
/// otherwise the plain template composer.
pub fn build_composer() -> Arc<dyn ReplyComposer> {
    let enabled = std::env::var(ENV_POLISH_ENABLED)
        .map(|v| v == "1")
        .unwrap_or(false);
    if !enabled {
        return Arc::new(TemplateComposer);
    }
    match std::env::var(ENV_POLISH_API_KEY) {
        Ok(key) if !key.trim().is_empty() => Arc::new(PolishComposer::new(key)),
        _ => {
            warn!("reply polish enabled but no API key set; using templates");
            Arc::new(TemplateComposer)
        }
    }
}
