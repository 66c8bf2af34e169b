//! Outbound reply composition and the gated send path.
//!
//! Tone is fixed per category. The composer may rephrase the template for
//! the specific post but never decides categories, scores, or thresholds,
//! and the default composer does no rephrasing at all.

pub mod polish;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::abuse::{CircuitBreaker, RateLimiter};
use crate::assessment::RiskCategory;
use crate::platform::ReplySink;
use crate::post::NormalizedPost;

/// Hard cap on outbound reply length.
pub const MAX_REPLY_CHARS: usize = 280;

/// Fixed-tone reply template per category.
pub fn template_for(category: RiskCategory) -> &'static str {
    match category {
        RiskCategory::ScamLink => {
            "Scam warning. This domain is already linked to wallet drains. \
             Reposting known scams isn't alpha, it's lazy."
        }
        RiskCategory::Impersonation => {
            "Impersonation flagged. Official/team claim with no verification. \
             Don't trust, verify."
        }
        RiskCategory::Manipulation | RiskCategory::CoordinatedSpam => {
            "Manipulation flagged. Insider claim posted with zero evidence. \
             Panic without proof is a liquidity tactic, not analysis."
        }
        RiskCategory::Redirect => {
            "Malicious pattern flagged. Negative claim plus a redirect in one \
             post, with no evidence. This pattern exists for one reason."
        }
    }
}

/// Truncate to the outbound cap, on a char boundary.
pub fn cap_reply(text: String) -> String {
    if text.chars().count() <= MAX_REPLY_CHARS {
        return text;
    }
    text.chars().take(MAX_REPLY_CHARS).collect()
}

#[async_trait]
pub trait ReplyComposer: Send + Sync {
    /// Phrase a reply for the category. Implementations must stay within
    /// the fixed tone and fall back to the raw template on any failure.
    async fn compose(&self, category: RiskCategory, post_text: &str) -> String;
}

/// Default composer: the fixed template, verbatim.
pub struct TemplateComposer;

#[async_trait]
impl ReplyComposer for TemplateComposer {
    async fn compose(&self, category: RiskCategory, _post_text: &str) -> String {
        template_for(category).to_string()
    }
}

/// Outcome of one gated reply attempt. A refusal (breaker open, rate limit)
/// lands in `error` like any send failure would, but it is a policy branch,
/// not a fault.
#[derive(Debug, Clone, Default)]
pub struct ReplyOutcome {
    pub reply_id: Option<String>,
    pub error: Option<String>,
}

impl ReplyOutcome {
    fn refused(reason: &str) -> Self {
        Self {
            reply_id: None,
            error: Some(reason.to_string()),
        }
    }
}

/// The gated reply path: circuit breaker, then the global outbound cap,
/// then compose and send. Send outcomes feed back into the breaker.
pub struct Replier {
    breaker: Arc<CircuitBreaker>,
    limiter: Arc<RateLimiter>,
    composer: Arc<dyn ReplyComposer>,
    sink: Arc<dyn ReplySink>,
}

impl Replier {
    pub fn new(
        breaker: Arc<CircuitBreaker>,
        limiter: Arc<RateLimiter>,
        composer: Arc<dyn ReplyComposer>,
        sink: Arc<dyn ReplySink>,
    ) -> Self {
        Self {
            breaker,
            limiter,
            composer,
            sink,
        }
    }

    pub async fn reply_to_risky_post(
        &self,
        post: &NormalizedPost,
        category: RiskCategory,
        now: DateTime<Utc>,
    ) -> ReplyOutcome {
        if self.breaker.is_open(now) {
            warn!("reply skipped: circuit breaker open");
            return ReplyOutcome::refused("circuit breaker open");
        }
        if !self.limiter.allow_global_reply(now) {
            warn!("reply skipped: rate limit (global replies)");
            return ReplyOutcome::refused("rate limit (global replies)");
        }

        let text = cap_reply(self.composer.compose(category, &post.text).await);
        match self
            .sink
            .send_reply(&post.post_id, &post.author_id, &text)
            .await
        {
            Ok(sent) => {
                self.breaker.record_success();
                ReplyOutcome {
                    reply_id: Some(sent.id),
                    error: None,
                }
            }
            Err(e) => {
                self.breaker.record_failure(Utc::now());
                ReplyOutcome {
                    reply_id: None,
                    error: Some(format!("{e:#}")),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_a_template_under_the_cap() {
        for c in [
            RiskCategory::ScamLink,
            RiskCategory::Impersonation,
            RiskCategory::Manipulation,
            RiskCategory::Redirect,
            RiskCategory::CoordinatedSpam,
        ] {
            let t = template_for(c);
            assert!(!t.is_empty());
            assert!(t.chars().count() <= MAX_REPLY_CHARS);
        }
    }

    #[test]
    fn over_long_replies_are_truncated() {
        let long = "y".repeat(400);
        assert_eq!(cap_reply(long).chars().count(), MAX_REPLY_CHARS);
    }

    #[tokio::test]
    async fn template_composer_ignores_post_text() {
        let c = TemplateComposer;
        let a = c.compose(RiskCategory::ScamLink, "anything").await;
        let b = c.compose(RiskCategory::ScamLink, "else").await;
        assert_eq!(a, b);
    }
}
