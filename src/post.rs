//! Platform-agnostic post shape produced by ingestion.
//!
//! A `NormalizedPost` is immutable once it leaves the ingestion layer; the
//! classifier and orchestrator only ever read it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author metadata attached to a post. All fields are best-effort; the
/// platform bridge may not expose every one of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follower_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_age_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

/// A single observed post, normalized away from any platform wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPost {
    pub post_id: String,
    pub author_id: String,
    #[serde(default)]
    pub author: AuthorMeta,
    pub text: String,
    #[serde(default)]
    pub links: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// The community the post was observed in.
    pub scope_id: String,
    /// True when the post was recovered from a direct mention (someone
    /// explicitly tagged the bot in a reply), rather than observed passively
    /// on a scope timeline.
    #[serde(default)]
    pub from_mention: bool,
}

impl NormalizedPost {
    /// Structural sanity: id, author and scope must be present before the
    /// post can enter the decision pipeline.
    pub fn is_well_formed(&self) -> bool {
        !self.post_id.is_empty() && !self.author_id.is_empty() && !self.scope_id.is_empty()
    }
}
