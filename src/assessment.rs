//! Assessment output types: risk category, action tier, score helpers.
//!
//! An `Assessment` is produced fresh per post and never mutated afterwards;
//! the durable shape is the `DecisionRecord` in `store`.

use serde::{Deserialize, Serialize};

/// Closed set of risk categories the rule engine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    ScamLink,
    Impersonation,
    Manipulation,
    Redirect,
    CoordinatedSpam,
}

/// Action level an assessment maps to.
/// `Flag` → public reply, `ModAlert` → private/internal, `LogOnly` → silent record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTier {
    Flag,
    ModAlert,
    LogOnly,
}

/// Score at or above this goes public.
pub const FLAG_THRESHOLD: f32 = 0.75;
/// Score at or above this (but below `FLAG_THRESHOLD`) alerts moderators.
pub const MOD_ALERT_THRESHOLD: f32 = 0.60;

/// Tier is a pure function of the score; detectors that hardcode a tier
/// (scam domains, impersonation) bypass this mapping deliberately.
pub fn tier_for(score: f32) -> ActionTier {
    if score >= FLAG_THRESHOLD {
        ActionTier::Flag
    } else if score >= MOD_ALERT_THRESHOLD {
        ActionTier::ModAlert
    } else {
        ActionTier::LogOnly
    }
}

/// Output of classification: one category, a clamped score, the ordered
/// signal tags that justify it (audit only, never re-parsed), and the tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub category: RiskCategory,
    /// Risk score in `[0.0, 1.0]`.
    pub score: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signals: Vec<String>,
    pub tier: ActionTier,
}

impl Assessment {
    pub fn new(category: RiskCategory, score: f32, tier: ActionTier) -> Self {
        Self {
            category,
            score: clamp01(score),
            signals: Vec::new(),
            tier,
        }
    }

    /// Appends one signal tag (builder style).
    pub fn with_signal(mut self, signal: impl Into<String>) -> Self {
        self.signals.push(signal.into());
        self
    }
}

pub fn clamp01(x: f32) -> f32 {
    if x < 0.0 {
        0.0
    } else if x > 1.0 {
        1.0
    } else {
        x
    }
}
