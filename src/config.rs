//! Runtime configuration: abuse-policy limits, scheduler cadence, and the
//! dev moderator allowlist.
//!
//! Loaded from `config/sentinel.toml`; every field has a default so the
//! service boots with no file present. Classifier weights and tier
//! thresholds are deliberately NOT configurable; they are fixed rules,
//! not tuning knobs.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::abuse::{BreakerPolicy, LimiterPolicy};

pub const DEFAULT_CONFIG_PATH: &str = "config/sentinel.toml";
pub const ENV_CONFIG_PATH: &str = "SENTINEL_CONFIG_PATH";

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub enabled: bool,
    /// Seconds between scheduled pipeline runs.
    pub interval_secs: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    pub limiter: LimiterPolicy,
    pub breaker: BreakerPolicy,
    pub scheduler: SchedulerSettings,
    /// Dev fallback when no moderator bridge is configured: scope id →
    /// actor ids allowed to (de)activate it.
    pub moderators: HashMap<String, Vec<String>>,
}

impl SentinelConfig {
    /// Load from `SENTINEL_CONFIG_PATH` or the default path. Falls back to
    /// defaults on a missing or unparsable file.
    pub fn load() -> Self {
        let path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(&path)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path.as_ref()) {
            Ok(s) => Self::from_toml_str(&s).unwrap_or_else(|e| {
                warn!("config parse failed, using defaults: {e:#}");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}
