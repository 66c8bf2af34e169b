//! # Rate Limiter
//! One keyed-window mechanism behind three policies: per-scope ingestion
//! caps, strict per-actor command cooldowns, and the global outbound cap.
//!
//! The clock is always supplied by the caller (`DateTime<Utc>`), never read
//! internally, so tests advance a controllable clock instead of sleeping.
//! Check and increment happen under one lock; concurrent callers on the same
//! key never observe a stale count.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    reset_at: DateTime<Utc>,
}

/// Limits for the three built-in policies. Loaded from config; the defaults
/// match production settings.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct LimiterPolicy {
    /// Posts accepted per scope per minute before ingestion sheds the rest.
    pub scope_posts_per_minute: u32,
    /// Seconds an actor must wait between activation/deactivation commands.
    pub command_cooldown_secs: i64,
    /// Outbound replies allowed per minute across the whole process.
    pub global_replies_per_minute: u32,
}

impl Default for LimiterPolicy {
    fn default() -> Self {
        Self {
            scope_posts_per_minute: 30,
            command_cooldown_secs: 60,
            global_replies_per_minute: 100,
        }
    }
}

/// Keyed sliding/fixed-window counters. Entries are ephemeral: recreated
/// whenever their window expires.
#[derive(Debug)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, WindowEntry>>,
    policy: LimiterPolicy,
}

impl RateLimiter {
    pub fn new(policy: LimiterPolicy) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> &LimiterPolicy {
        &self.policy
    }

    /// Core check: lazily create or reset the window for `key`, then admit
    /// up to `limit` hits before refusing within the current window.
    pub fn allow(&self, key: &str, limit: u32, window: Duration, now: DateTime<Utc>) -> bool {
        let mut windows = self.windows.lock().expect("limiter mutex poisoned");
        let entry = windows.entry(key.to_string()).or_insert(WindowEntry {
            count: 0,
            reset_at: now + window,
        });
        if now > entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + window;
        }
        if entry.count >= limit {
            return false;
        }
        entry.count += 1;
        true
    }

    /// Per-scope ingestion throughput cap.
    pub fn allow_scope_ingestion(&self, scope_id: &str, now: DateTime<Utc>) -> bool {
        self.allow(
            &format!("scope:{scope_id}"),
            self.policy.scope_posts_per_minute,
            Duration::minutes(1),
            now,
        )
    }

    /// Strict single-slot cooldown: a second command from the same actor
    /// within the window is refused outright, regardless of count.
    pub fn allow_actor_command(&self, actor_id: &str, now: DateTime<Utc>) -> bool {
        let key = format!("cmd:{actor_id}");
        let mut windows = self.windows.lock().expect("limiter mutex poisoned");
        if let Some(entry) = windows.get(&key) {
            if now < entry.reset_at {
                return false;
            }
        }
        windows.insert(
            key,
            WindowEntry {
                count: 1,
                reset_at: now + Duration::seconds(self.policy.command_cooldown_secs),
            },
        );
        true
    }

    /// Global outbound-reply cap: the last line of defense before any
    /// public action leaves the system.
    pub fn allow_global_reply(&self, now: DateTime<Utc>) -> bool {
        self.allow(
            "global:replies",
            self.policy.global_replies_per_minute,
            Duration::minutes(1),
            now,
        )
    }
}
