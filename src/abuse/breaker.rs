//! # Circuit Breaker
//! Process-wide failure-rate guard for outbound actions. One breaker gates
//! every outbound reply system-wide; there is no per-scope granularity.
//!
//! The open → half-open transition is lazy: it happens inside `is_open`
//! once the cooldown has elapsed, so the query itself admits exactly one
//! probe. A success while half-open closes the breaker and resets the
//! failure count; a failure while half-open keeps it tripped because the
//! count is already at the threshold.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct BreakerPolicy {
    /// Consecutive failures (since the last success) that trip the breaker.
    pub failure_threshold: u32,
    /// Seconds after the last failure before one probe is allowed through.
    pub cooldown_secs: i64,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_secs: 120,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    failures: u32,
    last_failure_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    policy: BreakerPolicy,
}

impl CircuitBreaker {
    pub fn new(policy: BreakerPolicy) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                failures: 0,
                last_failure_at: None,
            }),
            policy,
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");
        if inner.state == BreakerState::HalfOpen {
            inner.state = BreakerState::Closed;
            inner.failures = 0;
        }
    }

    pub fn record_failure(&self, now: DateTime<Utc>) {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");
        inner.failures += 1;
        inner.last_failure_at = Some(now);
        if inner.failures >= self.policy.failure_threshold {
            inner.state = BreakerState::Open;
        }
    }

    /// Refuse-or-allow query. `open` within cooldown → true. `open` past
    /// cooldown → flips to half-open as a side effect and returns false,
    /// letting one probe through. `closed`/`half-open` → false.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");
        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => false,
            BreakerState::Open => {
                let cooled = inner
                    .last_failure_at
                    .map(|t| now - t > Duration::seconds(self.policy.cooldown_secs))
                    .unwrap_or(true);
                if cooled {
                    inner.state = BreakerState::HalfOpen;
                    false
                } else {
                    true
                }
            }
        }
    }

    /// Diagnostics snapshot (no transition side effects).
    pub fn state(&self) -> BreakerState {
        self.inner.lock().expect("breaker mutex poisoned").state
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().expect("breaker mutex poisoned").failures
    }
}
