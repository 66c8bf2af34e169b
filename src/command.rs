//! Activation commands: directive parsing plus the decision logic for
//! honoring them.
//!
//! The bot never self-activates. A scope turns on only when a verified
//! moderator posts the activation directive; deactivation flips the scope
//! off without clearing its activation history. Refusals (cooldown, not a
//! moderator) are normal negative results, never errors.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::abuse::RateLimiter;
use crate::platform::ModeratorVerifier;
use crate::store::{ScopeActivation, ScopeStatus, Store};

/// Handle the directives are addressed to.
pub const BOT_HANDLE: &str = "Comm_Sentinel";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Activate,
    Deactivate,
}

/// Detect an activation/deactivation directive in post text.
///
/// Substring match, not anchored: a directive embedded mid-sentence still
/// counts, which tolerates conversational phrasing around it.
pub fn parse_command(text: &str) -> Option<Command> {
    let t = text.trim().to_lowercase();
    let handle = BOT_HANDLE.to_lowercase();
    if t.contains(&format!("@{handle} activate")) {
        return Some(Command::Activate);
    }
    if t.contains(&format!("@{handle} deactivate")) {
        return Some(Command::Deactivate);
    }
    None
}

/// Outcome of a command attempt. `Refused` carries the reason shown to the
/// requester; it is not a fault.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Honored { confirmation: String },
    Refused { reason: String },
}

/// Decision logic for activation/deactivation. Checks are ordered: the
/// cheap local cooldown first, the remote moderator lookup second.
pub struct CommandEngine {
    limiter: Arc<RateLimiter>,
    verifier: Arc<dyn ModeratorVerifier>,
    store: Arc<dyn Store>,
}

impl CommandEngine {
    pub fn new(
        limiter: Arc<RateLimiter>,
        verifier: Arc<dyn ModeratorVerifier>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            limiter,
            verifier,
            store,
        }
    }

    pub async fn process_activation(
        &self,
        scope_id: &str,
        actor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CommandOutcome> {
        if !self.limiter.allow_actor_command(actor_id, now) {
            return Ok(CommandOutcome::Refused {
                reason: "cooldown: wait a minute between commands".to_string(),
            });
        }
        if !self.verifier.is_moderator(scope_id, actor_id).await {
            return Ok(CommandOutcome::Refused {
                reason: "only scope moderators/admins can activate monitoring".to_string(),
            });
        }

        self.store
            .upsert_activation(ScopeActivation {
                scope_id: scope_id.to_string(),
                status: ScopeStatus::Active,
                activated_at: now,
                activated_by: actor_id.to_string(),
            })
            .await?;

        info!(scope = %scope_id, "scope activated");
        Ok(CommandOutcome::Honored {
            confirmation: "monitoring activated for this scope".to_string(),
        })
    }

    pub async fn process_deactivation(
        &self,
        scope_id: &str,
        actor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CommandOutcome> {
        if !self.limiter.allow_actor_command(actor_id, now) {
            return Ok(CommandOutcome::Refused {
                reason: "cooldown: wait a minute between commands".to_string(),
            });
        }
        if !self.verifier.is_moderator(scope_id, actor_id).await {
            return Ok(CommandOutcome::Refused {
                reason: "only scope moderators/admins can deactivate monitoring".to_string(),
            });
        }

        self.store.deactivate_scope(scope_id).await?;

        info!(scope = %scope_id, "scope deactivated");
        Ok(CommandOutcome::Honored {
            confirmation: "monitoring stopped for this scope".to_string(),
        })
    }
}
