//! Durable records: decisions, scope activations, and the append-only
//! outcome log.
//!
//! Decision records are written exactly once per assessed post and never
//! updated; corrections land in the outcome log instead. `MemoryStore`
//! backs tests and dev; `JsonStore` persists a snapshot file alongside the
//! service's other runtime state. A store error is fatal for the current
//! pipeline run; the next scheduled run retries via the idempotent dedupe.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assessment::{ActionTier, RiskCategory};

/// Durable output of one pipeline decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub post_id: String,
    pub scope_id: String,
    pub category: RiskCategory,
    pub score: f32,
    #[serde(default)]
    pub signals: Vec<String>,
    pub tier: ActionTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeStatus {
    Active,
    Inactive,
}

/// Per-scope activation record. Deactivation flips `status` but keeps the
/// activation history (who turned it on, and when).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeActivation {
    pub scope_id: String,
    pub status: ScopeStatus,
    pub activated_at: DateTime<Utc>,
    pub activated_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalOutcome {
    Confirmed,
    Overturned,
    AppealPending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppealStatus {
    None,
    Pending,
    Approved,
    Rejected,
}

/// Append-only learning record. Never feeds back into thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub post_id: String,
    pub original_category: RiskCategory,
    pub original_score: f32,
    pub final_outcome: FinalOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appeal_status: Option<AppealStatus>,
    pub recorded_at: DateTime<Utc>,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Post ids that already have a decision (dedupe source for replays).
    async fn decided_post_ids(&self) -> Result<HashSet<String>>;

    /// Append one decision. Returns `Ok(false)` when the post already has a
    /// record (the write is rejected, the caller moves on); `Err` only for
    /// real store failures.
    async fn append_decision(&self, record: DecisionRecord) -> Result<bool>;

    /// Most recent decisions, newest first.
    async fn recent_decisions(&self, limit: usize) -> Result<Vec<DecisionRecord>>;

    /// Decisions created at or after `cutoff`.
    async fn decisions_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<DecisionRecord>>;

    /// Scopes currently activated for monitoring.
    async fn active_scope_ids(&self) -> Result<Vec<String>>;

    async fn scope_activations(&self) -> Result<Vec<ScopeActivation>>;

    async fn upsert_activation(&self, record: ScopeActivation) -> Result<()>;

    /// Flip a scope to inactive; activation history stays in place.
    async fn deactivate_scope(&self, scope_id: &str) -> Result<()>;

    async fn append_outcome(&self, record: OutcomeRecord) -> Result<()>;

    async fn overturned_count(&self) -> Result<usize>;
}

/// The shared record shelf both store impls operate on. Pure in-memory
/// mutations; persistence is the `JsonStore` wrapper's concern.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Shelf {
    #[serde(default)]
    decisions: Vec<DecisionRecord>,
    #[serde(default)]
    activations: BTreeMap<String, ScopeActivation>,
    #[serde(default)]
    outcomes: Vec<OutcomeRecord>,
}

impl Shelf {
    fn decided_post_ids(&self) -> HashSet<String> {
        self.decisions.iter().map(|d| d.post_id.clone()).collect()
    }

    /// False if the post already has a record.
    fn append_decision(&mut self, record: DecisionRecord) -> bool {
        if self.decisions.iter().any(|d| d.post_id == record.post_id) {
            return false;
        }
        self.decisions.push(record);
        true
    }

    fn recent_decisions(&self, limit: usize) -> Vec<DecisionRecord> {
        self.decisions.iter().rev().take(limit).cloned().collect()
    }

    fn decisions_since(&self, cutoff: DateTime<Utc>) -> Vec<DecisionRecord> {
        self.decisions
            .iter()
            .filter(|d| d.created_at >= cutoff)
            .cloned()
            .collect()
    }

    fn active_scope_ids(&self) -> Vec<String> {
        self.activations
            .values()
            .filter(|a| a.status == ScopeStatus::Active)
            .map(|a| a.scope_id.clone())
            .collect()
    }

    fn upsert_activation(&mut self, record: ScopeActivation) {
        self.activations.insert(record.scope_id.clone(), record);
    }

    fn deactivate_scope(&mut self, scope_id: &str) {
        if let Some(a) = self.activations.get_mut(scope_id) {
            a.status = ScopeStatus::Inactive;
        }
    }

    fn overturned_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.final_outcome == FinalOutcome::Overturned)
            .count()
    }
}

/// In-memory store for tests and local development.
#[derive(Debug, Default)]
pub struct MemoryStore {
    shelf: Mutex<Shelf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn decided_post_ids(&self) -> Result<HashSet<String>> {
        Ok(self.shelf.lock().expect("store mutex poisoned").decided_post_ids())
    }

    async fn append_decision(&self, record: DecisionRecord) -> Result<bool> {
        Ok(self
            .shelf
            .lock()
            .expect("store mutex poisoned")
            .append_decision(record))
    }

    async fn recent_decisions(&self, limit: usize) -> Result<Vec<DecisionRecord>> {
        Ok(self
            .shelf
            .lock()
            .expect("store mutex poisoned")
            .recent_decisions(limit))
    }

    async fn decisions_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<DecisionRecord>> {
        Ok(self
            .shelf
            .lock()
            .expect("store mutex poisoned")
            .decisions_since(cutoff))
    }

    async fn active_scope_ids(&self) -> Result<Vec<String>> {
        Ok(self.shelf.lock().expect("store mutex poisoned").active_scope_ids())
    }

    async fn scope_activations(&self) -> Result<Vec<ScopeActivation>> {
        Ok(self
            .shelf
            .lock()
            .expect("store mutex poisoned")
            .activations
            .values()
            .cloned()
            .collect())
    }

    async fn upsert_activation(&self, record: ScopeActivation) -> Result<()> {
        self.shelf
            .lock()
            .expect("store mutex poisoned")
            .upsert_activation(record);
        Ok(())
    }

    async fn deactivate_scope(&self, scope_id: &str) -> Result<()> {
        self.shelf
            .lock()
            .expect("store mutex poisoned")
            .deactivate_scope(scope_id);
        Ok(())
    }

    async fn append_outcome(&self, record: OutcomeRecord) -> Result<()> {
        self.shelf
            .lock()
            .expect("store mutex poisoned")
            .outcomes
            .push(record);
        Ok(())
    }

    async fn overturned_count(&self) -> Result<usize> {
        Ok(self
            .shelf
            .lock()
            .expect("store mutex poisoned")
            .overturned_count())
    }
}

/// Default on-disk location for the snapshot file.
pub const DEFAULT_STORE_PATH: &str = "state/sentinel_store.json";
pub const ENV_STORE_PATH: &str = "SENTINEL_STORE_PATH";

/// File-backed store: the full shelf is serialized to one JSON snapshot
/// after every mutation. Loads the existing snapshot at boot.
pub struct JsonStore {
    path: PathBuf,
    shelf: tokio::sync::Mutex<Shelf>,
}

impl JsonStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let shelf = match tokio::fs::read_to_string(&path).await {
            Ok(s) => serde_json::from_str(&s)
                .with_context(|| format!("parse store snapshot {}", path.display()))?,
            Err(_) => Shelf::default(),
        };
        Ok(Self {
            path,
            shelf: tokio::sync::Mutex::new(shelf),
        })
    }

    /// Open at `SENTINEL_STORE_PATH`, falling back to the default path.
    pub async fn open_default() -> Result<Self> {
        let path = std::env::var(ENV_STORE_PATH).unwrap_or_else(|_| DEFAULT_STORE_PATH.to_string());
        Self::open(path).await
    }

    async fn persist(&self, shelf: &Shelf) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create store dir {}", parent.display()))?;
        }
        let bytes = serde_json::to_vec_pretty(shelf).context("serialize store snapshot")?;
        tokio::fs::write(&self.path, bytes)
            .await
            .with_context(|| format!("write store snapshot {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl Store for JsonStore {
    async fn decided_post_ids(&self) -> Result<HashSet<String>> {
        Ok(self.shelf.lock().await.decided_post_ids())
    }

    async fn append_decision(&self, record: DecisionRecord) -> Result<bool> {
        let mut shelf = self.shelf.lock().await;
        if !shelf.append_decision(record) {
            return Ok(false);
        }
        self.persist(&shelf).await?;
        Ok(true)
    }

    async fn recent_decisions(&self, limit: usize) -> Result<Vec<DecisionRecord>> {
        Ok(self.shelf.lock().await.recent_decisions(limit))
    }

    async fn decisions_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<DecisionRecord>> {
        Ok(self.shelf.lock().await.decisions_since(cutoff))
    }

    async fn active_scope_ids(&self) -> Result<Vec<String>> {
        Ok(self.shelf.lock().await.active_scope_ids())
    }

    async fn scope_activations(&self) -> Result<Vec<ScopeActivation>> {
        Ok(self.shelf.lock().await.activations.values().cloned().collect())
    }

    async fn upsert_activation(&self, record: ScopeActivation) -> Result<()> {
        let mut shelf = self.shelf.lock().await;
        shelf.upsert_activation(record);
        self.persist(&shelf).await
    }

    async fn deactivate_scope(&self, scope_id: &str) -> Result<()> {
        let mut shelf = self.shelf.lock().await;
        shelf.deactivate_scope(scope_id);
        self.persist(&shelf).await
    }

    async fn append_outcome(&self, record: OutcomeRecord) -> Result<()> {
        let mut shelf = self.shelf.lock().await;
        shelf.outcomes.push(record);
        self.persist(&shelf).await
    }

    async fn overturned_count(&self) -> Result<usize> {
        Ok(self.shelf.lock().await.overturned_count())
    }
}
