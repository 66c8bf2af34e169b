//! Transparency summaries over the decision log.
//!
//! Read-only aggregation: per-category counts, average response time, and
//! protected-scope count for a time window, plus a formatted block for
//! outbound posting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::assessment::RiskCategory;
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub decisions: usize,
    pub scam_links: usize,
    pub manipulation_attempts: usize,
    pub impersonators: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_response_time_ms: Option<u64>,
    pub scopes_protected: usize,
    pub overturned: usize,
}

/// Aggregate decisions within `[start, end]`.
pub async fn window(
    store: &dyn Store,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<ReportSummary> {
    let decisions: Vec<_> = store
        .decisions_since(start)
        .await?
        .into_iter()
        .filter(|d| d.created_at <= end)
        .collect();

    let scam_links = decisions
        .iter()
        .filter(|d| d.category == RiskCategory::ScamLink)
        .count();
    let manipulation_attempts = decisions
        .iter()
        .filter(|d| {
            matches!(
                d.category,
                RiskCategory::Manipulation | RiskCategory::Redirect | RiskCategory::CoordinatedSpam
            )
        })
        .count();
    let impersonators = decisions
        .iter()
        .filter(|d| d.category == RiskCategory::Impersonation)
        .count();

    let response_times: Vec<u64> = decisions
        .iter()
        .filter_map(|d| d.response_time_ms)
        .filter(|&v| v > 0)
        .collect();
    let avg_response_time_ms = if response_times.is_empty() {
        None
    } else {
        Some(response_times.iter().sum::<u64>() / response_times.len() as u64)
    };

    let scopes_protected = store.active_scope_ids().await?.len();
    let overturned = store.overturned_count().await?;

    Ok(ReportSummary {
        period_start: start,
        period_end: end,
        decisions: decisions.len(),
        scam_links,
        manipulation_attempts,
        impersonators,
        avg_response_time_ms,
        scopes_protected,
        overturned,
    })
}

/// Formatted report block: one bullet per nonzero count.
pub fn render_lines(summary: &ReportSummary, period_label: &str) -> String {
    let line = |n: usize, label: &str| -> Option<String> {
        (n > 0).then(|| format!("• {n} {label}"))
    };
    let mut lines: Vec<String> = vec![format!("Sentinel Report ({period_label})")];
    lines.extend(line(summary.scam_links, "scam links flagged"));
    lines.extend(line(summary.manipulation_attempts, "manipulation attempts blocked"));
    lines.extend(line(summary.impersonators, "impersonators detected"));
    if let Some(ms) = summary.avg_response_time_ms {
        lines.push(format!("Avg response: {:.1}s", ms as f64 / 1000.0));
    }
    lines.join("\n")
}
