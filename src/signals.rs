//! Static signal tables and pattern constants backing the rule engine.
//!
//! Pure data: curated substring lists loaded once from `risk_signals.json`,
//! plus the compiled evidence/claim patterns. No scoring logic lives here.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SignalTables {
    /// Domain substrings already tied to drains/phishing.
    pub scam_domains: Vec<String>,
    /// Authority-claim keywords ("official", "team", "dev ", ...).
    /// Note the trailing space on "dev ": it keeps "device"/"developers"
    /// from matching while "dev is", "dev wallet" still do.
    pub impersonation_signals: Vec<String>,
    /// Known manipulative panic / liquidity-redirect phrasing.
    pub manipulative_phrases: Vec<String>,
    /// Urgency wording that pressures readers into acting fast.
    pub urgency_phrases: Vec<String>,
}

static TABLES: Lazy<SignalTables> = Lazy::new(|| {
    let raw = include_str!("../risk_signals.json");
    serde_json::from_str::<SignalTables>(raw).expect("valid risk signal tables")
});

pub fn tables() -> &'static SignalTables {
    &TABLES
}

/// "dev is selling / team dumped" style text. Posts in this shape are
/// manipulation, never impersonation; the manipulation detector owns them
/// exclusively.
pub static RE_SELL_CONTEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)dev is (sell|dump|rugg)|team (dump|sell|rugg)").expect("sell-context regex")
});

/// Verifiable evidence accompanying an authority claim: an address-like hex
/// string, a transaction-id-like token, or a named block explorer.
pub static RE_AUTHORITY_EVIDENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)0x[a-f0-9]{40}|tx\s*[a-z0-9]+|etherscan|solscan").expect("evidence regex")
});

/// Transaction-level evidence for negative claims (full tx hash or explorer
/// reference). Broader explorer list than the authority pattern.
pub static RE_TX_EVIDENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)0x[a-f0-9]{64}|tx\s*[a-z0-9]+|etherscan|solscan|bscscan")
        .expect("tx-evidence regex")
});

/// Negative claim about the project.
pub static RE_NEGATIVE_CLAIM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)dump|sell|selling|scam|rugged|dead|zero").expect("negative-claim regex"));

/// Redirect-to-alternative call to action ("rotate into", "buy the og", ...).
pub static RE_REDIRECT_CTA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)buy |get |swap |new contract|migrate to|rotate into|buy the og")
        .expect("redirect-cta regex")
});

/// True if any urgency phrase occurs in the (lowercased) text.
pub fn has_urgency(lowercased_text: &str) -> bool {
    tables()
        .urgency_phrases
        .iter()
        .any(|u| lowercased_text.contains(&u.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_load_and_are_nonempty() {
        let t = tables();
        assert!(!t.scam_domains.is_empty());
        assert!(!t.impersonation_signals.is_empty());
        assert!(!t.manipulative_phrases.is_empty());
        assert!(!t.urgency_phrases.is_empty());
    }

    #[test]
    fn sell_context_matches_common_shapes() {
        assert!(RE_SELL_CONTEXT.is_match("Dev is selling again"));
        assert!(RE_SELL_CONTEXT.is_match("the team dumped on us"));
        assert!(!RE_SELL_CONTEXT.is_match("the dev shipped a fix"));
    }

    #[test]
    fn authority_evidence_recognizes_addresses_and_explorers() {
        assert!(RE_AUTHORITY_EVIDENCE.is_match("0xAbCdEf0123456789abcdef0123456789ABCDEF01"));
        assert!(RE_AUTHORITY_EVIDENCE.is_match("see etherscan for proof"));
        assert!(RE_AUTHORITY_EVIDENCE.is_match("tx 9f31ab"));
        assert!(!RE_AUTHORITY_EVIDENCE.is_match("we are the official team"));
    }

    #[test]
    fn urgency_detection_is_substring_based() {
        assert!(has_urgency("act now or regret it"));
        assert!(has_urgency("last chance folks"));
        assert!(!has_urgency("a calm, measured update"));
    }
}
