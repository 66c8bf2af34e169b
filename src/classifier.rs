//! # Risk Classifier
//! Pure, testable logic that maps a post to at most one `Assessment`.
//! No I/O, no hidden state; the only external input is the optional list of
//! the author's recent texts, used solely for the coordination boost.
//!
//! Detectors run in a fixed order (scam link, impersonation, manipulation)
//! and the single highest-scoring hit wins. On a tie the earlier detector is
//! kept. Impersonation and manipulation are mutually exclusive by
//! construction: sell/dump context suppresses the impersonation detector
//! outright rather than competing with it on score.

use crate::assessment::{clamp01, tier_for, ActionTier, Assessment, RiskCategory};
use crate::post::NormalizedPost;
use crate::signals::{
    self, tables, RE_AUTHORITY_EVIDENCE, RE_NEGATIVE_CLAIM, RE_REDIRECT_CTA, RE_SELL_CONTEXT,
    RE_TX_EVIDENCE,
};

/// Additive weights for the manipulation detector; the sum caps at 1.0.
const W_PHRASE_MATCH: f32 = 0.25;
const W_NO_EVIDENCE: f32 = 0.20;
const W_URGENCY: f32 = 0.15;
const W_REDIRECT: f32 = 0.25;
const W_COORDINATION: f32 = 0.30;

/// Redirect posts never score below this, whatever the additive sum says.
/// Applied after all weights, before the final clamp.
const REDIRECT_SCORE_FLOOR: f32 = 0.78;

const SCAM_DOMAIN_SCORE: f32 = 0.85;
const LINK_URGENCY_SCORE: f32 = 0.65;
const IMPERSONATION_SCORE: f32 = 0.70;

/// "Short post" cutoff for the link+urgency fallback.
const SHORT_POST_CHARS: usize = 200;

/// Coordination boost requires this many recent texts repeating known
/// manipulative phrasing.
const COORDINATION_MIN_REPEATS: usize = 2;

/// Caller-supplied context. The classifier holds no state between calls.
#[derive(Debug, Clone, Default)]
pub struct AssessContext {
    /// Recent post texts by the same author (any source the caller trusts).
    pub recent_by_author: Vec<String>,
}

/// Main assessor. Returns `None` for a post with zero matched signals,
/// never a zero-score assessment.
pub fn assess(post: &NormalizedPost, ctx: Option<&AssessContext>) -> Option<Assessment> {
    let candidates = [
        assess_scam_link(post),
        assess_impersonation(post),
        assess_manipulation(post, ctx),
    ];

    let mut best: Option<Assessment> = None;
    for candidate in candidates.into_iter().flatten() {
        match &best {
            Some(current) if candidate.score <= current.score => {}
            _ => best = Some(candidate),
        }
    }
    best
}

/// Scam link detection: known drain/phishing domain substrings, matched
/// case-insensitively against the text and every extracted link.
fn assess_scam_link(post: &NormalizedPost) -> Option<Assessment> {
    let text = post.text.to_lowercase();
    let links: Vec<String> = post.links.iter().map(|l| l.to_lowercase()).collect();

    for domain in &tables().scam_domains {
        let d = domain.to_lowercase();
        if text.contains(&d) || links.iter().any(|l| l.contains(&d)) {
            return Some(
                Assessment::new(RiskCategory::ScamLink, SCAM_DOMAIN_SCORE, ActionTier::Flag)
                    .with_signal(format!("scam_domain:{domain}")),
            );
        }
    }

    // Fallback: any outbound link plus urgency wording in a short post.
    let has_link = !post.links.is_empty();
    if has_link && signals::has_urgency(&text) && post.text.chars().count() < SHORT_POST_CHARS {
        return Some(
            Assessment::new(RiskCategory::ScamLink, LINK_URGENCY_SCORE, ActionTier::ModAlert)
                .with_signal("link_with_urgency"),
        );
    }

    None
}

/// Impersonation: claims to be official/team without verifiable evidence.
fn assess_impersonation(post: &NormalizedPost) -> Option<Assessment> {
    // "dev is selling", "team dumped" etc. belong to the manipulation
    // detector; suppress impersonation entirely in that context.
    if RE_SELL_CONTEXT.is_match(&post.text) {
        return None;
    }

    let text = post.text.to_lowercase();
    let has_claim = tables()
        .impersonation_signals
        .iter()
        .any(|s| text.contains(&s.to_lowercase()));
    let has_evidence = RE_AUTHORITY_EVIDENCE.is_match(&post.text);

    if has_claim && !has_evidence {
        return Some(
            Assessment::new(
                RiskCategory::Impersonation,
                IMPERSONATION_SCORE,
                ActionTier::Flag,
            )
            .with_signal("impersonation_claim_no_evidence"),
        );
    }

    None
}

/// Manipulation scoring: additive weights per independently triggered
/// signal, with the redirect floor applied after the sum.
fn assess_manipulation(post: &NormalizedPost, ctx: Option<&AssessContext>) -> Option<Assessment> {
    let text = post.text.to_lowercase();
    let mut score = 0.0f32;
    let mut sigs: Vec<String> = Vec::new();

    // Known manipulative phrasing.
    let phrase_hits: Vec<&str> = tables()
        .manipulative_phrases
        .iter()
        .filter(|p| text.contains(&p.to_lowercase()))
        .map(|p| p.as_str())
        .collect();
    if !phrase_hits.is_empty() {
        score += W_PHRASE_MATCH;
        sigs.push(format!("phrase:{}", phrase_hits.join(",")));
    }

    // A phrase match with no transaction-level evidence behind it.
    let has_evidence = RE_TX_EVIDENCE.is_match(&post.text);
    if !has_evidence && !phrase_hits.is_empty() {
        score += W_NO_EVIDENCE;
        sigs.push("no_evidence".to_string());
    }

    // Urgency pressure.
    if signals::has_urgency(&text) {
        score += W_URGENCY;
        sigs.push("urgency".to_string());
    }

    // Negative claim about the project plus a redirect-to-alternative call
    // to action in the same text.
    let redirect = RE_NEGATIVE_CLAIM.is_match(&text) && RE_REDIRECT_CTA.is_match(&text);
    if redirect {
        score += W_REDIRECT;
        sigs.push("redirect".to_string());
    }

    // Repeated manipulative phrasing from the same author.
    let repeats = ctx
        .map(|c| {
            c.recent_by_author
                .iter()
                .filter(|t| {
                    let tl = t.to_lowercase();
                    tables()
                        .manipulative_phrases
                        .iter()
                        .any(|p| tl.contains(&p.to_lowercase()))
                })
                .count()
        })
        .unwrap_or(0);
    if repeats >= COORDINATION_MIN_REPEATS {
        score += W_COORDINATION;
        sigs.push("coordinated_repetition".to_string());
    }

    if score == 0.0 {
        return None;
    }

    // Redirect posts are inherently higher-risk: floor after all additive
    // weights, then clamp.
    if redirect {
        score = score.max(REDIRECT_SCORE_FLOOR);
    }
    let score = clamp01(score);

    let category = if redirect {
        RiskCategory::Redirect
    } else {
        RiskCategory::Manipulation
    };

    Some(Assessment {
        category,
        score,
        signals: sigs,
        tier: tier_for(score),
    })
}
