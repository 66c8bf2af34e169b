// tests/classifier_scenarios.rs
//
// Handpicked scenarios through the public classifier API: the canonical
// abuse shapes this system exists to catch.

use chrono::Utc;
use community_risk_sentinel::classifier::{assess, AssessContext};
use community_risk_sentinel::{ActionTier, NormalizedPost, RiskCategory};

fn post(text: &str) -> NormalizedPost {
    NormalizedPost {
        post_id: "scenario".into(),
        author_id: "author".into(),
        author: Default::default(),
        text: text.into(),
        links: vec![],
        created_at: Utc::now(),
        scope_id: "scope".into(),
        from_mention: false,
    }
}

#[test]
fn sell_plus_buy_redirect_is_flagged_high() {
    let a = assess(&post("dev is selling buy the og"), None).unwrap();
    assert_eq!(a.category, RiskCategory::Redirect);
    assert_eq!(a.tier, ActionTier::Flag);
    assert!(a.score >= 0.78);
}

#[test]
fn known_scam_domain_is_flagged_at_085() {
    let a = assess(&post("mint is live, head to solana-airdrop right away"), None).unwrap();
    assert_eq!(a.category, RiskCategory::ScamLink);
    assert!((a.score - 0.85).abs() < 1e-6);
    assert_eq!(a.tier, ActionTier::Flag);
}

#[test]
fn unverified_team_claim_is_impersonation() {
    let a = assess(&post("official team announcement"), None).unwrap();
    assert_eq!(a.category, RiskCategory::Impersonation);
    assert_eq!(a.tier, ActionTier::Flag);
}

#[test]
fn plain_text_with_no_signals_is_not_assessed() {
    assert!(assess(&post("shipped the roadmap update, feedback welcome"), None).is_none());
}

#[test]
fn scores_stay_in_the_unit_interval_across_scenarios() {
    let heavy_ctx = AssessContext {
        recent_by_author: vec![
            "team dumped it all".into(),
            "dead coin, rotate into the new one".into(),
            "liquidity pulled again".into(),
        ],
    };
    for text in [
        "dev is selling buy the og",
        "team dumped, dead coin, rotate into the og now",
        "official team announcement",
        "drop on pumpfun now",
    ] {
        if let Some(a) = assess(&post(text), Some(&heavy_ctx)) {
            assert!((0.0..=1.0).contains(&a.score), "score out of range for {text:?}");
            assert!(!a.signals.is_empty());
        }
    }
}
