// tests/api_http.rs
//
// HTTP smoke tests against the router with mock collaborators, driven
// through `tower::ServiceExt::oneshot` (no server socket).

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::Request,
    Router,
};
use chrono::Utc;
use http::StatusCode;
use common::{build_state, post as mk_post, CountingSink, ScriptedSource};
use community_risk_sentinel::config::SentinelConfig;
use community_risk_sentinel::store::{MemoryStore, ScopeActivation, ScopeStatus, Store};
use community_risk_sentinel::{api, AppState};
use tower::ServiceExt; // for `oneshot`

async fn test_state() -> AppState {
    let store = Arc::new(MemoryStore::new());
    store
        .upsert_activation(ScopeActivation {
            scope_id: "s1".to_string(),
            status: ScopeStatus::Active,
            activated_at: Utc::now(),
            activated_by: "mod-0".to_string(),
        })
        .await
        .unwrap();

    let mut timelines = HashMap::new();
    timelines.insert(
        "s1".to_string(),
        vec![mk_post("p1", "s1", "a1", "get your free-tokens here")],
    );
    let source = Arc::new(ScriptedSource {
        timelines,
        mentions: vec![],
    });

    build_state(
        SentinelConfig::default(),
        store,
        source,
        CountingSink::ok(),
        HashMap::new(),
    )
}

async fn body_string(resp: axum::response::Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn health_answers_ok() {
    let app: Router = api::create_router(test_state().await);
    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "ok");
}

#[tokio::test]
async fn assess_is_a_dry_run_with_a_composed_reply() {
    let app: Router = api::create_router(test_state().await);

    let req = Request::builder()
        .method("POST")
        .uri("/assess")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"text":"dev is selling buy the og"}"#))
        .unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let s = body_string(resp).await;
    assert!(s.contains("\"category\":\"redirect\""));
    assert!(s.contains("\"tier\":\"flag\""));
    assert!(s.contains("\"reply\""));

    // Nothing was recorded by the dry run.
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/decisions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_string(resp).await, "[]");
}

#[tokio::test]
async fn assess_returns_empty_shape_for_benign_text() {
    let app: Router = api::create_router(test_state().await);

    let req = Request::builder()
        .method("POST")
        .uri("/assess")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"text":"good morning everyone"}"#))
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "{}");
}

#[tokio::test]
async fn manual_trigger_runs_the_pipeline_and_decisions_show_up() {
    let app: Router = api::create_router(test_state().await);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/pipeline/run")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let s = body_string(resp).await;
    assert!(s.contains("\"ingested\":1"));
    assert!(s.contains("\"decisions_created\":1"));

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/decisions?limit=10")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let s = body_string(resp).await;
    assert!(s.contains("\"post_id\":\"p1\""));
    assert!(s.contains("\"category\":\"scam_link\""));

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/report?hours=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let s = body_string(resp).await;
    assert!(s.contains("\"scam_links\":1"));
    assert!(s.contains("scam links flagged"));
}

#[tokio::test]
async fn scopes_and_outcomes_round_trip() {
    let app: Router = api::create_router(test_state().await);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/scopes")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let s = body_string(resp).await;
    assert!(s.contains("\"scope_id\":\"s1\""));
    assert!(s.contains("\"status\":\"active\""));

    let req = Request::builder()
        .method("POST")
        .uri("/outcomes")
        .header("content-type", "application/json")
        .body(Body::from(
            r#"{
                "post_id": "p1",
                "original_category": "scam_link",
                "original_score": 0.85,
                "final_outcome": "overturned",
                "appeal_status": "approved"
            }"#,
        ))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/report?hours=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(body_string(resp).await.contains("\"overturned\":1"));
}
