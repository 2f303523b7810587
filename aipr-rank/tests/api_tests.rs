//! HTTP API integration tests

mod common;

use aipr_common::events::{EventBus, RankingEvent};
use aipr_rank::{build_router, AppState};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use common::{article, entry, period, sqlite_backend, tool, utc, Backend};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::timeout;
use tower::util::ServiceExt;

async fn create_test_app() -> (Router, Backend) {
    let backend = sqlite_backend().await;
    let state = AppState::new(backend.repos.clone(), EventBus::new(100));
    (build_router(state), backend)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _backend) = create_test_app().await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "aipr-rank");
    assert_eq!(body["ai_available"], false);
    assert!(body["current_period"].is_null());
    assert!(body.get("last_error").is_none());
}

#[tokio::test]
async fn test_missing_resources_use_error_envelope() {
    let (app, _backend) = create_test_app().await;

    let (status, body) = send(&app, "GET", "/api/rankings", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, body) = send(&app, "GET", "/api/tools/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]["message"].as_str().unwrap().contains("nope"));

    let (status, _) = send(&app, "GET", "/api/rankings/2025-01", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tool_admin_and_listing() {
    let (app, _backend) = create_test_app().await;
    let payload = json!({
        "id": "cursor",
        "slug": "cursor",
        "name": "Cursor",
        "category": "code-editor",
        "status": "active",
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    });
    let (status, saved) = send(&app, "PUT", "/api/admin/tools", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(saved["updated_at"], "2024-01-01T00:00:00Z");

    let blank = json!({
        "id": "",
        "slug": "x",
        "name": "X",
        "category": "code-editor",
        "status": "active",
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    });
    let (status, body) = send(&app, "PUT", "/api/admin/tools", Some(blank)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = send(&app, "GET", "/api/tools?category=code-editor", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["tools"][0]["slug"], "cursor");

    let (status, _) = send(&app, "GET", "/api/tools?status=sideways", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, "GET", "/api/tools/categories", None).await;
    assert_eq!(body[0]["category"], "code-editor");
    assert_eq!(body[0]["count"], 1);
}

#[tokio::test]
async fn test_news_ingest_list_and_delete() {
    let (app, backend) = create_test_app().await;
    backend
        .repos
        .tools
        .upsert(tool("devin", "Devin", "autonomous-agent"))
        .await
        .unwrap();
    backend
        .repos
        .news
        .upsert(article("old", utc(2025, 4, 2), &[]))
        .await
        .unwrap();

    let (status, created) = send(
        &app,
        "POST",
        "/api/admin/news",
        Some(json!({
            "title": "Devin gets a planner",
            "content": "Devin now plans before it codes.",
            "published_date": "2025-06-02T09:00:00Z",
            "sentiment_score": 0.6
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["slug"], "devin-gets-a-planner");
    assert_eq!(created["tool_mentions"], json!(["devin"]));

    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/news",
        Some(json!({"title": "", "content": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, page) = send(&app, "GET", "/api/news?limit=1", None).await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["items"][0]["slug"], "devin-gets-a-planner");

    let (_, filtered) = send(&app, "GET", "/api/news?tool=devin", None).await;
    assert_eq!(filtered["total"], 1);

    let (status, by_slug) = send(&app, "GET", "/api/news/devin-gets-a-planner", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_slug["id"], created["id"]);

    let uri = format!("/api/admin/news/{}", created["id"].as_str().unwrap());
    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rankings_lifecycle() {
    let (app, backend) = create_test_app().await;
    backend
        .repos
        .tools
        .upsert(tool("cursor", "Cursor", "code-editor"))
        .await
        .unwrap();
    backend
        .repos
        .tools
        .upsert(tool("devin", "Devin", "autonomous-agent"))
        .await
        .unwrap();

    let (status, summary) = send(
        &app,
        "POST",
        "/api/admin/rankings/build",
        Some(json!({"period": "2025-05"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_tools"], 2);
    assert_eq!(summary["is_current"], false);

    let (status, summary) = send(
        &app,
        "POST",
        "/api/admin/rankings/build",
        Some(json!({"period": "2025-06", "set_current": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["previous_period"], "2025-05");

    let (status, current) = send(&app, "GET", "/api/rankings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current["period"], "2025-06");
    assert_eq!(current["rankings"][0]["tool_id"], "devin");
    assert_eq!(current["rankings"][0]["movement"]["direction"], "same");

    let (_, periods) = send(&app, "GET", "/api/rankings/periods", None).await;
    assert_eq!(periods["periods"], json!(["2025-06", "2025-05"]));
    assert_eq!(periods["current"], "2025-06");

    let (status, switched) = send(
        &app,
        "PUT",
        "/api/admin/rankings/current",
        Some(json!({"period": "2025-05"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(switched["current"], "2025-05");

    let (status, _) = send(
        &app,
        "PUT",
        "/api/admin/rankings/current",
        Some(json!({"period": "1999-01"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, deleted) = send(&app, "DELETE", "/api/admin/rankings/2025-05", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["relinked_period"], "2025-06");
    assert_eq!(deleted["new_current"], "2025-06");

    let (_, june) = send(&app, "GET", "/api/rankings/2025-06", None).await;
    assert_eq!(june["is_current"], true);
    assert_eq!(june["rankings"][0]["movement"]["direction"], "new");

    let (status, _) = send(&app, "DELETE", "/api/admin/rankings/2025-05", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_build_validation_errors() {
    let (app, _backend) = create_test_app().await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/rankings/build",
        Some(json!({"period": "2025-06", "enable_ai": true})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/rankings/build",
        Some(json!({"period": "not-a-period"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_preview_does_not_store() {
    let (app, backend) = create_test_app().await;
    backend
        .repos
        .tools
        .upsert(tool("cursor", "Cursor", "code-editor"))
        .await
        .unwrap();
    backend
        .repos
        .rankings
        .save_period(period("2025-05", vec![entry("cursor", 1, 60.0), entry("gone", 2, 50.0)], true))
        .await
        .unwrap();

    let (status, preview) = send(
        &app,
        "POST",
        "/api/admin/rankings/preview",
        Some(json!({"period": "2025-06", "set_current": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["compared_to"], "2025-05");
    assert_eq!(preview["total_tools"], 1);
    assert_eq!(preview["summary"]["dropped_entries"], 1);
    assert_eq!(preview["comparisons"][1]["movement"], "dropped");
    assert!(preview["comparisons"][1]["new_position"].is_null());
    assert_eq!(preview["change_report"]["dropped"][0]["tool_id"], "gone");

    let (_, periods) = send(&app, "GET", "/api/rankings/periods", None).await;
    assert_eq!(periods["periods"], json!(["2025-05"]));
    assert_eq!(periods["current"], "2025-05");

    let (status, _) = send(
        &app,
        "POST",
        "/api/admin/rankings/preview",
        Some(json!({"period": "2025-06", "enable_ai": true})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_trending_endpoint() {
    let (app, backend) = create_test_app().await;
    let rankings = &backend.repos.rankings;
    rankings
        .save_period(period("2025-04", vec![entry("a", 1, 90.0), entry("b", 12, 40.0)], false))
        .await
        .unwrap();
    rankings
        .save_period(period("2025-05", vec![entry("b", 1, 91.0), entry("a", 2, 89.0)], true))
        .await
        .unwrap();

    let (status, body) = send(&app, "GET", "/api/rankings/trending", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["periods"], json!(["2025-04", "2025-05"]));
    assert_eq!(body["tools"][0]["tool_id"], "b");
    assert_eq!(body["tools"][0]["worst_position"], 12);
    assert_eq!(body["chart_data"][0]["b"], 12);
    assert_eq!(body["chart_data"][0]["date"], "Apr 2025");
    assert_eq!(body["metadata"]["date_range"]["start"], "2025-04");

    let (status, all) = send(&app, "GET", "/api/rankings/trending?months=all", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all, body);

    // Both periods lie far more than a month in the past
    let (_, recent) = send(&app, "GET", "/api/rankings/trending?months=1", None).await;
    assert_eq!(recent["metadata"]["total_periods"], 0);
    assert_eq!(recent["tools"], json!([]));

    let (status, body) = send(&app, "GET", "/api/rankings/trending?months=soon", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_event_stream_forwards_each_event_once() {
    let backend = sqlite_backend().await;
    let bus = EventBus::new(100);
    let app = build_router(AppState::new(backend.repos.clone(), bus.clone()));

    let response = app
        .oneshot(Request::get("/events").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    assert_eq!(bus.subscriber_count(), 1);
    let mut body = response.into_body();

    bus.emit_lossy(RankingEvent::CurrentPeriodChanged {
        period: "2025-06".to_string(),
        timestamp: Utc::now(),
    });

    let frame = timeout(Duration::from_secs(2), body.frame())
        .await
        .expect("event should arrive")
        .unwrap()
        .unwrap();
    let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(text.starts_with("event: CurrentPeriodChanged\n"), "{}", text);
    assert!(text.contains("\"period\":\"2025-06\""), "{}", text);

    // Keep-alive comments only follow a long idle gap
    assert!(timeout(Duration::from_millis(500), body.frame()).await.is_err());
}
