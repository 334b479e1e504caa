//! Integration tests for API endpoints

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use signal_backtest::{api, AppState};
use tower::ServiceExt;

fn app() -> Router {
    api::router().with_state(AppState::in_memory().unwrap())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn test_full_backtest_flow() {
    let app = app();

    let (status, created) = send(
        &app,
        "POST",
        "/api/signals",
        Some(json!({
            "ticker": "abc",
            "direction": "up",
            "confidence": 0.8,
            "created_at": "2024-03-04T21:00:00Z",
            "sector": "Energy"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let signal_id = created["data"]["id"].as_i64().unwrap();
    assert_eq!(created["data"]["ticker"], "ABC");

    let (status, ingest) = send(
        &app,
        "POST",
        "/api/prices",
        Some(json!({
            "observations": [
                {"ticker": "ABC", "observed_at": "2024-03-04T21:00:00Z", "price": 10.0, "source": "test"},
                {"ticker": "ABC", "observed_at": "2024-03-05T21:00:00Z", "price": 10.5, "source": "test"}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ingest["data"]["stored"], 2);

    let (status, run) = send(&app, "POST", "/api/backtest/run", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["data"]["signals_tested"], 1);
    assert_eq!(run["data"]["results_created"], 1);
    assert!(run["meta"]["generated_at"].is_i64());

    let (status, result) =
        send(&app, "GET", &format!("/api/backtest/results/{}", signal_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["data"]["outcome_1d"]["change_pct"], 5.0);
    assert_eq!(result["data"]["outcome_1d"]["accurate"], true);
    // No observation lies within tolerance of the 30d target.
    assert!(result["data"]["outcome_30d"].is_null());

    let (status, summary) = send(&app, "GET", "/api/backtest/summary", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["data"]["total_signals_tested"], 1);
    assert_eq!(summary["data"]["accuracy"]["1d"]["accuracy_pct"], 100);
    assert!(summary["data"]["accuracy"]["30d"]["accuracy_pct"].is_null());
    assert_eq!(summary["data"]["by_sector"]["Energy"]["total"], 1);
    assert_eq!(summary["data"]["weekly"][0]["week_start"], "2024-03-03");

    let (status, results) = send(&app, "GET", "/api/backtest/results?ticker=abc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results["data"].as_array().unwrap().len(), 1);
    assert_eq!(results["meta"]["limit"], 50);

    let (status, latest) = send(&app, "GET", "/api/prices/latest", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["data"]["ABC"]["price"], 10.5);
}

#[tokio::test]
async fn test_invalid_signal_is_rejected() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/signals",
        Some(json!({"ticker": "ABC", "direction": "sideways", "confidence": 0.5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_SIGNAL");
}

#[tokio::test]
async fn test_results_limit_bounds() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/backtest/results?limit=500", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, _) = send(&app, "GET", "/api/backtest/results?limit=200", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_result_is_not_found() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/backtest/results/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_empty_trend_and_runs() {
    let app = app();
    let (status, trend) = send(&app, "GET", "/api/backtest/trend", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trend["data"], json!([]));

    let (status, runs) = send(&app, "GET", "/api/backtest/runs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(runs["data"], json!([]));

    let (status, _) = send(&app, "POST", "/api/backtest/runs/unknown/cancel", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
