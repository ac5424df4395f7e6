//! HTTP adapter behaviour

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{memory_service, test_config};
use recruitflow::api::create_router;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    create_router(memory_service(&test_config()))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
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

fn job_body(job_id: &str) -> Value {
    json!({
        "job_id": job_id,
        "role_title": "Backend Engineer",
        "department": "Platform",
        "company_name": "Acme",
        "key_requirements": ["Rust", "PostgreSQL"],
        "experience_years": 3
    })
}

fn candidates(n: usize) -> Value {
    let list: Vec<Value> = (0..n)
        .map(|i| json!({"id": format!("c{}", i), "name": format!("Candidate {}", i), "profile": "Rust", "score": 0.9}))
        .collect();
    json!({ "candidates": list })
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_job_lifecycle_over_http() {
    let app = app();

    let (status, body) = send(&app, "POST", "/api/v1/jobs", Some(job_body("be-1"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["current_node"], "await-description-approval");
    assert_eq!(body["data"]["status"], "interrupted");

    let (status, body) = send(&app, "GET", "/api/v1/jobs/be-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"]["title"], "Backend Engineer");

    let (status, body) = send(&app, "POST", "/api/v1/jobs/be-1/description/approve", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current_node"], "await-applications");

    let (status, body) = send(&app, "POST", "/api/v1/jobs/be-1/applicants", Some(candidates(5))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current_node"], "await-shortlist-approval");

    let (_, body) = send(&app, "POST", "/api/v1/jobs/be-1/shortlist/approve", None).await;
    assert_eq!(body["data"]["current_node"], "review-responses");

    let (status, body) = send(&app, "POST", "/api/v1/jobs/be-1/review", Some(json!({"decision": "approved"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current_node"], "completed");
    assert_eq!(body["data"]["status"], "completed");

    let (status, body) = send(&app, "GET", "/api/v1/jobs/be-1/checkpoints?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["current_node"], "completed");
    assert_eq!(entries[0]["source"], "loop");

    let (status, body) = send(&app, "GET", "/api/v1/jobs/be-1/checkpoints/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"]["current_node"], "generate-description");
}

#[tokio::test]
async fn test_unknown_job_is_404() {
    let (status, body) = send(&app(), "GET", "/api/v1/jobs/nobody/status", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_missing_checkpoint_is_404() {
    let app = app();
    send(&app, "POST", "/api/v1/jobs", Some(job_body("be-2"))).await;
    let (status, body) = send(&app, "GET", "/api/v1/jobs/be-2/checkpoints/40", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "CHECKPOINT_NOT_FOUND");
}

#[tokio::test]
async fn test_blank_role_is_unprocessable() {
    let mut body = job_body("be-3");
    body["role_title"] = json!("");
    let (status, body) = send(&app(), "POST", "/api/v1/jobs", Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_malformed_bodies() {
    let app = app();
    send(&app, "POST", "/api/v1/jobs", Some(job_body("be-4"))).await;

    let (status, body) = send(&app, "POST", "/api/v1/jobs/be-4/review", Some(json!({"decision": "maybe"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(&app, "POST", "/api/v1/jobs/be-4/applicants", Some(json!({"candidates": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_abandoned_job_conflicts() {
    let app = app();
    send(&app, "POST", "/api/v1/jobs", Some(job_body("be-5"))).await;

    let (status, body) = send(&app, "POST", "/api/v1/jobs/be-5/abandon", Some(json!({"reason": "budget cut"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "abandoned");

    let (status, body) = send(&app, "POST", "/api/v1/jobs/be-5/description/approve", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ABANDONED");
}

#[tokio::test]
async fn test_decision_at_wrong_stage_conflicts() {
    let app = app();
    send(&app, "POST", "/api/v1/jobs", Some(job_body("be-6"))).await;

    let (status, body) = send(&app, "POST", "/api/v1/jobs/be-6/shortlist/approve", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NOT_RESUMABLE");

    let (_, body) = send(&app, "GET", "/api/v1/jobs/be-6/status", None).await;
    assert_eq!(body["data"]["current_node"], "await-description-approval");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (status, body) = send(&app(), "GET", "/api/v2/anything", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}
