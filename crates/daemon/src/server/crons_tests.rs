// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::server::router;
use crate::test_support::TestDaemon;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::util::ServiceExt;

async fn call(router: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn patch(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

fn add_request(name: &str, schedule: &str) -> Value {
    json!({
        "project_id": "p1",
        "name": name,
        "schedule": schedule,
        "action_type": "shell",
        "action_config": {"command": "echo"},
    })
}

#[tokio::test]
async fn add_with_cron_schedule_stamps_next_run() {
    let daemon = TestDaemon::new();
    let router = router(daemon.state.clone());
    let (status, body) = call(&router, post("/api/cron/jobs", add_request("j", "0 7 * * *"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job"]["schedule_type"], json!("cron"));
    assert_eq!(body["job"]["cron_expr"], json!("0 7 * * *"));
    let next = body["job"]["next_run_at"].as_str().unwrap();
    assert!(next.contains("T07:00:00"));
}

#[tokio::test]
async fn add_with_interval_schedule() {
    let daemon = TestDaemon::new();
    let router = router(daemon.state.clone());
    let (status, body) = call(&router, post("/api/cron/jobs", add_request("j", "300s"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job"]["schedule_type"], json!("interval"));
    assert_eq!(body["job"]["interval_seconds"], json!(300));
}

#[tokio::test]
async fn add_rejects_bad_schedule_and_action() {
    let daemon = TestDaemon::new();
    let router = router(daemon.state.clone());
    let (status, _) = call(&router, post("/api/cron/jobs", add_request("j", "whenever"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut request = add_request("j", "300s");
    request["action_type"] = json!("teleport");
    let (status, _) = call(&router, post("/api/cron/jobs", request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn edit_schedule_recomputes_next_run() {
    // Spec scenario 6: add at 07:00 cron, edit to "30 8 * * *" — the
    // job's expr and recomputed next_run land at 08:30 UTC.
    let daemon = TestDaemon::new();
    let router = router(daemon.state.clone());
    call(&router, post("/api/cron/jobs", add_request("j", "0 7 * * *"))).await;

    let (status, body) = call(
        &router,
        patch("/api/cron/jobs/j?project_id=p1", json!({"project_id": "p1", "schedule": "30 8 * * *"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job"]["cron_expr"], json!("30 8 * * *"));
    let next = body["job"]["next_run_at"].as_str().unwrap();
    assert!(next.contains("T08:30:00"));
}

#[tokio::test]
async fn toggle_disables_and_clears_next_run() {
    let daemon = TestDaemon::new();
    let router = router(daemon.state.clone());
    call(&router, post("/api/cron/jobs", add_request("j", "300s"))).await;

    let (status, body) = call(&router, post("/api/cron/jobs/j/toggle?project_id=p1", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["job"]["enabled"], json!(false));
    assert!(body["job"]["next_run_at"].is_null());

    let (_, body) = call(&router, post("/api/cron/jobs/j/toggle?project_id=p1", json!({}))).await;
    assert_eq!(body["job"]["enabled"], json!(true));
    assert!(body["job"]["next_run_at"].is_string());
}

#[tokio::test]
async fn run_now_marks_job_due() {
    let daemon = TestDaemon::new();
    let router = router(daemon.state.clone());
    call(&router, post("/api/cron/jobs", add_request("j", "0 7 * * *"))).await;
    let (status, body) = call(&router, post("/api/cron/jobs/j/run?project_id=p1", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["queued"], json!(true));

    let job = daemon.state.crons.resolve("j", "p1").unwrap();
    assert!(job.next_run_at.unwrap() <= gobby_core::utc_now_iso());
}

#[tokio::test]
async fn remove_then_get_is_not_found() {
    let daemon = TestDaemon::new();
    let router = router(daemon.state.clone());
    call(&router, post("/api/cron/jobs", add_request("j", "300s"))).await;

    let delete = Request::builder()
        .method("DELETE")
        .uri("/api/cron/jobs/j?project_id=p1")
        .body(Body::empty())
        .unwrap();
    let (status, _) = call(&router, delete).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&router, get("/api/cron/jobs/j?project_id=p1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn runs_lists_history() {
    let daemon = TestDaemon::new();
    let router = router(daemon.state.clone());
    call(&router, post("/api/cron/jobs", add_request("j", "300s"))).await;
    let job = daemon.state.crons.resolve("j", "p1").unwrap();
    daemon.state.crons.create_run(&job.id).unwrap();

    let (status, body) = call(&router, get("/api/cron/jobs/j/runs?project_id=p1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["runs"].as_array().unwrap().len(), 1);
}
