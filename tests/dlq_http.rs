//! DLQ retry tracking over HTTP: escalation on exhaustion, admin endpoints.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::TestApp;
use ledger_gate::cache::CacheStore;
use ledger_gate::dlq::DlqRetryStatus;

const DLQ_HEADER: &str = "x-dlq-process-id";

const TRANSFER: &str =
    r#"{"amount":"10","currency":"USD","source_account":"acc-1","destination_account":"acc-2"}"#;

async fn seed_status(app: &TestApp, process_id: &str, current_retry: u32, max_retry: u32) {
    let mut status = DlqRetryStatus::new(process_id, "settlement-import", max_retry);
    status.current_retry = current_retry;
    app.cache
        .set(
            &format!("test:dlq:{}", process_id),
            &status.encode().unwrap(),
            Duration::from_secs(600),
        )
        .await
        .unwrap();
}

async fn stored_retry(app: &TestApp, process_id: &str) -> serde_json::Value {
    let resp = app
        .get(&format!("/v1/dlq/processes/{}", process_id), None)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    resp.json()["data"]["current_retry"].clone()
}

async fn resubmit(app: &TestApp, process_id: &str, key: &str) -> StatusCode {
    app.post(
        "/v1/transactions",
        Some("client-a"),
        Some(key),
        &[(DLQ_HEADER, process_id)],
        TRANSFER,
    )
    .await
    .status
}

#[tokio::test]
async fn test_retry_then_escalate_on_exhaustion() {
    let app = TestApp::new();
    app.deposit("acc-1", 100).await;
    app.ledger.set_failing(true);
    seed_status(&app, "p1", 2, 3).await;

    let status = resubmit(&app, "p1", "dlq-key-1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(stored_retry(&app, "p1").await, 3);
    assert_eq!(app.notifier.count(), 0);

    let status = resubmit(&app, "p1", "dlq-key-1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.notifier.count(), 1);

    let (process_name, message) = app.notifier.messages().remove(0);
    assert_eq!(process_name, "settlement-import");
    assert!(message.ends_with("(process_id: p1)"), "message: {}", message);

    // Escalation does not persist the incremented count
    assert_eq!(stored_retry(&app, "p1").await, 3);
}

#[tokio::test]
async fn test_non_retryable_failure_escalates_immediately() {
    let app = TestApp::new();
    seed_status(&app, "p2", 0, 5).await;

    // No funds deposited: 422 is outside the retryable set
    let status = resubmit(&app, "p2", "dlq-key-2").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.notifier.count(), 1);
    assert_eq!(stored_retry(&app, "p2").await, 0);
}

#[tokio::test]
async fn test_success_leaves_status_untouched() {
    let app = TestApp::new();
    app.deposit("acc-1", 100).await;
    seed_status(&app, "p3", 1, 3).await;

    let status = resubmit(&app, "p3", "dlq-key-3").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(stored_retry(&app, "p3").await, 1);
    assert_eq!(app.notifier.count(), 0);
}

#[tokio::test]
async fn test_reads_are_not_counted() {
    let app = TestApp::new();
    seed_status(&app, "p6", 0, 3).await;

    let resp = app
        .get_with(
            &format!("/v1/transactions/{}", ulid::Ulid::new()),
            Some("client-a"),
            &[(DLQ_HEADER, "p6")],
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(app.notifier.count(), 0);
    assert_eq!(stored_retry(&app, "p6").await, 0);
}

#[tokio::test]
async fn test_untracked_process_passes_through() {
    let app = TestApp::new();
    app.ledger.set_failing(true);

    let status = resubmit(&app, "never-registered", "dlq-key-4").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.notifier.count(), 0);

    let lookup = app
        .get("/v1/dlq/processes/never-registered", None)
        .await;
    assert_eq!(lookup.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_corrupt_status_rejects_request() {
    let app = TestApp::new();
    app.deposit("acc-1", 100).await;
    app.cache
        .set("test:dlq:p5", "{not json", Duration::from_secs(600))
        .await
        .unwrap();

    let status = resubmit(&app, "p5", "dlq-key-5").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.available("acc-1").await, rust_decimal::Decimal::new(100, 0));
}

#[tokio::test]
async fn test_admin_register_get_delete() {
    let app = TestApp::new();

    let body = r#"{"process_id":"job-1","process_name":"nightly-settlement","max_retry":4}"#;
    let created = app.post("/v1/dlq/processes", None, None, &[], body).await;
    assert_eq!(created.status, StatusCode::CREATED);
    let json = created.json();
    assert_eq!(json["data"]["current_retry"], 0);
    assert_eq!(json["data"]["max_retry"], 4);

    let duplicate = app.post("/v1/dlq/processes", None, None, &[], body).await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.json()["error"], "DLQ_PROCESS_EXISTS");

    let fetched = app.get("/v1/dlq/processes/job-1", None).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.json()["data"]["process_name"], "nightly-settlement");

    let request = axum::http::Request::builder()
        .method("DELETE")
        .uri("/v1/dlq/processes/job-1")
        .body(axum::body::Body::empty())
        .unwrap();
    let deleted = app.send(request).await;
    assert_eq!(deleted.status, StatusCode::OK);

    let gone = app.get("/v1/dlq/processes/job-1", None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_register_defaults_and_validation() {
    let app = TestApp::new();

    let defaulted = app
        .post(
            "/v1/dlq/processes",
            None,
            None,
            &[],
            r#"{"process_id":"job-2","process_name":"import"}"#,
        )
        .await;
    assert_eq!(defaulted.status, StatusCode::CREATED);
    assert_eq!(defaulted.json()["data"]["max_retry"], 3);

    let blank = app
        .post(
            "/v1/dlq/processes",
            None,
            None,
            &[],
            r#"{"process_id":"  ","process_name":"import"}"#,
        )
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);

    let zero = app
        .post(
            "/v1/dlq/processes",
            None,
            None,
            &[],
            r#"{"process_id":"job-3","process_name":"import","max_retry":0}"#,
        )
        .await;
    assert_eq!(zero.status, StatusCode::BAD_REQUEST);
}
