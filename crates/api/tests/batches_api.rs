//! Integration tests for batch submission and status lookup.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, build_test_app_with, get, post_json, post_raw};
use serde_json::json;

// ---------------------------------------------------------------------------
// Submission: rejected bodies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_urls_field_is_rejected() {
    let app = build_test_app();
    let response = post_json(app.router, "/process-images", json!({})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Provide an array of URLs.");
}

#[tokio::test]
async fn non_array_urls_are_rejected() {
    let app = build_test_app();
    let response = post_json(
        app.router,
        "/process-images",
        json!({"urls": "http://example.com/a.png"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Provide an array of URLs.");
}

#[tokio::test]
async fn malformed_json_body_is_rejected() {
    let app = build_test_app();
    let response = post_raw(app.router, "/process-images", "{not json").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Provide an array of URLs.");
}

#[tokio::test]
async fn invalid_urls_reject_the_whole_batch() {
    let app = build_test_app();
    let response = post_json(
        app.router,
        "/process-images",
        json!({"urls": ["http://example.com/ok.png", "not-a-url", 42]}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "The following URLs are invalid:");
    assert_eq!(body["invalidUrls"], json!(["not-a-url", 42]));

    // Nothing was admitted.
    assert!(app.ledger.is_empty().await);
}

// ---------------------------------------------------------------------------
// Submission: accepted batches
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_batch_returns_summary_and_writes_artifacts() {
    let app = build_test_app();
    let response = post_json(
        app.router.clone(),
        "/process-images",
        json!({"urls": ["http://example.com/a.png", "http://example.com/b.png"]}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let task_id = body["taskId"].as_str().unwrap().to_string();
    assert_eq!(body["summary"]["total"], 2);
    assert_eq!(body["summary"]["completed"], 2);
    assert_eq!(body["summary"]["failed"], 0);
    assert!(body["summary"]["averageTime"].as_f64().unwrap() > 0.0);

    for index in 0..2 {
        let path = app
            .output
            .path()
            .join(&task_id)
            .join(format!("resized_{index}.jpg"));
        assert!(path.exists(), "missing artifact {}", path.display());
    }

    let status = get(app.router, &format!("/status/{task_id}")).await;
    assert_eq!(status.status(), StatusCode::OK);
    let snapshot = body_json(status).await;
    assert_eq!(snapshot["taskId"], task_id.as_str());
    assert_eq!(snapshot["status"], "completed");
    assert_eq!(snapshot["completed"], 2);
    assert_eq!(snapshot["remaining"], 0);
    assert_eq!(snapshot["results"]["0"]["success"], true);
    assert!(snapshot["results"]["1"]["filePath"].is_string());
    assert!(snapshot["averageTime"].is_number());
    assert!(snapshot["completedAt"].is_string());
}

#[tokio::test]
async fn failed_job_is_recorded_without_failing_the_batch() {
    let app = build_test_app();
    let response = post_json(
        app.router.clone(),
        "/process-images",
        json!({"urls": ["http://example.com/a.png", "http://example.com/fail.png"]}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["summary"]["completed"], 1);
    assert_eq!(body["summary"]["failed"], 1);

    let task_id = body["taskId"].as_str().unwrap();
    let snapshot = body_json(get(app.router, &format!("/status/{task_id}")).await).await;
    let failed = &snapshot["results"]["1"];
    assert_eq!(failed["success"], false);
    assert_eq!(failed["failureKind"], "fetch");
    assert!(failed["error"].as_str().unwrap().contains("HTTP 404"));
    assert!(failed.get("filePath").is_none());
}

#[tokio::test]
async fn all_failures_average_to_zero() {
    let app = build_test_app();
    let response = post_json(
        app.router,
        "/process-images",
        json!({"urls": ["http://example.com/fail-1.png", "http://example.com/fail-2.png"]}),
    )
    .await;

    let body = body_json(response).await;
    assert_eq!(body["summary"]["failed"], 2);
    assert_eq!(body["summary"]["averageTime"], 0.0);
}

#[tokio::test]
async fn empty_batch_completes_immediately() {
    let app = build_test_app();
    let response = post_json(app.router, "/process-images", json!({"urls": []})).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["summary"], json!({"total": 0, "completed": 0, "failed": 0, "averageTime": 0.0}));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_batches_all_settle() {
    let app = build_test_app();

    let submissions: Vec<_> = (0..3)
        .map(|b| {
            let router = app.router.clone();
            let urls: Vec<String> = (0..10)
                .map(|i| format!("http://example.com/{b}/{i}.png"))
                .collect();
            tokio::spawn(async move {
                body_json(post_json(router, "/process-images", json!({ "urls": urls })).await).await
            })
        })
        .collect();

    let mut task_ids = Vec::new();
    for submission in submissions {
        let body = submission.await.unwrap();
        assert_eq!(body["summary"]["completed"], 10);
        task_ids.push(body["taskId"].as_str().unwrap().to_string());
    }

    task_ids.sort();
    task_ids.dedup();
    assert_eq!(task_ids.len(), 3, "task ids must be distinct");

    let health = body_json(get(app.router, "/health").await).await;
    assert_eq!(health["activeJobs"], 0);
    assert_eq!(health["pendingJobs"], 0);
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_task_is_404() {
    let app = build_test_app();
    let response = get(app.router, "/status/does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Task not found");
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn requests_over_budget_get_429() {
    let app = build_test_app_with(|config| config.rate_limit_max = 2);

    for _ in 0..2 {
        let response = get(app.router.clone(), "/status/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    let response = get(app.router.clone(), "/status/nope").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body_json(response).await["error"],
        "Too many requests, please try again later."
    );

    // Health stays reachable.
    assert_eq!(get(app.router, "/health").await.status(), StatusCode::OK);
}
