use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use bizops_api::{create_app, middleware::REQUEST_ID_HEADER, AppState, OWNER_HEADER};
use bizops_application::{PaymentService, PriorityService, RecommendationService, RecurringService};
use bizops_domain::{ClientRepository, WorkItemRepository};
use bizops_testing_utils::{
    fixed_clock, ClientBuilder, MockStore, RecordingActivityRecorder, RecordingBillingGateway,
    TaskBuilder, TEST_OWNER,
};

struct TestApp {
    router: Router,
    store: MockStore,
    billing: RecordingBillingGateway,
}

fn test_app() -> TestApp {
    let store = MockStore::new();
    let billing = RecordingBillingGateway::new();
    let activity = Arc::new(RecordingActivityRecorder::new());
    let clock = Arc::new(fixed_clock(2024, 2, 10));
    let repo = Arc::new(store.clone());

    let state = AppState {
        priority: Arc::new(PriorityService::new(repo.clone(), clock.clone(), 4)),
        recommendations: Arc::new(RecommendationService::new(repo.clone(), clock.clone())),
        recurring: Arc::new(RecurringService::new(
            repo.clone(),
            repo.clone(),
            repo.clone(),
            Arc::new(billing.clone()),
            activity.clone(),
            clock.clone(),
        )),
        payments: Arc::new(PaymentService::new(
            repo.clone(),
            repo,
            activity,
            clock,
        )),
        metrics: None,
    };

    TestApp {
        router: create_app(state, true),
        store,
        billing,
    }
}

async fn send(
    app: &TestApp,
    method: &str,
    uri: &str,
    owner: Option<i64>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(owner) = owner {
        builder = builder.header(OWNER_HEADER, owner.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn seed_client(app: &TestApp) -> i64 {
    app.store
        .create(&ClientBuilder::new().build())
        .await
        .unwrap()
        .id
}

fn obligation_body(client_id: i64, frequency: &str) -> Value {
    json!({
        "client_id": client_id,
        "name": "Monthly retainer",
        "amount": "1000.00",
        "frequency": frequency,
        "next_due_date": "2024-01-31"
    })
}

async fn create_obligation(app: &TestApp) -> (i64, i64) {
    let client_id = seed_client(app).await;
    let (status, body) = send(
        app,
        "POST",
        "/api/obligations",
        Some(TEST_OWNER),
        Some(obligation_body(client_id, "MONTHLY")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (
        body["data"]["obligation"]["id"].as_i64().unwrap(),
        body["data"]["first_payment"]["id"].as_i64().unwrap(),
    )
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_metrics_disabled_returns_not_found() {
    let app = test_app();
    let (status, _) = send(&app, "GET", "/metrics", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let app = test_app();

    let request = Request::builder()
        .uri("/health")
        .header(REQUEST_ID_HEADER, "trace-abc")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-abc");

    let request = Request::builder()
        .uri("/api/priorities/top")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let generated = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
    assert!(!generated.is_empty());
}

#[tokio::test]
async fn test_missing_or_invalid_owner_header_is_rejected() {
    let app = test_app();

    let (status, body) = send(&app, "GET", "/api/priorities/top", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["type"], "MISSING_OWNER");

    let request = Request::builder()
        .uri("/api/priorities/top")
        .header(OWNER_HEADER, "abc")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_top_priorities_use_stored_scores() {
    let app = test_app();
    let low = app
        .store
        .create_task(&TaskBuilder::new().with_title("low").with_score(20).build())
        .await
        .unwrap();
    let high = app
        .store
        .create_task(&TaskBuilder::new().with_title("high").with_score(80).build())
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        "GET",
        "/api/priorities/top?limit=5",
        Some(TEST_OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["item"]["id"], high.id);
    assert_eq!(items[0]["item"]["kind"], "task");
    assert_eq!(items[0]["score"], 80);
    assert_eq!(items[1]["item"]["id"], low.id);

    let (status, body) = send(&app, "GET", "/api/priorities/today", Some(TEST_OWNER), None).await;
    assert_eq!(status, StatusCode::OK);
    let today = body["data"].as_array().unwrap();
    assert_eq!(today.len(), 1);
    assert_eq!(today[0]["item"]["id"], high.id);
}

#[tokio::test]
async fn test_top_priorities_limit_is_validated() {
    let app = test_app();

    let (status, body) = send(
        &app,
        "GET",
        "/api/priorities/top?limit=101",
        Some(TEST_OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "BAD_REQUEST");

    let (status, _) = send(
        &app,
        "GET",
        "/api/priorities/top?limit=many",
        Some(TEST_OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "GET",
        "/api/priorities/top?limit=0",
        Some(TEST_OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_score_task_persists_and_respects_tenant() {
    let app = test_app();
    let task = app
        .store
        .create_task(&TaskBuilder::new().build())
        .await
        .unwrap();

    let uri = format!("/api/tasks/{}/score", task.id);
    let (status, body) = send(&app, "POST", &uri, Some(TEST_OWNER), None).await;
    assert_eq!(status, StatusCode::OK);
    let total = body["data"]["breakdown"]["total_score"].as_u64().unwrap();
    assert_eq!(
        u64::from(app.store.task(task.id).unwrap().priority_score),
        total
    );
    assert!(app.store.task(task.id).unwrap().priority_calculated_at.is_some());

    let (status, body) = send(&app, "POST", &uri, Some(TEST_OWNER + 1), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "NOT_FOUND");

    let (status, _) = send(&app, "POST", "/api/projects/999/score", Some(TEST_OWNER), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recalculate_reports_counts() {
    let app = test_app();
    app.store.create_task(&TaskBuilder::new().build()).await.unwrap();
    app.store.create_task(&TaskBuilder::new().build()).await.unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/priorities/recalculate",
        Some(TEST_OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["succeeded"], 2);
    assert!(body["data"]["failed"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_obligation_returns_first_payment() {
    let app = test_app();
    let client_id = seed_client(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/obligations",
        Some(TEST_OWNER),
        Some(obligation_body(client_id, "MONTHLY")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["obligation"]["status"], "ACTIVE");
    assert_eq!(body["data"]["obligation"]["external_retainer_id"], "ret-1");
    assert_eq!(body["data"]["first_payment"]["due_date"], "2024-01-31");
    assert_eq!(body["data"]["first_payment"]["status"], "PENDING");
    assert_eq!(app.store.obligation_count(), 1);
}

#[tokio::test]
async fn test_create_obligation_rejections() {
    let app = test_app();
    let client_id = seed_client(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/obligations",
        Some(TEST_OWNER),
        Some(obligation_body(client_id, "WEEKLY")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        "POST",
        "/api/obligations",
        Some(TEST_OWNER),
        Some(json!({ "client_id": client_id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "BAD_REQUEST");

    let (status, _) = send(
        &app,
        "POST",
        "/api/obligations",
        Some(TEST_OWNER),
        Some(obligation_body(client_id + 100, "MONTHLY")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.billing.fail_create(true);
    let (status, body) = send(
        &app,
        "POST",
        "/api/obligations",
        Some(TEST_OWNER),
        Some(obligation_body(client_id, "MONTHLY")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["type"], "EXTERNAL_SYNC_FAILED");
    assert_eq!(app.store.obligation_count(), 0);
}

#[tokio::test]
async fn test_advance_pause_and_conflicts() {
    let app = test_app();
    let (id, _) = create_obligation(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/obligations/{id}/advance"),
        Some(TEST_OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["obligation"]["next_due_date"], "2024-02-29");
    assert_eq!(body["data"]["obligation"]["last_paid_date"], "2024-01-31");
    assert_eq!(body["data"]["payment"]["due_date"], "2024-02-29");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/obligations/{id}/pause"),
        Some(TEST_OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "PAUSED");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/obligations/{id}/advance"),
        Some(TEST_OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["type"], "OBLIGATION_NOT_ACTIVE");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/obligations/{id}/resume"),
        Some(TEST_OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/obligations/{id}/cancel"),
        Some(TEST_OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "CANCELLED");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/obligations/{id}/complete"),
        Some(TEST_OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["type"], "INVALID_STATE_TRANSITION");
}

#[tokio::test]
async fn test_update_terms_and_delete() {
    let app = test_app();
    let (id, _) = create_obligation(&app).await;
    let uri = format!("/api/obligations/{id}");

    let (status, body) = send(
        &app,
        "PATCH",
        &uri,
        Some(TEST_OWNER),
        Some(json!({ "amount": "1200.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["amount"], "1200.00");
    assert_eq!(body["data"]["next_due_date"], "2024-01-31");

    let (status, _) = send(&app, "PATCH", &uri, Some(TEST_OWNER), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "DELETE", &uri, Some(TEST_OWNER), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["type"], "DELETION_REJECTED");
    assert_eq!(app.store.obligation_count(), 1);

    let (status, body) = send(&app, "GET", &uri, Some(TEST_OWNER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id);

    let (status, _) = send(&app, "GET", &uri, Some(TEST_OWNER + 1), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_payment_history_and_transitions() {
    let app = test_app();
    let (id, first_payment) = create_obligation(&app).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/obligations/{id}/payments"),
        Some(TEST_OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let history = body["data"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    // 首个到期日早于今天，按逾期展示
    assert_eq!(history[0]["status"], "OVERDUE");

    let pay_uri = format!("/api/payments/{first_payment}/pay");
    let (status, body) = send(&app, "POST", &pay_uri, Some(TEST_OWNER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "PAID");
    assert!(body["data"]["paid_at"].is_string());

    let (status, _) = send(&app, "POST", &pay_uri, Some(TEST_OWNER), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/payments/{first_payment}/cancel"),
        Some(TEST_OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "POST", "/api/payments/999/pay", Some(TEST_OWNER), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_refresh_overdue_materializes_status() {
    let app = test_app();
    let (id, _) = create_obligation(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/payments/refresh-overdue",
        Some(TEST_OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["updated"], 1);
    assert_eq!(
        app.store.payments_for(id)[0].status,
        bizops_domain::PaymentStatus::Overdue
    );
}

#[tokio::test]
async fn test_documents_are_fetched_for_synced_obligation() {
    let app = test_app();
    let (id, _) = create_obligation(&app).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/obligations/{id}/documents"),
        Some(TEST_OWNER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
    assert!(app
        .billing
        .calls()
        .iter()
        .any(|call| matches!(call, bizops_testing_utils::BillingCall::Documents(r) if r == "ret-1")));
}
