//! End-to-end integration tests for Salon
//!
//! These tests verify the complete system flow:
//! 1. Client submits a hairstyle order through the API
//! 2. Intake debits credits and stages the input photo in storage
//! 3. Polling the task submits a job to a mock KIE server
//! 4. The provider reports progress, then completion
//! 5. The result image is mirrored into storage behind the CDN URL
//!
//! The mock KIE server speaks the real wire format ({code, msg, data}
//! envelopes); storage is in-memory and the stored bytes are compared
//! against what the mock served.

use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{Request, StatusCode, header},
    routing::{get, post},
};
use bytes::Bytes;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::time::{Duration, sleep};
use tower::ServiceExt;

use salon::api::models::{HairstyleAccepted, TaskStatusResponse};
use salon::api::state::AppState;
use salon::config::Config;
use salon::ledger::{CreditLedger, TaskStore, open_keyspace};
use salon::observability::Metrics;
use salon::provider::{KieClient, KieOptions, ProviderClient};
use salon::storage::relocate::{AssetRelocator, BucketRelocator};
use salon::storage::{FetchOptions, HttpFetcher, StorageClient};
use salon::tasks::{LifecycleEngine, TaskIntake, TaskStatus};

const CDN_BASE: &str = "https://cdn.salon.test";
const SELFIE_BYTES: &[u8] = b"selfie-jpeg-bytes";
const RESULT_BYTES: &[u8] = b"generated-png-bytes";

/// Shared state of the embedded KIE double
struct MockKie {
    base_url: String,
    /// GENERATING responses to serve before flipping to SUCCESS
    generating_polls: AtomicUsize,
    gpt4o_submissions: Mutex<Vec<serde_json::Value>>,
    kontext_submissions: Mutex<Vec<serde_json::Value>>,
}

async fn mock_gpt4o_generate(
    State(kie): State<Arc<MockKie>>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    kie.gpt4o_submissions.lock().unwrap().push(body);
    Json(json!({"code": 200, "msg": "success", "data": {"taskId": "kie-task-1"}}))
}

async fn mock_gpt4o_record(
    State(kie): State<Arc<MockKie>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let task_id = params.get("taskId").cloned().unwrap_or_default();
    let still_generating = kie
        .generating_polls
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();

    if still_generating {
        Json(json!({
            "code": 200,
            "msg": "success",
            "data": {"taskId": task_id, "status": "GENERATING", "progress": "0.42"}
        }))
    } else {
        Json(json!({
            "code": 200,
            "msg": "success",
            "data": {
                "taskId": task_id,
                "status": "SUCCESS",
                "progress": "1.00",
                "response": {"resultUrls": [format!("{}/results/{}.png", kie.base_url, task_id)]}
            }
        }))
    }
}

async fn mock_kontext_generate(
    State(kie): State<Arc<MockKie>>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    kie.kontext_submissions.lock().unwrap().push(body);
    Json(json!({"code": 200, "msg": "success", "data": {"taskId": "kontext-task-1"}}))
}

async fn mock_kontext_record(
    State(kie): State<Arc<MockKie>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let task_id = params.get("taskId").cloned().unwrap_or_default();
    Json(json!({
        "code": 200,
        "msg": "success",
        "data": {
            "taskId": task_id,
            "successFlag": 1,
            "response": {
                "resultImageUrl": format!("{}/results/{}.png", kie.base_url, task_id),
                "originImageUrl": format!("{}/photos/selfie.jpg", kie.base_url)
            }
        }
    }))
}

async fn serve_selfie() -> Bytes {
    Bytes::from_static(SELFIE_BYTES)
}

async fn serve_result() -> Bytes {
    Bytes::from_static(RESULT_BYTES)
}

/// Start the embedded KIE double on a random port
async fn start_mock_kie(
    generating_polls: usize,
) -> Result<(String, Arc<MockKie>), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let base_url = format!("http://{}", listener.local_addr()?);

    let kie = Arc::new(MockKie {
        base_url: base_url.clone(),
        generating_polls: AtomicUsize::new(generating_polls),
        gpt4o_submissions: Mutex::new(Vec::new()),
        kontext_submissions: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/api/v1/gpt4o-image/generate", post(mock_gpt4o_generate))
        .route("/api/v1/gpt4o-image/record-info", get(mock_gpt4o_record))
        .route("/api/v1/flux/kontext/generate", post(mock_kontext_generate))
        .route("/api/v1/flux/kontext/record-info", get(mock_kontext_record))
        .route("/photos/selfie.jpg", get(serve_selfie))
        .route("/results/{name}", get(serve_result))
        .with_state(kie.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Wait a bit for the server to start
    sleep(Duration::from_millis(100)).await;

    Ok((base_url, kie))
}

/// Test context holding all shared resources
struct E2EContext {
    app: Router,
    storage: StorageClient,
    kie: Arc<MockKie>,
    kie_url: String,
    _temp: TempDir,
}

impl E2EContext {
    /// Initialize test context
    async fn setup(generating_polls: usize) -> Result<Self, Box<dyn std::error::Error>> {
        let (kie_url, kie) = start_mock_kie(generating_polls).await?;
        println!("Mock KIE server started at: {}", kie_url);

        let temp = TempDir::new()?;
        let keyspace = open_keyspace(temp.path().join("ledger"))?;
        let store = Arc::new(TaskStore::attach(&keyspace)?);
        let credits = Arc::new(CreditLedger::attach(&keyspace)?);

        let storage = StorageClient::in_memory();
        let fetcher = HttpFetcher::new(FetchOptions::default())?;
        let relocator: Arc<dyn AssetRelocator> = Arc::new(BucketRelocator::new(
            fetcher,
            storage.clone(),
            CDN_BASE,
        ));

        let provider: Arc<dyn ProviderClient> = Arc::new(KieClient::new(KieOptions {
            base_url: kie_url.clone(),
            api_key: "test-key".to_string(),
            ..KieOptions::default()
        })?);

        let metrics = Arc::new(Metrics::new());
        let intake = TaskIntake::new(
            store.clone(),
            credits.clone(),
            relocator.clone(),
            metrics.clone(),
            None,
        );
        let engine = LifecycleEngine::new(store.clone(), provider, relocator, metrics.clone(), true);

        let state = AppState::new(Config::default(), store, credits, intake, engine, metrics);

        Ok(Self {
            app: salon::api::router(state),
            storage,
            kie,
            kie_url,
            _temp: temp,
        })
    }

    async fn grant(&self, user_id: &str, amount: i64) {
        let request = Request::builder()
            .uri(format!("/operators/credits/{}", user_id))
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"amount": amount}).to_string()))
            .unwrap();
        let response = ServiceExt::<Request<Body>>::oneshot(self.app.clone(), request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    async fn submit(&self, user_id: &str, payload: serde_json::Value) -> HairstyleAccepted {
        let request = Request::builder()
            .uri("/api/hairstyles")
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .header("X-Salon-User", user_id)
            .body(Body::from(payload.to_string()))
            .unwrap();
        let response = ServiceExt::<Request<Body>>::oneshot(self.app.clone(), request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn poll_task(&self, task_no: &str) -> TaskStatusResponse {
        let request = Request::builder()
            .uri(format!("/api/tasks/{}", task_no))
            .method("GET")
            .body(Body::empty())
            .unwrap();
        let response = ServiceExt::<Request<Body>>::oneshot(self.app.clone(), request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn notify_webhook(&self, job_id: &str) -> StatusCode {
        let request = Request::builder()
            .uri("/webhooks/kie-image")
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"data": {"taskId": job_id}}).to_string()))
            .unwrap();
        let response = ServiceExt::<Request<Body>>::oneshot(self.app.clone(), request)
            .await
            .unwrap();
        response.status()
    }

    /// Storage key behind a public CDN URL
    fn storage_key(&self, public_url: &str) -> String {
        public_url
            .strip_prefix(&format!("{}/", CDN_BASE))
            .expect("URL is not behind the CDN base")
            .to_string()
    }

    fn order(&self, provider: &str, style: &str) -> serde_json::Value {
        json!({
            "photo_url": format!("{}/photos/selfie.jpg", self.kie_url),
            "provider": provider,
            "styles": [{"name": style}],
            "color": {"name": "Chestnut Brown", "value": "#8B4513"},
            "detail": "keep the fringe soft"
        })
    }
}

/// Test: full generation flow driven by client polling
#[tokio::test]
async fn test_e2e_generation_workflow() {
    let ctx = E2EContext::setup(1).await.expect("Failed to setup context");
    ctx.grant("stylist-1", 3).await;

    let accepted = ctx.submit("stylist-1", ctx.order("kie_4o", "French Bob")).await;
    assert_eq!(accepted.tasks.len(), 1);
    assert_eq!(accepted.credits.debited, 1);
    assert_eq!(accepted.credits.balance, 2);
    let task_no = accepted.tasks[0].task_no.clone();

    println!("Order accepted, task: {}", task_no);

    // First poll submits the job to the provider
    let status = ctx.poll_task(&task_no).await;
    assert_eq!(status.task.status, TaskStatus::Running);
    assert_eq!(status.task.task_id.as_deref(), Some("kie-task-1"));
    assert_eq!(status.progress, 0.0);

    println!("Task started with provider job: kie-task-1");

    // The provider received the frozen request pointing at the staged photo
    let submission = ctx.kie.gpt4o_submissions.lock().unwrap()[0].clone();
    let staged_url = submission["filesUrl"][0].as_str().unwrap().to_string();
    assert!(staged_url.starts_with("https://cdn.salon.test/uploads/hairstyle/"));
    assert!(staged_url.ends_with(".jpg"));
    assert!(submission["prompt"].as_str().unwrap().contains("French Bob"));
    assert_eq!(submission["size"], "2:3");
    assert_eq!(submission["nVariants"], "4");

    // The staged copy holds the original photo bytes
    let staged = ctx
        .storage
        .download(&ctx.storage_key(&staged_url))
        .await
        .expect("Staged photo not in storage");
    assert_eq!(staged.as_slice(), SELFIE_BYTES);

    println!("Input photo staged and verified");

    // Second poll relays provider progress
    let status = ctx.poll_task(&task_no).await;
    assert_eq!(status.task.status, TaskStatus::Running);
    assert_eq!(status.progress, 0.42);

    println!("Provider progress: {}", status.progress);

    // Third poll completes the task and mirrors the result
    let status = ctx.poll_task(&task_no).await;
    assert_eq!(status.task.status, TaskStatus::Succeeded);
    assert_eq!(status.progress, 1.0);
    assert!(status.task.completed_at.is_some());
    assert!(status.task.fail_reason.is_none());

    let result_url = status.task.result_url.expect("No result URL");
    assert_eq!(
        result_url,
        format!("{}/result/hairstyle/{}.png", CDN_BASE, task_no)
    );

    let mirrored = ctx
        .storage
        .download(&ctx.storage_key(&result_url))
        .await
        .expect("Mirrored result not in storage");
    assert_eq!(mirrored.as_slice(), RESULT_BYTES);

    println!("✓ Test passed: hairstyle generation workflow");
}

/// Test: provider callback drives the task to completion
#[tokio::test]
async fn test_e2e_webhook_completion() {
    let ctx = E2EContext::setup(0).await.expect("Failed to setup context");
    ctx.grant("stylist-2", 1).await;

    let accepted = ctx.submit("stylist-2", ctx.order("kie_4o", "Pixie")).await;
    let task_no = accepted.tasks[0].task_no.clone();

    let status = ctx.poll_task(&task_no).await;
    assert_eq!(status.task.status, TaskStatus::Running);
    let job_id = status.task.task_id.clone().unwrap();

    println!("Task running, delivering callback for job: {}", job_id);

    // The callback only names the job; completion state is re-fetched
    assert_eq!(ctx.notify_webhook(&job_id).await, StatusCode::OK);

    let status = ctx.poll_task(&task_no).await;
    assert_eq!(status.task.status, TaskStatus::Succeeded);
    assert_eq!(status.progress, 1.0);

    let result_url = status.task.result_url.expect("No result URL");
    let mirrored = ctx
        .storage
        .download(&ctx.storage_key(&result_url))
        .await
        .expect("Mirrored result not in storage");
    assert_eq!(mirrored.as_slice(), RESULT_BYTES);

    // A late duplicate callback no longer matches a running task
    assert_eq!(ctx.notify_webhook(&job_id).await, StatusCode::NOT_FOUND);

    println!("✓ Test passed: webhook completion");
}

/// Test: Kontext provider flow
#[tokio::test]
async fn test_e2e_kontext_workflow() {
    let ctx = E2EContext::setup(0).await.expect("Failed to setup context");
    ctx.grant("stylist-3", 2).await;

    let accepted = ctx
        .submit("stylist-3", ctx.order("kie_kontext", "Buzz Cut"))
        .await;
    let task_no = accepted.tasks[0].task_no.clone();
    assert_eq!(accepted.tasks[0].aspect, "3:4");

    let status = ctx.poll_task(&task_no).await;
    assert_eq!(status.task.status, TaskStatus::Running);
    assert_eq!(status.task.task_id.as_deref(), Some("kontext-task-1"));

    // The frozen request carried the Kontext dialect
    let submission = ctx.kie.kontext_submissions.lock().unwrap()[0].clone();
    assert_eq!(submission["model"], "flux-kontext-pro");
    assert_eq!(submission["aspectRatio"], "3:4");
    assert_eq!(submission["outputFormat"], "png");
    assert!(
        submission["inputImage"]
            .as_str()
            .unwrap()
            .starts_with("https://cdn.salon.test/uploads/hairstyle/")
    );
    assert!(submission["prompt"].as_str().unwrap().contains("Buzz Cut"));

    let status = ctx.poll_task(&task_no).await;
    assert_eq!(status.task.status, TaskStatus::Succeeded);

    let result_url = status.task.result_url.expect("No result URL");
    assert_eq!(
        result_url,
        format!("{}/result/hairstyle/{}.png", CDN_BASE, task_no)
    );
    let mirrored = ctx
        .storage
        .download(&ctx.storage_key(&result_url))
        .await
        .expect("Mirrored result not in storage");
    assert_eq!(mirrored.as_slice(), RESULT_BYTES);

    println!("✓ Test passed: kontext workflow");
}
