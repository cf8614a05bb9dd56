#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use doc2md_backend::state::AppState;
use doc2md_backend::{build_router, RouterOptions};
use doc2md_config::SecurityConfig;
use doc2md_converter::{ConvertError, Converter};
use doc2md_job_queue::{JobQueueClient, JobRun};
use doc2md_stats::{StatsDbConfig, StatsLogger, StatsRecorder};
use doc2md_store::{KvStore, MemoryStore};
use doc2md_tasks::{register_all_executors, TaskStore};
use serde_json::Value;
use tower::util::ServiceExt;

pub const BOUNDARY: &str = "doc2md-test-boundary";

/// Converter double: counts calls and reports the size of what it was given.
#[derive(Default)]
pub struct FakeConverter {
    pub calls: AtomicUsize,
    pub fail_with: Option<String>,
}

impl FakeConverter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Converter for FakeConverter {
    fn name(&self) -> &str {
        "fake"
    }

    async fn convert_file(&self, path: &Path) -> Result<String, ConvertError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_with {
            return Err(ConvertError::Io(std::io::Error::other(message.clone())));
        }
        let bytes = tokio::fs::read(path).await?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(format!("# Converted {ext}\n\n{} bytes of input\n", bytes.len()))
    }
}

pub struct TestOptions {
    pub deploy_token: Option<String>,
    pub deploy_script: String,
    pub max_upload_bytes: usize,
    pub task_ttl: Duration,
    pub converter_error: Option<String>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            deploy_token: None,
            deploy_script: "/nonexistent/deploy.sh".to_string(),
            max_upload_bytes: RouterOptions::default().max_upload_bytes,
            task_ttl: Duration::from_secs(300),
            converter_error: None,
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub tasks: TaskStore,
    pub queue: JobQueueClient,
    pub stats: StatsLogger,
    pub converter: Arc<FakeConverter>,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(TestOptions::default()).await
}

pub async fn spawn_app_with(opts: TestOptions) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let kv: Arc<dyn KvStore> = store.clone();
    let tasks = TaskStore::new(kv.clone(), opts.task_ttl);
    let queue = JobQueueClient::new(kv, "test");

    let converter = Arc::new(FakeConverter {
        fail_with: opts.converter_error,
        ..FakeConverter::default()
    });
    register_all_executors(&queue, tasks.clone(), converter.clone()).await;

    let stats = doc2md_stats::open(&StatsDbConfig::new("sqlite::memory:"))
        .await
        .expect("open stats db");
    let (recorder, _writer) = StatsRecorder::spawn(stats.clone(), 64);

    let security = SecurityConfig {
        deploy_token: opts.deploy_token.unwrap_or_default(),
        deploy_script: opts.deploy_script,
    };
    let state = AppState::new(tasks.clone(), queue.clone(), stats.clone(), recorder, security);
    let router = build_router(
        Arc::new(state),
        &RouterOptions {
            max_upload_bytes: opts.max_upload_bytes,
            ..RouterOptions::default()
        },
    );

    TestApp {
        router,
        store,
        tasks,
        queue,
        stats,
        converter,
    }
}

pub fn multipart_body(field: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 256);
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(filename: &str, bytes: &[u8]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/convert")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
        .header(header::USER_AGENT, "doc2md-tests")
        .body(Body::from(multipart_body("file", filename, bytes)))
        .unwrap()
}

pub async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(router, req).await
}

pub async fn get_with_token(router: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("x-deploy-token", token)
        .body(Body::empty())
        .unwrap();
    send(router, req).await
}

pub async fn upload(app: &TestApp, filename: &str, bytes: &[u8]) -> (StatusCode, Value) {
    send(&app.router, upload_request(filename, bytes)).await
}

/// Upload a document and return its task id.
pub async fn queued_task(app: &TestApp, filename: &str, bytes: &[u8]) -> String {
    let (status, body) = upload(app, filename, bytes).await;
    assert_eq!(status, StatusCode::OK, "upload failed: {body}");
    body["task_id"].as_str().expect("task_id").to_string()
}

/// Run one queued job to completion.
pub async fn process_next(app: &TestApp) -> JobRun {
    app.queue
        .run_next(Duration::from_millis(200))
        .await
        .expect("queue")
        .expect("a queued job")
}

/// Wait for the analytics writer to catch up.
pub async fn wait_for_conversions(stats: &StatsLogger, expected: i64) {
    for _ in 0..200 {
        if stats.summary().await.unwrap().total_conversions >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("analytics never recorded {expected} conversions");
}
