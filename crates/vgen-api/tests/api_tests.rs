//! Router-level tests against a mocked provider.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vgen_api::{create_router, ApiConfig, AppState};
use vgen_media::MediaLayout;
use vgen_provider::{ProviderClient, ProviderConfig};
use vgen_store::{MemoryStore, TierChain};

const PUBLIC_BASE: &str = "https://gw.example";

struct TestApp {
    server: MockServer,
    router: Router,
    _dir: TempDir,
}

async fn test_app() -> TestApp {
    test_app_with(ApiConfig::default()).await
}

async fn test_app_with(config: ApiConfig) -> TestApp {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let provider = ProviderClient::new(ProviderConfig {
        api_key: "test-key".into(),
        base_url: server.uri(),
        public_base_url: PUBLIC_BASE.into(),
        timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
    })
    .unwrap();

    let chain = TierChain::new().with_tier(Arc::new(MemoryStore::new()));
    let layout = MediaLayout::new(dir.path().join("out"), dir.path().join("archive"), PUBLIC_BASE);
    layout.ensure_dirs().await.unwrap();

    let state = AppState::from_parts(config, provider, chain, layout);

    TestApp {
        server,
        router: create_router(state, None),
        _dir: dir,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

async fn mount_video_accept(server: &MockServer, task_id: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/video_generation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": task_id,
            "base_resp": {"status_code": 0, "status_msg": "success"}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_healthz() {
    let app = test_app().await;
    let (status, body) = app.get("/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["version"], "2.0.0");
    assert!(body["uptime"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn test_ready_reports_memory_tier() {
    let app = test_app().await;
    let (status, body) = app.get("/ready").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"][0]["tier"], "memory");
}

#[tokio::test]
async fn test_unknown_job_is_pending() {
    let app = test_app().await;
    let (status, body) = app.get("/api/job/never-seen").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["message"], "Job not found or not yet started");
}

#[tokio::test]
async fn test_challenge_is_echoed() {
    let app = test_app().await;
    let (status, body) = app
        .post("/hailuo/callback", json!({"challenge": "abc123"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"challenge": "abc123"}));
    assert!(app.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_text_video_then_success_callback() {
    let app = test_app().await;
    mount_video_accept(&app.server, "T100").await;

    Mock::given(method("GET"))
        .and(path("/v1/files/retrieve"))
        .and(query_param("file_id", "F100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file": {
                "file_id": "F100",
                "filename": "clip.mp4",
                "download_url": format!("{}/download/clip.mp4", app.server.uri())
            },
            "base_resp": {"status_code": 0, "status_msg": "success"}
        })))
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/download/clip.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4-bytes".to_vec()))
        .mount(&app.server)
        .await;

    let (status, body) = app
        .post(
            "/api/generate-text-video",
            json!({"prompt": "a cat surfing", "topic": "animals", "lang": "en"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task_id"], "T100");

    let (_, job) = app.get("/api/job/T100").await;
    assert_eq!(job["status"], "processing");
    assert_eq!(job["kind"], "t2v");
    assert_eq!(job["topic"], "animals");

    let (status, ack) = app
        .post(
            "/hailuo/callback",
            json!({"task_id": "T100", "status": "success", "file_id": "F100"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "ok");

    let (_, job) = app.get("/api/job/T100").await;
    assert_eq!(job["status"], "success");
    assert_eq!(job["public_url"], "https://gw.example/out/T100_clip.mp4");
    assert!(job["finished_at"].is_string());
}

#[tokio::test]
async fn test_missing_prompt_is_rejected_before_provider() {
    let app = test_app().await;
    let (status, body) = app.post("/api/generate-text-video", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "prompt is required");
    assert_eq!(body["base_resp"]["status_code"], 2013);
    assert!(app.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_json_uses_invalid_params_code() {
    let app = test_app().await;
    let (status, body) = app
        .send(
            Request::post("/api/generate-image")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["base_resp"]["status_code"], 2013);
}

#[tokio::test]
async fn test_sync_speech_text_limit() {
    let app = test_app().await;
    let text = "a".repeat(10_001);
    let (status, body) = app.post("/api/t2a_v2", json!({"text": text})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Text too long for sync mode (max 10K chars)");
    assert_eq!(body["base_resp"]["status_code"], 2014);
}

#[tokio::test]
async fn test_provider_failure_is_bad_gateway_and_not_recorded() {
    let app = test_app().await;
    Mock::given(method("POST"))
        .and(path("/v1/video_generation"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&app.server)
        .await;

    let (status, body) = app
        .post(
            "/api/generate-image-video",
            json!({"first_frame_image": "https://img.example/a.jpg"}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["base_resp"]["status_code"], 1000);
}

#[tokio::test]
async fn test_invalid_callback_is_acknowledged() {
    let app = test_app().await;
    let (status, body) = app
        .post("/hailuo/callback", json!({"status": "success"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "callback is missing task_id");
}

#[tokio::test]
async fn test_failed_callback_without_prior_record() {
    let app = test_app().await;
    let (status, _) = app
        .post(
            "/hailuo/callback",
            json!({
                "task_id": "T7",
                "status": "failed",
                "base_resp": {"status_code": 1026, "status_msg": "content flagged"}
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, job) = app.get("/api/job/T7").await;
    assert_eq!(job["status"], "failed");
    assert_eq!(job["error"], "content flagged");
    assert!(job["public_url"].is_null());
}

#[tokio::test]
async fn test_compose_requires_clips() {
    let app = test_app().await;
    let (status, body) = app.post("/api/compose", json!({"clips": []})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "clips array is required");
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let app = test_app().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(headers["content-security-policy"]
        .to_str()
        .unwrap()
        .contains("object-src 'none'"));
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_demo_routes_are_rate_limited() {
    let config = ApiConfig {
        demo_rate_limit_per_minute: 1,
        ..ApiConfig::default()
    };
    let app = test_app_with(config).await;
    mount_video_accept(&app.server, "D1").await;

    let demo = || {
        Request::get("/demo/t2v")
            .header("x-forwarded-for", "198.51.100.4")
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = app.send(demo()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"task_id": "D1"}));

    let (status, body) = app.send(demo()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["status_code"], 1002);
    assert_eq!(body["error"], "Too many demo requests, please wait a moment.");
}
