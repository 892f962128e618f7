//! Tests for the provider client against a mock MiniMax server.

use std::time::Duration;

use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{
    body_partial_json, body_string_contains, header, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::client::{parse_accepted, ProviderClient, ProviderConfig};
use crate::error::ProviderError;
use crate::types::{ImageRequest, SpeechRequest, TextToVideoRequest};

// =============================================================================
// Test Helpers
// =============================================================================

fn test_config(base_url: &str) -> ProviderConfig {
    ProviderConfig {
        api_key: "test-key".to_string(),
        base_url: base_url.to_string(),
        public_base_url: "https://gw.example.com".to_string(),
        timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
    }
}

async fn client_for(server: &MockServer) -> ProviderClient {
    ProviderClient::new(test_config(&server.uri())).unwrap()
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
#[serial]
fn test_config_requires_api_key() {
    std::env::remove_var("MINIMAX_API_KEY");
    std::env::set_var("PUBLIC_BASE_URL", "https://gw.example.com");
    let result = ProviderConfig::from_env();
    assert!(matches!(result, Err(ProviderError::Config(_))));
}

#[test]
#[serial]
fn test_config_defaults() {
    std::env::set_var("MINIMAX_API_KEY", "k");
    std::env::set_var("PUBLIC_BASE_URL", "https://gw.example.com/");
    std::env::remove_var("MINIMAX_API_BASE_URL");
    std::env::remove_var("MINIMAX_TIMEOUT_SECS");

    let config = ProviderConfig::from_env().unwrap();
    assert_eq!(config.base_url, "https://api.minimax.io");
    assert_eq!(config.timeout, Duration::from_secs(120));
    assert_eq!(config.callback_url(), "https://gw.example.com/hailuo/callback");

    std::env::remove_var("MINIMAX_API_KEY");
    std::env::remove_var("PUBLIC_BASE_URL");
}

// =============================================================================
// Response Parsing Tests
// =============================================================================

#[test]
fn test_parse_accepted_with_task_id() {
    let accepted = parse_accepted(json!({
        "task_id": "106916112212032",
        "base_resp": {"status_code": 0, "status_msg": "success"}
    }))
    .unwrap();
    assert_eq!(accepted.task_id, "106916112212032");
}

#[test]
fn test_parse_accepted_without_task_id_is_rejected() {
    let err = parse_accepted(json!({
        "base_resp": {"status_code": 2013, "status_msg": "invalid params"}
    }))
    .unwrap_err();

    match err {
        ProviderError::Rejected { status_code, status_msg } => {
            assert_eq!(status_code, 2013);
            assert_eq!(status_msg, "invalid params");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_error_retryability() {
    assert!(ProviderError::from_http_status(429, "slow down").is_retryable());
    assert!(ProviderError::from_http_status(503, "down").is_retryable());
    assert!(!ProviderError::from_http_status(400, "bad").is_retryable());
    assert!(!ProviderError::bad_response("<html>").is_retryable());
}

#[test]
fn test_http_error_display_matches_wire_shape() {
    let err = ProviderError::from_http_status(401, "{\"error\":\"unauthorized\"}");
    assert_eq!(err.to_string(), "HTTP 401: {\"error\":\"unauthorized\"}");
}

// =============================================================================
// HTTP Tests
// =============================================================================

#[tokio::test]
async fn test_text_to_video_sends_defaults_and_callback() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/video_generation"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "MiniMax-Hailuo-02",
            "prompt": "a cat",
            "duration": 6,
            "resolution": "1080P",
            "aspect_ratio": "16:9",
            "prompt_optimizer": true,
            "fast_pretreatment": false,
            "callback_url": "https://gw.example.com/hailuo/callback"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "T1",
            "base_resp": {"status_code": 0, "status_msg": "success"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let accepted = client
        .text_to_video(&TextToVideoRequest::new("a cat"))
        .await
        .unwrap();
    assert_eq!(accepted.task_id, "T1");
}

#[tokio::test]
async fn test_non_success_status_maps_to_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/video_generation"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .text_to_video(&TextToVideoRequest::new("a cat"))
        .await
        .unwrap_err();

    match err {
        ProviderError::Http { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unparseable_body_is_bad_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/image_generation"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .text_to_image(&ImageRequest::new("garden"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::BadResponse(_)));
}

#[tokio::test]
async fn test_retrieve_file() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/files/retrieve"))
        .and(query_param("file_id", "F1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file": {
                "file_id": 123,
                "bytes": 5,
                "filename": "output.mp4",
                "purpose": "video_generation",
                "download_url": "https://cdn.example.com/output.mp4"
            },
            "base_resp": {"status_code": 0, "status_msg": "success"}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let file = client.retrieve_file("F1").await.unwrap();
    assert_eq!(file.file.filename, "output.mp4");
    assert_eq!(file.file.download_url, "https://cdn.example.com/output.mp4");
}

#[tokio::test]
async fn test_speech_async_uses_async_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/text_to_audio_v2_async"))
        .and(body_partial_json(json!({
            "text": "hello",
            "model": "speech-2.5-hd-preview",
            "voice_setting": {"voice_id": "English_expressive_narrator"},
            "audio_setting": {"audio_sample_rate": 32000, "bitrate": 128000, "format": "mp3", "channel": 2}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": 555})))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let accepted = client.speech_async(&SpeechRequest::new("hello")).await.unwrap();
    assert_eq!(accepted.task_id, "555");
}

#[tokio::test]
async fn test_template_status_passthrough() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/query/video_template_generation"))
        .and(query_param("task_id", "T9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "T9",
            "status": "Processing"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let status = client.template_status("T9").await.unwrap();
    assert_eq!(status["status"], "Processing");
}

#[tokio::test]
async fn test_upload_file_is_multipart() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/files/upload"))
        .and(body_string_contains("name=\"purpose\""))
        .and(body_string_contains("filename=\"sample.mp3\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file": {"file_id": 42, "filename": "sample.mp3", "purpose": "voice_clone"}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let result = client
        .upload_file("voice_clone", "sample.mp3", b"ID3".to_vec())
        .await
        .unwrap();
    assert_eq!(result["file"]["file_id"], 42);
}
