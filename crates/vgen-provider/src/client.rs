//! MiniMax REST API client.
//!
//! Thin, typed wrapper over the provider's HTTP API with:
//! - Bearer authentication
//! - HTTP client tuning (pooling, timeouts)
//! - Observability (tracing spans, metrics)
//! - One normalized error shape

use std::time::{Duration, Instant};

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info_span, Instrument};

use vgen_models::BaseResp;

use crate::error::{ProviderError, ProviderResult};
use crate::metrics::record_request;
use crate::types::{
    FileRetrieveResponse, ImageRequest, ImageToVideoRequest, SpeechRequest, StartEndVideoRequest,
    TaskAccepted, TemplateBody, TemplateRequest, TextToVideoRequest, VideoGenerationBody,
    VoiceCloneRequest,
};

pub const DEFAULT_BASE_URL: &str = "https://api.minimax.io";

/// Path the provider posts completion callbacks to.
pub const CALLBACK_PATH: &str = "/hailuo/callback";

// =============================================================================
// Configuration
// =============================================================================

/// Provider client configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API key sent as a Bearer token
    pub api_key: String,
    /// Provider API root
    pub base_url: String,
    /// Externally reachable root of this gateway
    pub public_base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl ProviderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        let api_key = required_env("MINIMAX_API_KEY")?;
        let public_base_url = required_env("PUBLIC_BASE_URL")?;

        let timeout_secs: u64 = std::env::var("MINIMAX_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(120);

        Ok(Self {
            api_key,
            base_url: std::env::var("MINIMAX_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            public_base_url,
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(10),
        })
    }

    /// Webhook URL handed to the provider with every async submission.
    pub fn callback_url(&self) -> String {
        format!("{}{}", self.public_base_url.trim_end_matches('/'), CALLBACK_PATH)
    }
}

fn required_env(name: &str) -> ProviderResult<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ProviderError::config(format!(
            "Missing required environment variable: {name}"
        ))),
    }
}

// =============================================================================
// Client
// =============================================================================

/// MiniMax REST API client.
#[derive(Clone)]
pub struct ProviderClient {
    http: Client,
    config: ProviderConfig,
    callback_url: String,
}

impl ProviderClient {
    /// Create a new provider client.
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("vgen-provider/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ProviderError::Network)?;

        let callback_url = config.callback_url();
        Ok(Self {
            http,
            config,
            callback_url,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        Self::new(ProviderConfig::from_env()?)
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Shared HTTP client, reused for artifact downloads.
    pub fn http(&self) -> &Client {
        &self.http
    }

    // =========================================================================
    // Async task submission
    // =========================================================================

    pub async fn text_to_video(&self, req: &TextToVideoRequest) -> ProviderResult<TaskAccepted> {
        let body = VideoGenerationBody::new(&req.prompt, &req.settings, &self.callback_url);
        self.submit("text_to_video", "/v1/video_generation", &body).await
    }

    pub async fn image_to_video(&self, req: &ImageToVideoRequest) -> ProviderResult<TaskAccepted> {
        let mut body = VideoGenerationBody::new(&req.prompt, &req.settings, &self.callback_url);
        body.first_frame_image = Some(&req.first_frame_image);
        self.submit("image_to_video", "/v1/video_generation", &body).await
    }

    pub async fn start_end_video(&self, req: &StartEndVideoRequest) -> ProviderResult<TaskAccepted> {
        let mut body = VideoGenerationBody::new(&req.prompt, &req.settings, &self.callback_url);
        body.fast_pretreatment = None;
        body.first_frame_image = Some(&req.first_frame_image);
        body.last_frame_image = Some(&req.last_frame_image);
        self.submit("start_end_video", "/v1/video_generation", &body).await
    }

    pub async fn video_template(&self, req: &TemplateRequest) -> ProviderResult<TaskAccepted> {
        let body = TemplateBody {
            template_id: &req.template_id,
            media_inputs: &req.media_inputs,
            text_inputs: &req.text_inputs,
            callback_url: &self.callback_url,
        };
        self.submit("video_template", "/v1/video_template_generation", &body)
            .await
    }

    pub async fn speech_async(&self, req: &SpeechRequest) -> ProviderResult<TaskAccepted> {
        self.submit("speech_async", "/v1/text_to_audio_v2_async", req).await
    }

    // =========================================================================
    // Sync calls
    // =========================================================================

    pub async fn speech(&self, req: &SpeechRequest) -> ProviderResult<Value> {
        self.post_json("speech", "/v1/text_to_audio_v2", req).await
    }

    pub async fn text_to_image(&self, req: &ImageRequest) -> ProviderResult<Value> {
        self.post_json("text_to_image", "/v1/image_generation", &req.body())
            .await
    }

    pub async fn voice_clone(&self, req: &VoiceCloneRequest) -> ProviderResult<Value> {
        self.post_json("voice_clone", "/v1/voice_clone", req).await
    }

    pub async fn template_status(&self, task_id: &str) -> ProviderResult<Value> {
        self.get_json(
            "template_status",
            "/v1/query/video_template_generation",
            &[("task_id", task_id)],
        )
        .await
    }

    /// Retrieve metadata (including the download URL) of a provider file.
    pub async fn retrieve_file(&self, file_id: &str) -> ProviderResult<FileRetrieveResponse> {
        self.get_json("retrieve_file", "/v1/files/retrieve", &[("file_id", file_id)])
            .await
    }

    /// Upload a file, e.g. a voice sample for cloning.
    pub async fn upload_file(
        &self,
        purpose: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> ProviderResult<Value> {
        let form = Form::new()
            .text("purpose", purpose.to_string())
            .part("file", Part::bytes(bytes).file_name(filename.to_string()));

        let request = self
            .request(Method::POST, "/v1/files/upload")
            .multipart(form);
        self.execute_request("upload_file", self.send_and_parse(request))
            .await
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    async fn submit<B: Serialize + ?Sized>(
        &self,
        operation: &str,
        path: &str,
        body: &B,
    ) -> ProviderResult<TaskAccepted> {
        let value: Value = self.post_json(operation, path, body).await?;
        parse_accepted(value)
    }

    async fn post_json<B, T>(&self, operation: &str, path: &str, body: &B) -> ProviderResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, path).json(body);
        self.execute_request(operation, self.send_and_parse(request))
            .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> ProviderResult<T> {
        let request = self.request(Method::GET, path).query(query);
        self.execute_request(operation, self.send_and_parse(request))
            .await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        self.http
            .request(method, url)
            .bearer_auth(&self.config.api_key)
    }

    async fn send_and_parse<T: DeserializeOwned>(&self, request: RequestBuilder) -> ProviderResult<T> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        debug!(status = status.as_u16(), "Provider response");

        if !status.is_success() {
            return Err(ProviderError::from_http_status(status.as_u16(), text));
        }

        serde_json::from_str(&text).map_err(|_| ProviderError::bad_response(&text))
    }

    /// Execute a request with tracing span and metrics.
    async fn execute_request<T, F>(&self, operation: &str, fut: F) -> ProviderResult<T>
    where
        F: std::future::Future<Output = ProviderResult<T>>,
    {
        let span = info_span!("provider_request", operation = %operation);

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }
}

/// Pull a task id out of an async submission response.
///
/// The provider answers 200 with a non-zero `base_resp.status_code` and no
/// task id when it refuses a request.
pub(crate) fn parse_accepted(value: Value) -> ProviderResult<TaskAccepted> {
    let base_resp: Option<BaseResp> = value
        .get("base_resp")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok());

    let task_id = match value.get("task_id") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    match task_id {
        Some(task_id) => Ok(TaskAccepted { task_id, base_resp }),
        None => {
            let base = base_resp.unwrap_or_default();
            Err(ProviderError::Rejected {
                status_code: base.status_code.unwrap_or(-1),
                status_msg: base
                    .status_msg
                    .unwrap_or_else(|| "response carried no task_id".to_string()),
            })
        }
    }
}
