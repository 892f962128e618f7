//! Supabase tier over the PostgREST API.
//!
//! Upserts use `Prefer: resolution=merge-duplicates` with null fields left
//! out of the body, so PostgREST only touches the columns that were sent.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, info_span, Instrument};

use vgen_models::{JobId, JobRecord};

use crate::error::{StoreError, StoreResult};
use crate::metrics::record_operation;
use crate::retry::{send_with_retry, PostgrestRequest, RetryConfig};
use crate::row::{TaskRow, COLUMNS};
use crate::store::{JobStore, StoreTier};

// =============================================================================
// Configuration
// =============================================================================

/// Supabase tier configuration.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    pub service_role_key: String,
    pub table: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
}

impl SupabaseConfig {
    /// Create config from environment variables.
    ///
    /// Returns `None` unless both `SUPABASE_URL` and
    /// `SUPABASE_SERVICE_ROLE_KEY` are set.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("SUPABASE_URL").ok().filter(|s| !s.trim().is_empty())?;
        let service_role_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty())?;

        Some(Self {
            url,
            service_role_key,
            table: std::env::var("SUPABASE_TABLE").unwrap_or_else(|_| "tasks".to_string()),
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::from_env(),
        })
    }
}

// =============================================================================
// Store
// =============================================================================

/// Secondary persistent tier.
#[derive(Clone)]
pub struct SupabaseStore {
    http: Client,
    config: SupabaseConfig,
    table_url: String,
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig) -> StoreResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("vgen-store/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StoreError::Network)?;

        let table_url = format!(
            "{}/rest/v1/{}",
            config.url.trim_end_matches('/'),
            config.table
        );

        Ok(Self {
            http,
            config,
            table_url,
        })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.service_role_key)
            .bearer_auth(&self.config.service_role_key)
    }

    /// Execute a request with tracing span and metrics.
    async fn execute_request<T, F>(&self, operation: &str, id: Option<&str>, fut: F) -> StoreResult<T>
    where
        F: std::future::Future<Output = StoreResult<T>>,
    {
        let span = match id {
            Some(id) => info_span!("store_request", tier = "supabase", operation = %operation, task_id = %id),
            None => info_span!("store_request", tier = "supabase", operation = %operation),
        };

        let start = Instant::now();
        let result = fut.instrument(span).await;
        record_operation(
            StoreTier::Supabase.as_str(),
            operation,
            result.is_ok(),
            start.elapsed().as_millis() as f64,
        );
        result
    }

    async fn upsert_once(&self, url: &str, body: &Value) -> StoreResult<()> {
        let response = self
            .authed(self.http.post(url))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_response(status, response).await);
        }
        Ok(())
    }

    async fn select_once(&self, url: &str) -> StoreResult<Option<JobRecord>> {
        let response = self.authed(self.http.get(url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_response(status, response).await);
        }

        let rows: Vec<TaskRow> = response
            .json()
            .await
            .map_err(|e| StoreError::invalid_response(e.to_string()))?;
        rows.into_iter().next().map(JobRecord::try_from).transpose()
    }

    async fn handle_error_response(status: StatusCode, response: reqwest::Response) -> StoreError {
        let retry_after_ms = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|secs| secs.saturating_mul(1000));
        let body = response.text().await.unwrap_or_default();
        StoreError::from_postgrest(status.as_u16(), &body, retry_after_ms)
    }
}

/// Serialize a record for upsert, leaving out nulls so stored values win.
pub(crate) fn upsert_body(job: &JobRecord) -> StoreResult<Value> {
    let mut value = serde_json::to_value(job)?;
    if let Value::Object(map) = &mut value {
        map.retain(|_, v| !v.is_null());
    }
    Ok(value)
}

#[async_trait]
impl JobStore for SupabaseStore {
    fn tier(&self) -> StoreTier {
        StoreTier::Supabase
    }

    async fn put(&self, job: &JobRecord) -> StoreResult<()> {
        let body = upsert_body(job)?;
        let url = format!("{}?on_conflict=id", self.table_url);
        let (url, body) = (url.as_str(), &body);

        self.execute_request(
            "put",
            Some(job.id.as_str()),
            send_with_retry(&self.config.retry, PostgrestRequest::Upsert, move || {
                self.upsert_once(url, body)
            }),
        )
        .await?;

        debug!(task_id = %job.id, "Supabase upsert ok");
        Ok(())
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<JobRecord>> {
        let url = format!(
            "{}?id=eq.{}&select={}&limit=1",
            self.table_url,
            urlencoding::encode(id.as_str()),
            COLUMNS
        );
        let url = url.as_str();

        self.execute_request(
            "get",
            Some(id.as_str()),
            send_with_retry(&self.config.retry, PostgrestRequest::Select, move || {
                self.select_once(url)
            }),
        )
        .await
    }

    async fn ping(&self) -> StoreResult<()> {
        let url = format!("{}?select=id&limit=1", self.table_url);
        let url = url.as_str();

        send_with_retry(&self.config.retry, PostgrestRequest::Ping, move || async move {
            let response = self.authed(self.http.get(url)).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Self::handle_error_response(status, response).await);
            }
            Ok::<(), StoreError>(())
        })
        .await
    }
}
