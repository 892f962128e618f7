//! Replay policy for PostgREST requests.
//!
//! Only requests that are safe to send twice are replayed: reads, and
//! upserts with `resolution=merge-duplicates` (a replayed upsert lands on
//! the same row with the same columns). Health probes fail fast so the
//! readiness report stays quick.

use std::time::Duration;

use tracing::{info_span, warn, Instrument};

use crate::error::StoreResult;
use crate::metrics::record_retry;

/// PostgREST requests issued by the Supabase tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostgrestRequest {
    Upsert,
    Select,
    Ping,
}

impl PostgrestRequest {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostgrestRequest::Upsert => "upsert",
            PostgrestRequest::Select => "select",
            PostgrestRequest::Ping => "ping",
        }
    }

    fn replayable(&self) -> bool {
        !matches!(self, PostgrestRequest::Ping)
    }
}

/// Backoff between replays.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Replays after the first attempt
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Growth factor applied after each replay
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Read `SUPABASE_RETRY_MAX`, `SUPABASE_RETRY_INITIAL_MS` and
    /// `SUPABASE_RETRY_MAX_MS`, falling back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let env_u64 = |key: &str| std::env::var(key).ok().and_then(|s| s.parse::<u64>().ok());

        Self {
            max_retries: std::env::var("SUPABASE_RETRY_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retries),
            initial_delay: env_u64("SUPABASE_RETRY_INITIAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_delay),
            max_delay: env_u64("SUPABASE_RETRY_MAX_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_delay),
            multiplier: defaults.multiplier,
        }
    }

    /// Delay following `current`, clamped to `max_delay`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let next_ms = (current.as_millis() as f64 * self.multiplier) as u64;
        Duration::from_millis(next_ms).min(self.max_delay)
    }
}

/// Send a PostgREST request, replaying it on transient failures when the
/// request kind allows it. A server `Retry-After` replaces the backoff
/// delay for that wait, still clamped to `max_delay`.
pub async fn send_with_retry<T, F, Fut>(
    config: &RetryConfig,
    request: PostgrestRequest,
    op: F,
) -> StoreResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = StoreResult<T>>,
{
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let span = info_span!("postgrest_attempt", request = request.as_str(), attempt);

        let err = match op().instrument(span).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !request.replayable() || !err.is_transient() || attempt > config.max_retries {
            return Err(err);
        }

        let wait = err
            .retry_after_ms()
            .map(Duration::from_millis)
            .unwrap_or(delay)
            .min(config.max_delay);

        warn!(
            request = request.as_str(),
            attempt,
            delay_ms = wait.as_millis() as u64,
            error = %err,
            "PostgREST request failed, replaying"
        );
        record_retry(request.as_str());

        tokio::time::sleep(wait).await;
        delay = config.next_delay(delay);
    }
}
