use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ProviderConfig, ProviderError};
use crate::error::AnalysisError;

#[derive(Clone, Debug)]
pub struct TransportSettings {
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_error_body_bytes: usize,
}

impl TransportSettings {
    /// Wait before retry number `retry` (0-based): the initial backoff doubled
    /// per retry, capped at `max_backoff`, plus up to a quarter of that as jitter.
    fn retry_delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        let delay = self.initial_backoff.saturating_mul(factor).min(self.max_backoff);
        delay.saturating_add(jitter_up_to(delay / 4))
    }
}

impl From<&ProviderConfig> for TransportSettings {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            timeout: config.timeout,
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            max_error_body_bytes: config.max_error_body_bytes,
        }
    }
}

/// JSON-over-HTTPS with bounded retries, shared by every backend.
#[derive(Clone)]
pub struct HttpTransport {
    settings: TransportSettings,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(settings: TransportSettings) -> Result<Self, AnalysisError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("deck-analysis/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AnalysisError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { settings, http })
    }

    /// POST `body` as JSON and decode a JSON success response.
    pub async fn post_json<B, T>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &B,
    ) -> Result<T, ProviderError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned + Send,
    {
        self.request_with_retry(|| async move {
            let mut req = self.http.post(url).timeout(self.settings.timeout).json(body);
            for (name, value) in headers {
                req = req.header(*name, *value);
            }
            let resp = req.send().await?;
            parse_json_response(resp, self.settings.max_error_body_bytes).await
        })
        .await
    }

    async fn request_with_retry<T, Fut, F>(&self, mut f: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if attempt > self.settings.max_retries || !should_retry(&e) {
                        return Err(e);
                    }
                    let delay = self.settings.retry_delay(attempt - 1);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "provider request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

async fn parse_json_response<T: DeserializeOwned>(
    resp: reqwest::Response,
    max_error_body_bytes: usize,
) -> Result<T, ProviderError> {
    if resp.status().is_success() {
        let bytes = resp.bytes().await?;
        return Ok(serde_json::from_slice(&bytes)?);
    }
    Err(to_upstream_error(resp, max_error_body_bytes).await)
}

async fn to_upstream_error(resp: reqwest::Response, max_error_body_bytes: usize) -> ProviderError {
    let status = resp.status();
    let body = read_error_body(resp, max_error_body_bytes).await;
    upstream_error(status, body)
}

/// Both Gemini and OpenAI-compatible servers wrap failures as
/// `{"error": {"message": ...}}`; anything else is kept verbatim.
fn upstream_error(status: StatusCode, body: String) -> ProviderError {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(&body) {
        let message = parsed
            .error
            .message
            .unwrap_or_else(|| "unknown upstream error".to_string());
        return ProviderError::Upstream { status, message };
    }
    ProviderError::UpstreamBody { status, body }
}

pub(crate) fn should_retry(err: &ProviderError) -> bool {
    match err {
        ProviderError::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        ProviderError::Upstream { status, .. } | ProviderError::UpstreamBody { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
        ProviderError::InvalidJson(_) | ProviderError::NoContent(_) | ProviderError::Timeout(_) => {
            false
        }
    }
}

/// Clock-derived jitter in `[0, max]`; retries only need spreading, not randomness.
fn jitter_up_to(max: Duration) -> Duration {
    let span = max.as_nanos() as u64;
    if span == 0 {
        return Duration::ZERO;
    }
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or_default();
    Duration::from_nanos(seed % (span + 1))
}

/// Collect at most `max_bytes` of an error body, chunk by chunk, so an
/// oversized upstream page is never buffered whole.
async fn read_error_body(mut resp: reqwest::Response, max_bytes: usize) -> String {
    let mut body = Vec::new();
    while body.len() < max_bytes {
        match resp.chunk().await {
            Ok(Some(chunk)) => {
                let room = max_bytes - body.len();
                body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            }
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, read = body.len(), "upstream error body read interrupted");
                if body.is_empty() {
                    return "<failed to read error body>".to_string();
                }
                break;
            }
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorObject,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    message: Option<String>,
}
