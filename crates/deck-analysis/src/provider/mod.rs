//! Generative-AI backends behind one operation: system prompt + user message in,
//! raw response text out.
//!
//! Exactly one backend is active per process. It is chosen once at startup from
//! [`ProviderConfig`] and injected into the analyzer; nothing here reads the
//! environment per call.

pub mod gemini;
pub mod http;
pub mod openai;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;

use crate::error::AnalysisError;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

/// A generative-AI backend.
pub trait AiProvider: Send + Sync {
    /// Stable backend identifier, e.g. `"gemini"`.
    fn name(&self) -> &'static str;

    /// Model id requests are sent to.
    fn model(&self) -> &str;

    /// Send one request and return the model's raw text.
    fn analyze(
        &self,
        system_prompt: &str,
        user_content: &str,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("upstream returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("upstream returned non-JSON error: status={status} body={body}")]
    UpstreamBody { status: StatusCode, body: String },

    #[error("response contained no text: {0}")]
    NoContent(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
}

impl ProviderKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Some(ProviderKind::Gemini),
            "openai" => Some(ProviderKind::OpenAi),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
        }
    }

    fn api_key_var(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
        }
    }

    fn base_url_var(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_BASE_URL",
            ProviderKind::OpenAi => "OPENAI_BASE_URL",
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-2.5-flash",
            ProviderKind::OpenAi => "gpt-4o-mini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider settings, read once at process start.
#[derive(Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    /// `None` when the provider's key variable is unset or blank.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Upper bound on a single provider call.
    pub timeout: Duration,
    pub max_output_tokens: u32,
    /// Transport-level retries on 429/5xx/connect failures. 0 disables retries.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_error_body_bytes: usize,
}

// Hand-written so the API key never reaches logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl ProviderConfig {
    /// Load from environment variables.
    ///
    /// - `AI_PROVIDER`: `gemini` (default) or `openai`
    /// - `AI_MODEL`: model id (default depends on provider)
    /// - `GEMINI_API_KEY` / `OPENAI_API_KEY`
    /// - `GEMINI_BASE_URL` / `OPENAI_BASE_URL`
    /// - `AI_TIMEOUT_SECS` (60), `AI_MAX_OUTPUT_TOKENS` (8192)
    /// - `AI_MAX_RETRIES` (0), `AI_RETRY_INITIAL_MS` (200), `AI_RETRY_MAX_MS` (5000)
    /// - `AI_MAX_ERROR_BODY_BYTES` (8192)
    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Same as [`ProviderConfig::from_env`] with an explicit variable lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, AnalysisError> {
        let selector = var("AI_PROVIDER").unwrap_or_else(|| "gemini".to_string());
        let kind = ProviderKind::parse(&selector).ok_or_else(|| {
            AnalysisError::Configuration(format!(
                "unknown AI provider: {selector:?} (expected gemini or openai)"
            ))
        })?;

        let model = var("AI_MODEL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| kind.default_model().to_string());

        let api_key = var(kind.api_key_var())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let base_url = var(kind.base_url_var())
            .unwrap_or_else(|| kind.default_base_url().to_string());

        let parsed = |name: &str| var(name).and_then(|s| s.trim().parse::<u64>().ok());

        Ok(Self {
            kind,
            model,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(parsed("AI_TIMEOUT_SECS").filter(|&n| n > 0).unwrap_or(60)),
            max_output_tokens: parsed("AI_MAX_OUTPUT_TOKENS")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(8192),
            max_retries: parsed("AI_MAX_RETRIES")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0),
            initial_backoff: Duration::from_millis(parsed("AI_RETRY_INITIAL_MS").unwrap_or(200)),
            max_backoff: Duration::from_millis(parsed("AI_RETRY_MAX_MS").unwrap_or(5_000)),
            max_error_body_bytes: parsed("AI_MAX_ERROR_BODY_BYTES")
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(8 * 1024),
        })
    }

    /// The configured API key, or a configuration error naming the missing variable.
    pub fn require_api_key(&self) -> Result<&str, AnalysisError> {
        self.api_key.as_deref().ok_or_else(|| {
            AnalysisError::Configuration(format!(
                "{} environment variable is not set",
                self.kind.api_key_var()
            ))
        })
    }
}

/// The configured backend.
pub enum AiBackend {
    Gemini(GeminiProvider),
    OpenAi(OpenAiProvider),
}

impl AiBackend {
    /// Build the selected backend. Fails on missing credentials before any
    /// network traffic.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, AnalysisError> {
        match config.kind {
            ProviderKind::Gemini => GeminiProvider::new(config).map(AiBackend::Gemini),
            ProviderKind::OpenAi => OpenAiProvider::new(config).map(AiBackend::OpenAi),
        }
    }
}

impl AiProvider for AiBackend {
    fn name(&self) -> &'static str {
        match self {
            AiBackend::Gemini(p) => p.name(),
            AiBackend::OpenAi(p) => p.name(),
        }
    }

    fn model(&self) -> &str {
        match self {
            AiBackend::Gemini(p) => p.model(),
            AiBackend::OpenAi(p) => p.model(),
        }
    }

    async fn analyze(&self, system_prompt: &str, user_content: &str) -> Result<String, ProviderError> {
        match self {
            AiBackend::Gemini(p) => p.analyze(system_prompt, user_content).await,
            AiBackend::OpenAi(p) => p.analyze(system_prompt, user_content).await,
        }
    }
}
