//! OpenAI-compatible `/chat/completions` backend.
//!
//! Works against api.openai.com and any server that speaks the same wire
//! format (vLLM, llama.cpp, LiteLLM) via `OPENAI_BASE_URL`.

use serde::{Deserialize, Serialize};

use super::http::{HttpTransport, TransportSettings};
use super::{AiProvider, ProviderConfig, ProviderError};
use crate::error::AnalysisError;

pub struct OpenAiProvider {
    transport: HttpTransport,
    base_url: String,
    api_key: String,
    model: String,
    max_output_tokens: u32,
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, AnalysisError> {
        let api_key = config.require_api_key()?.to_string();
        Ok(Self {
            transport: HttpTransport::new(TransportSettings::from(config))?,
            base_url: config.base_url.clone(),
            api_key,
            model: config.model.clone(),
            max_output_tokens: config.max_output_tokens,
        })
    }

    fn build_request<'a>(&'a self, system_prompt: &'a str, user_content: &'a str) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: system_prompt,
                },
                Message {
                    role: "user",
                    content: user_content,
                },
            ],
            max_tokens: Some(self.max_output_tokens),
            response_format: Some(ResponseFormat {
                r#type: "json_object",
            }),
        }
    }
}

impl AiProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, system_prompt: &str, user_content: &str) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let auth = format!("Bearer {}", self.api_key);
        let request = self.build_request(system_prompt, user_content);
        let response: ChatCompletionResponse = self
            .transport
            .post_json(&url, &[("authorization", auth.as_str())], &request)
            .await?;
        completion_text(response)
    }
}

fn completion_text(response: ChatCompletionResponse) -> Result<String, ProviderError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::NoContent("response had no choices".to_string()))?;
    match choice.message.content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ProviderError::NoContent(format!(
            "empty completion (finish reason: {})",
            choice.finish_reason.as_deref().unwrap_or("unknown")
        ))),
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: Option<String>,
}
