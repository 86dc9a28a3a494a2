//! Google Gemini `generateContent` backend.
//!
//! The system prompt travels as `systemInstruction` and the response MIME type
//! is pinned to `application/json`, so the model answers with a bare object.

use serde::{Deserialize, Serialize};

use super::http::{HttpTransport, TransportSettings};
use super::{AiProvider, ProviderConfig, ProviderError};
use crate::error::AnalysisError;

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiProvider {
    transport: HttpTransport,
    base_url: String,
    api_key: String,
    model: String,
    max_output_tokens: u32,
}

impl GeminiProvider {
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

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request<'a>(&self, system_prompt: &'a str, user_content: &'a str) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: system_prompt }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: user_content }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

impl AiProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, system_prompt: &str, user_content: &str) -> Result<String, ProviderError> {
        let request = self.build_request(system_prompt, user_content);
        let response: GenerateContentResponse = self
            .transport
            .post_json(
                &self.endpoint(),
                &[(API_KEY_HEADER, self.api_key.as_str())],
                &request,
            )
            .await?;
        candidate_text(response)
    }
}

/// Concatenated text parts of the first candidate.
fn candidate_text(response: GenerateContentResponse) -> Result<String, ProviderError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(ProviderError::NoContent(format!("prompt rejected: {reason}")));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ProviderError::NoContent(format!(
            "empty candidate (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }
    Ok(text)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}
