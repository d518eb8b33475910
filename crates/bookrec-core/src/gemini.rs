//! generateContent client for the generative-language service.
//!
//! Request: `POST {base}/models/{model}:generateContent?key=…` with body
//! `{"contents":[{"parts":[{"text": …}]}]}`.
//! Response: free-form JSON; the answer lives at
//! `candidates[0].content.parts[0].text`. Nothing else in the response is
//! interpreted.

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::config::ApiConfig;

/// Pointer to the answer text inside a generateContent response.
pub const CANDIDATE_TEXT_POINTER: &str = "/candidates/0/content/parts/0/text";

#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Part {
    pub text: String,
}

impl GenerateContentRequest {
    /// Single-turn request carrying one text part.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.into(),
                }],
            }],
        }
    }
}

/// Raw response body.
#[derive(Debug, Clone)]
pub struct GenerateContentResponse(pub Value);

impl GenerateContentResponse {
    /// The first candidate's first text part. Empty text counts as absent.
    pub fn candidate_text(&self) -> Option<&str> {
        self.0
            .pointer(CANDIDATE_TEXT_POINTER)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
    }

    /// `promptFeedback.blockReason`, when the service refused the prompt.
    pub fn block_reason(&self) -> Option<&str> {
        self.0
            .pointer("/promptFeedback/blockReason")
            .and_then(Value::as_str)
    }

    /// `finishReason` of the first candidate, if any.
    pub fn finish_reason(&self) -> Option<&str> {
        self.0
            .pointer("/candidates/0/finishReason")
            .and_then(Value::as_str)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("service returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        // The URL carries the API key as a query parameter.
        ClientError::Request(e.without_url())
    }
}

/// Longest error body kept in `ClientError::Status`.
const MAX_ERROR_BODY: usize = 512;

pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &ApiConfig, api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), config, api_key)
    }

    pub fn with_client(
        http: reqwest::Client,
        config: &ApiConfig,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint_for_model(&config.base_url, &config.model),
            api_key: api_key.into(),
        }
    }

    /// Endpoint without the credential, safe to log.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one prompt. No timeout and no retry are applied here.
    pub async fn generate_content(
        &self,
        prompt: &str,
    ) -> Result<GenerateContentResponse, ClientError> {
        let body = GenerateContentRequest::from_prompt(prompt);
        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status,
                body: truncate_body(text),
            });
        }

        let value: Value = serde_json::from_str(&text)?;
        Ok(GenerateContentResponse(value))
    }
}

/// `{base}/models/{model}:generateContent`. A `models/` prefix on `model` is
/// accepted.
pub fn endpoint_for_model(base_url: &str, model: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let trimmed = model.trim();
    let model_path = if trimmed.starts_with("models/") {
        trimmed.to_string()
    } else {
        format!("models/{trimmed}")
    };
    format!("{base}/{model_path}:generateContent")
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push('…');
    }
    body
}
