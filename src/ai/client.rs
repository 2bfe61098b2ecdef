use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::OpenAiConfig;
use crate::error::ApiError;

use super::parse::parse_json_content;

/// Extra attempts after the first one, for transport errors, 429 and 5xx.
pub const MAX_RETRIES: u32 = 2;
const RETRY_BACKOFF_MS: u64 = 750;
const USER_AGENT: &str = concat!("kitcheniq/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI provider is not configured")]
    NotConfigured,

    #[error("network error: {0}")]
    Transport(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}

impl From<AiError> for ApiError {
    fn from(e: AiError) -> Self {
        match e {
            AiError::NotConfigured => ApiError::NotConfigured("openai".into()),
            other => ApiError::upstream("openai", other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Chat,
    Vision,
}

/// One structured-output completion.
#[derive(Debug, Clone)]
pub struct JsonRequest {
    pub kind: ModelKind,
    pub system: String,
    pub user_text: String,
    /// http(s) URLs or `data:` URIs.
    pub image_urls: Vec<String>,
    pub schema_name: &'static str,
    pub schema: Value,
    pub max_tokens: u32,
}

#[async_trait]
pub trait AiClient: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn complete_json(&self, req: JsonRequest) -> Result<Value, AiError>;

    async fn transcribe(
        &self,
        audio: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<String, AiError>;

    async fn chat_json(
        &self,
        system: String,
        user_text: String,
        schema_name: &'static str,
        schema: Value,
    ) -> Result<Value, AiError> {
        self.complete_json(JsonRequest {
            kind: ModelKind::Chat,
            system,
            user_text,
            image_urls: Vec::new(),
            schema_name,
            schema,
            max_tokens: 4000,
        })
        .await
    }

    async fn vision_json(
        &self,
        system: String,
        user_text: String,
        image_urls: Vec<String>,
        schema_name: &'static str,
        schema: Value,
    ) -> Result<Value, AiError> {
        self.complete_json(JsonRequest {
            kind: ModelKind::Vision,
            system,
            user_text,
            image_urls,
            schema_name,
            schema,
            max_tokens: 3000,
        })
        .await
    }
}

pub struct OpenAiClient {
    http: reqwest::Client,
    cfg: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(cfg: OpenAiConfig) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| AiError::Transport(e.to_string()))?;
        Ok(Self { http, cfg })
    }

    fn api_key(&self) -> Result<&str, AiError> {
        self.cfg.api_key.as_deref().ok_or(AiError::NotConfigured)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.cfg.base_url.trim_end_matches('/'), path)
    }

    /// Sends the request built by `build`, retrying transient failures.
    async fn send_with_retry<F>(&self, op: &str, build: F) -> Result<reqwest::Response, AiError>
    where
        F: Fn() -> reqwest::RequestBuilder + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            match build().send().await {
                Ok(res) if res.status().is_success() => return Ok(res),
                Ok(res) => {
                    let status = res.status();
                    let body = res.text().await.unwrap_or_default();
                    let message = provider_message(&body);
                    if is_retryable(status) && attempt < MAX_RETRIES {
                        attempt += 1;
                        warn!(op, status = status.as_u16(), attempt, "openai request failed; retrying");
                        tokio::time::sleep(backoff(attempt)).await;
                        continue;
                    }
                    return Err(AiError::Api {
                        status: status.as_u16(),
                        message,
                    });
                }
                Err(e) => {
                    if attempt < MAX_RETRIES {
                        attempt += 1;
                        warn!(op, error = %e, attempt, "openai transport error; retrying");
                        tokio::time::sleep(backoff(attempt)).await;
                        continue;
                    }
                    return Err(AiError::Transport(e.to_string()));
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[async_trait]
impl AiClient for OpenAiClient {
    fn is_configured(&self) -> bool {
        self.cfg.api_key.is_some()
    }

    async fn complete_json(&self, req: JsonRequest) -> Result<Value, AiError> {
        let key = self.api_key()?.to_string();
        let model = match req.kind {
            ModelKind::Chat => &self.cfg.chat_model,
            ModelKind::Vision => &self.cfg.vision_model,
        };
        let body = chat_body(model, &req);
        let url = self.url("chat/completions");

        debug!(model = %model, schema = req.schema_name, images = req.image_urls.len(), "openai chat request");
        let res = self
            .send_with_retry("chat", || self.http.post(&url).bearer_auth(&key).json(&body))
            .await?;

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(e.to_string()))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AiError::InvalidResponse("no choices returned".into()))?;

        if let Some(refusal) = choice.message.refusal {
            return Err(AiError::InvalidResponse(format!("model refused: {}", refusal)));
        }
        if choice.finish_reason.as_deref() == Some("length") {
            return Err(AiError::InvalidResponse("response truncated".into()));
        }
        let content = choice
            .message
            .content
            .ok_or_else(|| AiError::InvalidResponse("empty message content".into()))?;

        let value = parse_json_content(&content)?;
        info!(schema = req.schema_name, "openai completion parsed");
        Ok(value)
    }

    async fn transcribe(
        &self,
        audio: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<String, AiError> {
        let key = self.api_key()?.to_string();
        let url = self.url("audio/transcriptions");
        let model = self.cfg.transcribe_model.clone();

        let res = self
            .send_with_retry("transcribe", || {
                let part = reqwest::multipart::Part::stream(audio.clone())
                    .file_name(filename.to_string());
                // An unparseable mime just falls back to the untyped part.
                let part = match part.mime_str(content_type) {
                    Ok(p) => p,
                    Err(_) => reqwest::multipart::Part::stream(audio.clone())
                        .file_name(filename.to_string()),
                };
                let form = reqwest::multipart::Form::new()
                    .text("model", model.clone())
                    .part("file", part);
                self.http.post(&url).bearer_auth(&key).multipart(form)
            })
            .await?;

        let parsed: TranscriptionResponse = res
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(e.to_string()))?;
        Ok(parsed.text.trim().to_string())
    }
}

fn chat_body(model: &str, req: &JsonRequest) -> Value {
    let mut content = vec![json!({ "type": "text", "text": req.user_text })];
    for url in &req.image_urls {
        content.push(json!({
            "type": "image_url",
            "image_url": { "url": url, "detail": "auto" }
        }));
    }
    json!({
        "model": model,
        "temperature": 0.4,
        "max_tokens": req.max_tokens,
        "messages": [
            { "role": "system", "content": req.system },
            { "role": "user", "content": content }
        ],
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": req.schema_name,
                "strict": true,
                "schema": req.schema
            }
        }
    })
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(RETRY_BACKOFF_MS * attempt as u64)
}

/// Pulls `error.message` out of an OpenAI error body, falling back to the raw text.
fn provider_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(300).collect())
}

/// Canned client for handler tests.
#[cfg(test)]
pub struct StaticAiClient {
    pub response: Value,
    pub transcript: String,
    pub requests: std::sync::Mutex<Vec<JsonRequest>>,
}

#[cfg(test)]
impl StaticAiClient {
    pub fn new(response: Value) -> Self {
        Self {
            response,
            transcript: "we have two eggs".into(),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl AiClient for StaticAiClient {
    fn is_configured(&self) -> bool {
        true
    }

    async fn complete_json(&self, req: JsonRequest) -> Result<Value, AiError> {
        self.requests.lock().unwrap().push(req);
        Ok(self.response.clone())
    }

    async fn transcribe(&self, _a: Bytes, _f: &str, _ct: &str) -> Result<String, AiError> {
        Ok(self.transcript.clone())
    }
}
