//! LLM backend trait and concrete implementations.
//!
//! Backends:
//!   OllamaBackend           — local Ollama (OpenAI-compatible)
//!   OpenAiBackend           — OpenAI API (gpt-4o, gpt-4o-mini, …)
//!   OpenAiCompatibleBackend — any OpenAI-compatible endpoint (LMStudio,
//!                             TogetherAI, Groq, OpenRouter, vLLM, …)
//!   AnthropicBackend        — Anthropic Messages API (claude-*)
//!
//! Every backend supports both whole-response completion and chunked text
//! streaming; the chat endpoint relays the stream to clients as it arrives.

use async_trait::async_trait;
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;
use tokio_stream::wrappers::ReceiverStream;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Missing API key: {0}")]
    MissingApiKey(String),
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
}

// ── Request / Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String, // "system" | "user" | "assistant"
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Chunked completion text as the provider emits it.
pub type TextStream = Pin<Box<dyn futures_util::Stream<Item = Result<String, LlmError>> + Send>>;

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError>;
    async fn complete_stream(&self, req: LlmRequest) -> Result<TextStream, LlmError>;
    fn model_id(&self) -> &str;
    fn is_local(&self) -> bool;
}

// ── Helpers: OpenAI-style responses and SSE streams ──────────────────────────

fn parse_openai_response(json: &serde_json::Value, fallback_model: &str) -> LlmResponse {
    LlmResponse {
        content: json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string(),
        model: json["model"].as_str().unwrap_or(fallback_model).to_string(),
        prompt_tokens: json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    }
}

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = resp.status().as_u16();
    let body: serde_json::Value = resp.json().await?;
    if status >= 400 {
        let msg = body["error"]["message"]
            .as_str()
            .or_else(|| body["message"].as_str())
            .unwrap_or("unknown API error")
            .to_string();
        return Err(LlmError::ApiError { status, message: msg });
    }
    Ok(body)
}

async fn check_stream_status(resp: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = resp.status().as_u16();
    if status >= 400 {
        let body = resp.text().await.unwrap_or_default();
        return Err(LlmError::ApiError { status, message: body });
    }
    Ok(resp)
}

/// Extract the text delta from one parsed SSE `data:` payload.
/// `None` means the event carries no text (pings, role headers, stops).
type DeltaFn = fn(&serde_json::Value) -> Option<String>;

fn openai_delta(json: &serde_json::Value) -> Option<String> {
    json["choices"][0]["delta"]["content"].as_str().map(str::to_string)
}

fn anthropic_delta(json: &serde_json::Value) -> Option<String> {
    json["delta"]["text"].as_str().map(str::to_string)
}

/// Read a provider SSE body line-by-line and forward the text deltas.
/// `data: [DONE]` (OpenAI convention) terminates; so does end of body.
fn sse_text_stream(resp: reqwest::Response, delta: DeltaFn) -> TextStream {
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<String, LlmError>>(32);
    tokio::spawn(async move {
        let mut body = resp.bytes_stream();
        let mut buf = String::new();
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    let _ = tx.send(Err(LlmError::Http(e))).await;
                    return;
                }
            };
            buf.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(pos) = buf.find('\n') {
                let line: String = buf.drain(..=pos).collect();
                let Some(data) = line.trim().strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    return;
                }
                let Ok(json) = serde_json::from_str::<serde_json::Value>(data) else {
                    continue;
                };
                if let Some(text) = delta(&json) {
                    if !text.is_empty() && tx.send(Ok(text)).await.is_err() {
                        return;
                    }
                }
            }
        }
    });
    Box::pin(ReceiverStream::new(rx))
}

fn openai_style_body(req: &LlmRequest, default_model: &str, stream: bool) -> serde_json::Value {
    serde_json::json!({
        "model":       req.model.as_deref().unwrap_or(default_model),
        "messages":    req.messages,
        "max_tokens":  req.max_tokens.unwrap_or(4096),
        "temperature": req.temperature.unwrap_or(1.0),
        "stream":      stream,
    })
}

// ── 1. Ollama (local) ─────────────────────────────────────────────────────────

pub struct OllamaBackend {
    pub base_url: String,
    pub model: String,
    client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), model: model.into(), client: reqwest::Client::new() }
    }

    fn chat_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = openai_style_body(&req, &self.model, false);
        let resp = self.client.post(self.chat_url()).json(&body).send().await?;
        let json = check_response_status(resp).await?;
        Ok(parse_openai_response(&json, &self.model))
    }

    async fn complete_stream(&self, req: LlmRequest) -> Result<TextStream, LlmError> {
        let body = openai_style_body(&req, &self.model, true);
        let resp = self.client.post(self.chat_url()).json(&body).send().await?;
        let resp = check_stream_status(resp).await?;
        Ok(sse_text_stream(resp, openai_delta))
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { true }
}

// ── 2. OpenAI ─────────────────────────────────────────────────────────────────

pub struct OpenAiBackend {
    pub model: String,
    api_key: SecretString,
    client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self { model: model.into(), api_key, client: reqwest::Client::new() }
    }
}

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = openai_style_body(&req, &self.model, false);
        let resp = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        Ok(parse_openai_response(&json, &self.model))
    }

    async fn complete_stream(&self, req: LlmRequest) -> Result<TextStream, LlmError> {
        let body = openai_style_body(&req, &self.model, true);
        let resp = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;
        let resp = check_stream_status(resp).await?;
        Ok(sse_text_stream(resp, openai_delta))
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
}

// ── 3. OpenAI-Compatible (LMStudio, TogetherAI, Groq, OpenRouter, vLLM, …) ──

pub struct OpenAiCompatibleBackend {
    pub base_url: String,
    pub model: String,
    api_key: Option<SecretString>,
    client: reqwest::Client,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<SecretString>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(k) => req.bearer_auth(k.expose_secret()),
            None => req,
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = openai_style_body(&req, &self.model, false);
        let resp = self.auth(self.client.post(self.chat_url())).json(&body).send().await?;
        let json = check_response_status(resp).await?;
        Ok(parse_openai_response(&json, &self.model))
    }

    async fn complete_stream(&self, req: LlmRequest) -> Result<TextStream, LlmError> {
        let body = openai_style_body(&req, &self.model, true);
        let resp = self.auth(self.client.post(self.chat_url())).json(&body).send().await?;
        let resp = check_stream_status(resp).await?;
        Ok(sse_text_stream(resp, openai_delta))
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
}

// ── 4. Anthropic (claude-*) ───────────────────────────────────────────────────

pub struct AnthropicBackend {
    pub model: String,
    api_key: SecretString,
    client: reqwest::Client,
}

impl AnthropicBackend {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self { api_key, model: model.into(), client: reqwest::Client::new() }
    }

    /// Messages API body — the system prompt travels in its own field.
    fn body(&self, req: &LlmRequest, stream: bool) -> serde_json::Value {
        let system = req
            .messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .unwrap_or("");

        let messages: Vec<serde_json::Value> = req
            .messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| serde_json::json!({"role": m.role, "content": m.content}))
            .collect();

        let mut body = serde_json::json!({
            "model":      req.model.as_deref().unwrap_or(&self.model),
            "messages":   messages,
            "max_tokens": req.max_tokens.unwrap_or(4096),
            "stream":     stream,
        });
        if !system.is_empty() {
            body["system"] = serde_json::Value::String(system.to_string());
        }
        body
    }

    fn request(&self, body: &serde_json::Value) -> reqwest::RequestBuilder {
        self.client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(body)
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let model = req.model.clone().unwrap_or_else(|| self.model.clone());
        let body = self.body(&req, false);
        let resp = self.request(&body).send().await?;
        let json = check_response_status(resp).await?;

        let content = json["content"]
            .as_array()
            .and_then(|blocks| blocks.first())
            .and_then(|b| b["text"].as_str())
            .unwrap_or("")
            .to_string();

        Ok(LlmResponse {
            content,
            model: json["model"].as_str().unwrap_or(&model).to_string(),
            prompt_tokens: json["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
            completion_tokens: json["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
        })
    }

    async fn complete_stream(&self, req: LlmRequest) -> Result<TextStream, LlmError> {
        let body = self.body(&req, true);
        let resp = self.request(&body).send().await?;
        let resp = check_stream_status(resp).await?;
        Ok(sse_text_stream(resp, anthropic_delta))
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_backend_is_not_local() {
        let b = OpenAiBackend::new(SecretString::from("sk-test"), "gpt-4o");
        assert!(!b.is_local());
        assert_eq!(b.model_id(), "gpt-4o");
    }

    #[test]
    fn test_ollama_is_local() {
        let b = OllamaBackend::new("http://localhost:11434", "llama3:8b");
        assert!(b.is_local());
        assert_eq!(b.chat_url(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn test_openai_compatible_with_no_key() {
        // No API key is valid for LMStudio / vLLM
        let b = OpenAiCompatibleBackend::new("http://localhost:1234/", "local-model", None);
        assert_eq!(b.model_id(), "local-model");
        assert_eq!(b.chat_url(), "http://localhost:1234/v1/chat/completions");
    }

    #[test]
    fn test_openai_delta_extraction() {
        let json: serde_json::Value = serde_json::from_str(
            r#"{"choices":[{"delta":{"content":"Fish oil"}}]}"#,
        )
        .unwrap();
        assert_eq!(openai_delta(&json).as_deref(), Some("Fish oil"));
        let role_only: serde_json::Value =
            serde_json::from_str(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert_eq!(openai_delta(&role_only), None);
    }

    #[test]
    fn test_anthropic_delta_extraction() {
        let json: serde_json::Value = serde_json::from_str(
            r#"{"type":"content_block_delta","delta":{"type":"text_delta","text":"CoQ10"}}"#,
        )
        .unwrap();
        assert_eq!(anthropic_delta(&json).as_deref(), Some("CoQ10"));
    }

    #[test]
    fn test_anthropic_body_splits_system_prompt() {
        let b = AnthropicBackend::new(SecretString::from("sk-ant-test"), "claude-sonnet-4-5");
        let req = LlmRequest {
            messages: vec![Message::system("rules"), Message::user("hi")],
            model: None,
            max_tokens: None,
            temperature: None,
        };
        let body = b.body(&req, false);
        assert_eq!(body["system"], "rules");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }
}
