//! OpenRouter adapter (chat completions).
//!
//! Implements the core `TextGenerator` port over the OpenAI-compatible
//! `chat/completions` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use chanpost_core::{config::Config, errors::Error, ports::TextGenerator, Result};

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Clone, Debug)]
pub struct OpenRouterClient {
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl OpenRouterClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("openrouter http client: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            cfg.openrouter_api_key.clone(),
            cfg.openrouter_base_url.clone(),
            cfg.text_model.clone(),
            cfg.external_timeout,
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl TextGenerator for OpenRouterClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.model, "requesting completion");
        let resp = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::External(format!("openrouter request error: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "openrouter completion failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::External(format!("openrouter json error: {e}")))?;

        extract_completion(&v)
    }
}

/// Pull `choices[0].message.content` out of a completion response.
pub fn extract_completion(v: &serde_json::Value) -> Result<String> {
    if let Some(err) = v.get("error") {
        let msg = err
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error");
        return Err(Error::External(format!("openrouter error: {msg}")));
    }

    let text = v
        .pointer("/choices/0/message/content")
        .and_then(|t| t.as_str())
        .unwrap_or("")
        .trim()
        .to_string();

    if text.is_empty() {
        return Err(Error::External(
            "openrouter completion returned empty text".to_string(),
        ));
    }
    Ok(text)
}
