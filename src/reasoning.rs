//! Reasoning provider abstraction.
//!
//! The [`Reasoner`] trait is the planner's only window onto a language
//! model: a message list in, raw text out. The OpenAI-compatible
//! implementation covers any chat-completions endpoint; vision requests
//! ride the same endpoint with a base64 image part.
//!
//! Failures here are ordinary values to the caller — the plan generator
//! converts them into error plans, never panics or propagated errors.

use anyhow::{bail, Result};
use async_trait::async_trait;
use base64::Engine;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ReasoningConfig;

/// One chat message in a reasoning request.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Sends a prompt to a language model and returns its raw text reply.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn ask(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Ask with an attached image (PNG bytes); used for vision analysis.
    async fn ask_with_image(&self, prompt: &str, image: &[u8]) -> Result<String>;
}

/// Create the appropriate [`Reasoner`] based on configuration.
pub fn create_reasoner(config: &ReasoningConfig) -> Result<Arc<dyn Reasoner>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledReasoner)),
        "openai" => Ok(Arc::new(OpenAiReasoner::new(config)?)),
        other => bail!("Unknown reasoning provider: {}", other),
    }
}

/// A no-op reasoner that always returns errors.
pub struct DisabledReasoner;

#[async_trait]
impl Reasoner for DisabledReasoner {
    async fn ask(&self, _messages: &[ChatMessage]) -> Result<String> {
        bail!("Reasoning provider is disabled. Set [reasoning] provider in config.")
    }

    async fn ask_with_image(&self, _prompt: &str, _image: &[u8]) -> Result<String> {
        bail!("Reasoning provider is disabled. Set [reasoning] provider in config.")
    }
}

/// Reasoner backed by an OpenAI-compatible `POST /chat/completions` endpoint.
pub struct OpenAiReasoner {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiReasoner {
    pub fn new(config: &ReasoningConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("reasoning.model required for OpenAI provider"))?;
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", config.api_key_env))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }

    async fn complete(&self, body: serde_json::Value) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Reasoning API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        extract_reply(&json)
    }
}

#[async_trait]
impl Reasoner for OpenAiReasoner {
    async fn ask(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });
        self.complete(body).await
    }

    async fn ask_with_image(&self, prompt: &str, image: &[u8]) -> Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:image/png;base64,{}", encoded) }
                    }
                ]
            }],
        });
        self.complete(body).await
    }
}

/// Extract `choices[0].message.content` from a chat-completions response.
fn extract_reply(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|content| content.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid reasoning response: missing choices[0].message.content"))
}
