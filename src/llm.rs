use std::time::Duration;

use serde_json::{json, Value};

use crate::config::LlmConfig;
use crate::error::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub user: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Capability boundary to the generation service: one prompt in, one text
/// completion out. The selector and generator only see this trait, so tests
/// substitute a deterministic fake.
pub trait CompletionClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Client for OpenAI-compatible chat completion endpoints (OpenAI, Azure,
/// DeepSeek, local servers).
pub struct OpenAiClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Config("OPENAI_API_KEY is not set".into()));
        }

        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// One tiny completion to verify the endpoint and key work.
    pub fn check(&self) -> Result<()> {
        let reply = self.complete(&CompletionRequest {
            system: None,
            user: "Reply with the single word: ok".into(),
            temperature: 0.0,
            max_tokens: 10,
        })?;

        if reply.trim().is_empty() {
            return Err(Error::Service("empty completion from service".into()));
        }
        Ok(())
    }
}

impl CompletionClient for OpenAiClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": request.user}));

        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(Error::Service(format!(
                "completion request failed with {}: {}",
                status,
                detail.chars().take(200).collect::<String>()
            )));
        }

        let payload: Value = response.json()?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| Error::Service("malformed completion response".into()))
    }
}
