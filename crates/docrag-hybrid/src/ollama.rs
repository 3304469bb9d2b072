use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use docrag_core::config::LlmSettings;
use docrag_core::{Error, Result};

use crate::answer::TextCompletion;

const ERROR_BODY_LIMIT: usize = 2_000;

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<ChatMessage>,
    options: ChatOptions,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
}

/// Non-streaming client for Ollama's `/api/chat`.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        // the server is local; never route it through a proxy
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_s))
            .no_proxy()
            .build()
            .map_err(|e| Error::Configuration(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: 0.0,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

#[async_trait]
impl TextCompletion for OllamaClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            stream: false,
            messages: vec![
                ChatMessage { role: "system".into(), content: system.to_string() },
                ChatMessage { role: "user".into(), content: prompt.to_string() },
            ],
            options: ChatOptions { temperature: self.temperature },
        };
        debug!(model = %self.model, prompt_chars = prompt.len(), "ollama chat request");

        let resp = self
            .http
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::upstream("ollama", e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let text: String = text.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(Error::upstream("ollama", format!("HTTP {status}: {text}")));
        }

        let parsed: ChatResponse =
            resp.json().await.map_err(|e| Error::MalformedResponse(format!("ollama chat response: {e}")))?;
        parsed
            .message
            .map(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Error::MalformedResponse("ollama chat response has no message content".into()))
    }
}
