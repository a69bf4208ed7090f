//! Provider abstraction over vendor HTTP APIs: the executor never
//! constructs a request body itself, it hands a goal+prompt to
//! `LlmProvider::chat` and gets text back.

use async_trait::async_trait;

use crate::errors::LlmError;
use crate::model::{ChatMessage, ChatRequest, ChatResponse, ResponseFormat, Role};

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Sends a system+user turn and returns the raw assistant content.
    /// Implementations should request JSON-object mode where the vendor
    /// supports it, but callers must still tolerate prose (spec §6, §9
    /// "LLM JSON robustness").
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError>;
}

#[derive(Clone, Debug)]
pub struct OpenAiCompatibleConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: std::time::Duration,
}

impl OpenAiCompatibleConfig {
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| LlmError::MissingApiKey)?;
        Ok(Self {
            api_key,
            model: std::env::var("WEB_AGENT_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            api_base: std::env::var("WEB_AGENT_LLM_API_BASE").unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            temperature: 0.2,
            max_tokens: 1024,
            timeout: std::time::Duration::from_secs(30),
        })
    }
}

/// OpenAI chat-completions-compatible HTTP provider. Works against any
/// vendor exposing the same wire shape (spec §6).
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    config: OpenAiCompatibleConfig,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'));
        let body = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage { role: Role::System, content: system_prompt.to_string() }, ChatMessage::user(user_prompt)],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            response_format: Some(ResponseFormat { kind: "json_object".to_string() }),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::BadStatus { status: status.as_u16(), body: text });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed.first_content().map(str::to_string).ok_or(LlmError::EmptyResponse)
    }
}

/// Deterministic provider for tests and offline development: replays a
/// fixed queue of canned replies instead of calling out over HTTP.
pub struct ScriptedProvider {
    replies: std::sync::Mutex<std::collections::VecDeque<String>>,
}

impl ScriptedProvider {
    pub fn new(replies: impl IntoIterator<Item = String>) -> Self {
        Self { replies: std::sync::Mutex::new(replies.into_iter().collect()) }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String, LlmError> {
        let mut queue = self.replies.lock().unwrap();
        Ok(queue.pop_front().unwrap_or_else(|| {
            r#"{"commands": [], "confidence": 0.0, "rationale": "no scripted reply left", "breadcrumb": ""}"#.to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_provider_replays_in_order() {
        let provider = ScriptedProvider::new(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(provider.chat("s", "u").await.unwrap(), "first");
        assert_eq!(provider.chat("s", "u").await.unwrap(), "second");
    }

    #[tokio::test]
    async fn scripted_provider_falls_back_to_noop_json_when_exhausted() {
        let provider = ScriptedProvider::new(Vec::<String>::new());
        let reply = provider.chat("s", "u").await.unwrap();
        assert!(reply.contains("\"commands\": []"));
    }
}
