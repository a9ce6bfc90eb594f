use ragpipe_core::{ChatMessage, Error, Result};
use serde::{Deserialize, Serialize};

use crate::{env_nonempty, env_or};

fn chat_base_url_from_env() -> String {
    env_nonempty("RAGPIPE_CHAT_BASE_URL").unwrap_or_else(|| "https://api.openai.com".to_string())
}

fn chat_api_key_from_env() -> Option<String> {
    env_or("RAGPIPE_CHAT_API_KEY", "OPENAI_API_KEY")
}

fn chat_model_from_env() -> String {
    env_nonempty("RAGPIPE_CHAT_MODEL").unwrap_or_else(|| "gpt-4-turbo-preview".to_string())
}

fn chat_temperature_from_env() -> f64 {
    env_nonempty("RAGPIPE_CHAT_TEMPERATURE")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.7)
}

/// OpenAI-compatible `/v1/chat/completions` client used for answer
/// synthesis over retrieved passages.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
}

impl ChatClient {
    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let api_key = chat_api_key_from_env().ok_or_else(|| {
            Error::NotConfigured("missing RAGPIPE_CHAT_API_KEY (or OPENAI_API_KEY)".to_string())
        })?;
        Ok(Self {
            client,
            base_url: chat_base_url_from_env(),
            api_key,
            model: chat_model_from_env(),
            temperature: chat_temperature_from_env(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint_chat_completions(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// One completion over the given turns; returns the first choice's text.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let req = ChatCompletionsRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            temperature: Some(self.temperature),
            stream: Some(false),
        };

        let resp = self
            .client
            .post(self.endpoint_chat_completions())
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Llm(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Llm(format!("chat.completions HTTP {status}")));
        }

        let parsed: ChatCompletionsResponse =
            resp.json().await.map_err(|e| Error::Llm(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Llm("chat.completions returned no choices".to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    content: String,
}
