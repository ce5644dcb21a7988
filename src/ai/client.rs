//! HTTP client for an OpenAI-compatible chat-completion endpoint
//! (LM Studio and friends).

use crate::config::DEFAULT_AUTH;
use crate::error::AutofileError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Client for one classification endpoint. Requests are sent one at a time
/// with a bounded timeout; a timeout is an ordinary per-call error.
pub struct ChatClient {
    client: reqwest::Client,
    url: String,
    model: String,
    auth: String,
}

impl ChatClient {
    pub fn new(api_base: &str, model: &str) -> Result<Self, AutofileError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            model: model.to_string(),
            auth: std::env::var("LMSTUDIO_AUTH").unwrap_or_else(|_| DEFAULT_AUTH.to_string()),
        })
    }

    /// Send a two-message conversation and return the assistant's reply
    /// content.
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, AutofileError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            temperature: 0.2,
            max_tokens: 1024,
            stream: false,
        };

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("Authorization", &self.auth)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AutofileError::Other("empty choices in chat response".to_string()))?;

        Ok(content)
    }
}
