// Chat module
// Grounded prompt construction and the OpenAI-compatible Ollama chat call

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::ShelfError;
use crate::config::OllamaConfig;

const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// One turn in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Rewrite a user query into a prompt carrying retrieved context.
///
/// Facts become a bulleted list ahead of the query; with no facts the
/// model sees an empty list and answers ungrounded.
#[inline]
pub fn build_grounded_prompt(query: &str, facts: &[String]) -> String {
    let fact_lines = facts
        .iter()
        .map(|f| format!("- {}", f.trim()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Here are some known facts:\n{}\n\nUser query: {}",
        fact_lines, query
    )
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat client for Ollama's OpenAI-compatible completion endpoint.
#[derive(Debug, Clone)]
pub struct OllamaChat {
    base_url: Url,
    model: String,
    agent: ureq::Agent,
}

impl OllamaChat {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .url()
            .context("Failed to generate Ollama URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.chat_model.clone(),
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    /// Send a conversation with the final user turn grounded in `facts`.
    ///
    /// The last message must be the user's query; it is replaced by the
    /// grounded prompt so earlier turns keep their original wording.
    #[inline]
    pub fn send(&self, mut messages: Vec<ChatMessage>, facts: &[String]) -> Result<String> {
        let query = messages
            .pop()
            .ok_or_else(|| ShelfError::Chat("Conversation has no messages".to_string()))?;

        messages.push(ChatMessage::user(build_grounded_prompt(
            &query.content,
            facts,
        )));

        self.complete(&messages)
    }

    /// Raw completion over the messages as given.
    #[inline]
    pub fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = self
            .base_url
            .join("/v1/chat/completions")
            .context("Failed to build chat URL")?;

        let request = CompletionRequest {
            model: &self.model,
            stream: false,
            messages,
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize chat request")?;

        debug!("Sending {} messages to {}", messages.len(), url);

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| ShelfError::Chat(format!("Chat request failed: {}", e)))?;

        let response: CompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| ShelfError::Chat(format!("Malformed chat response: {}", e)))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(ShelfError::Chat("Model returned an empty answer".to_string()).into());
        }

        Ok(content)
    }
}
