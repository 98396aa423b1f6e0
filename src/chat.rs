//! Chat completion client
//!
//! The conversational fallback sends the whole transcript to an
//! OpenAI-compatible `/chat/completions` endpoint and expects a plain
//! string back.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::assistant::Turn;
use crate::{Error, Result};

/// Produces a reply for a conversation
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Complete the conversation `turns` with `model`
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the reply is not plain text
    async fn complete(&self, model: &str, turns: &[Turn]) -> Result<String>;
}

/// Client for an OpenAI-compatible chat completion API
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    /// HTTP client
    client: Client,
    /// Base URL, e.g. <https://api.openai.com/v1>
    base_url: String,
    /// Optional API key for authentication
    api_key: Option<String>,
}

impl OpenAiChat {
    /// Create a new chat client
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Build the authorization header value
    fn auth_header(&self) -> Option<String> {
        self.api_key.as_ref().map(|key| format!("Bearer {key}"))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
}

#[async_trait]
impl ChatClient for OpenAiChat {
    async fn complete(&self, model: &str, turns: &[Turn]) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(model, turns = turns.len(), "requesting chat completion");

        let mut req = self.client.post(&url).json(&ChatRequest {
            model,
            messages: turns,
        });

        if let Some(auth) = self.auth_header() {
            req = req.header("Authorization", auth);
        }

        let response = req.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Chat(format!("chat API error: {status} - {body}")));
        }

        let body = response.text().await?;
        extract_reply(&body)
    }
}

/// Pull the text of the first choice out of a response body
///
/// Anything but `choices[0].message.content` as a string is an unexpected reply.
fn extract_reply(body: &str) -> Result<String> {
    let body: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| Error::UnexpectedReply(format!("body is not JSON: {e}")))?;

    match body.pointer("/choices/0/message/content") {
        Some(serde_json::Value::String(text)) => Ok(text.clone()),
        Some(other) => Err(Error::UnexpectedReply(format!("content is {other}"))),
        None => Err(Error::UnexpectedReply(
            "no choices[0].message.content".to_string(),
        )),
    }
}
