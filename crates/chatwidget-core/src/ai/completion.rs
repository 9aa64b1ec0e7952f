use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::Completer;
use crate::error::{ChatError, Result};
use crate::state::ChatTurn;

pub const MODEL: &str = "gpt-3.5-turbo";
pub const MAX_TOKENS: u32 = 150;
pub const TEMPERATURE: f64 = 0.7;

/// Reply used when the endpoint answers with parseable JSON that has no
/// usable `choices[0].message.content`.
pub const FALLBACK_REPLY: &str = "Sorry, I could not generate a response.";

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'static str,
    messages: &'a [ChatTurn],
    max_tokens: u32,
    temperature: f64,
}

/// Chat-completions client for one endpoint and key.
///
/// Model, token cap and temperature are fixed; callers only choose the
/// transcript.
#[derive(Clone)]
pub struct CompletionClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl CompletionClient {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn with_timeout(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn complete(&self, transcript: &[ChatTurn]) -> Result<String> {
        let request = CompletionRequest {
            model: MODEL,
            messages: transcript,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            turns = transcript.len(),
            "sending completion request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        extract_reply(&body)
    }
}

#[async_trait]
impl Completer for CompletionClient {
    async fn complete(&self, transcript: &[ChatTurn]) -> Result<String> {
        CompletionClient::complete(self, transcript).await
    }
}

/// Pull `choices[0].message.content` out of a response body.
///
/// Invalid JSON, or a body with no `choices` (absent or null), is an error.
/// An empty `choices`, or anything missing below it, falls back to
/// [`FALLBACK_REPLY`].
pub fn extract_reply(body: &str) -> Result<String> {
    let value: Value = serde_json::from_str(body)
        .map_err(|err| ChatError::MalformedResponse(format!("invalid JSON: {}", err)))?;

    if value.get("choices").map_or(true, Value::is_null) {
        return Err(ChatError::MalformedResponse(
            "response has no choices".to_string(),
        ));
    }

    let reply = value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .filter(|content| !content.is_empty())
        .map(str::to_string);

    match reply {
        Some(reply) => Ok(reply),
        None => {
            tracing::debug!("completion response had no content, using fallback reply");
            Ok(FALLBACK_REPLY.to_string())
        }
    }
}
