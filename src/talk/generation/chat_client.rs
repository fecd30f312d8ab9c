//! OpenAI chat-completions client with strict `json_schema` output.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::talk::core::config::TalkConfig;
use crate::talk::core::errors::{TalkError, TalkResult};
use crate::talk::generation::backend::CompletionBackend;
use crate::talk::generation::message::ChatMessage;
use crate::talk::schema::OutputSchema;

/// Connection timeout for the completion backend.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest error body excerpt kept in error messages.
const ERROR_BODY_CHARS: usize = 300;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    temperature: f64,
    max_tokens: u32,
    messages: &'a [ChatMessage],
    response_format: serde_json::Value,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Chat-completions client for OpenAI-compatible endpoints.
#[derive(Clone, Debug)]
pub struct OpenAiChatClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    timeout: Duration,
}

impl OpenAiChatClient {
    /// Create a client from the service configuration.
    ///
    /// # Errors
    /// Returns [`TalkError::Configuration`] if no API key is configured, or an
    /// HTTP error if the client cannot be built.
    pub fn from_config(config: &TalkConfig) -> TalkResult<Self> {
        let api_key = config
            .openai_api_key
            .clone()
            .ok_or_else(|| TalkError::Configuration("OPENAI_API_KEY is not set".to_string()))?;
        let timeout = config.llm.timeout();
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
            timeout,
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiChatClient {
    async fn complete(&self, messages: &[ChatMessage], schema: &OutputSchema) -> TalkResult<String> {
        let request = CompletionRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages,
            response_format: schema.response_format(),
        };

        debug!(
            "Calling {} with {} messages ({} chars)",
            self.model,
            messages.len(),
            messages.iter().map(ChatMessage::char_len).sum::<usize>()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(ERROR_BODY_CHARS).collect();
            return Err(TalkError::Generation(format!(
                "completion endpoint returned {status}: {excerpt}"
            )));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| TalkError::Generation(format!("unreadable completion body: {e}")))?;

        let Some(choice) = body.choices.into_iter().next() else {
            return Err(TalkError::EmptyCompletion);
        };

        if let Some(refusal) = choice.message.refusal.filter(|r| !r.trim().is_empty()) {
            debug!("Completion refused: {refusal}");
            return Err(TalkError::EmptyCompletion);
        }

        match choice.message.content {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(TalkError::EmptyCompletion),
        }
    }
}

impl OpenAiChatClient {
    fn transport_error(&self, err: &reqwest::Error) -> TalkError {
        if err.is_timeout() {
            TalkError::Generation(format!(
                "completion request timed out after {}s",
                self.timeout.as_secs()
            ))
        } else {
            TalkError::Generation(format!("completion request failed: {err}"))
        }
    }
}
