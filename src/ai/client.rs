//! LLM (`OpenAI`) API client module
//!
//! Encapsulates the chat-completions call used to summarize one channel.

use std::time::Duration;

use async_trait::async_trait;
use openai_api_rs::v1::chat_completion::{ChatCompletionMessage, Content, MessageRole};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, error, info};

use super::prompt_builder::{MAX_SUMMARY_TOKENS, SUMMARY_TEMPERATURE, build_prompt};
use crate::core::platform::Summarizer;
use crate::errors::BotError;

const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4 + 1
}

/// LLM API client for generating summaries
pub struct LlmClient {
    api_key: String,
    org_id: Option<String>,
    model_name: String,
    endpoint: String,
    http: Client,
}

impl LlmClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        api_key: String,
        org_id: Option<String>,
        model_name: String,
    ) -> Result<Self, BotError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BotError::HttpError(format!("Failed to build OpenAI HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            org_id,
            model_name,
            endpoint: OPENAI_CHAT_COMPLETIONS_URL.to_string(),
            http,
        })
    }

    /// Point the client at a compatible endpoint instead of api.openai.com.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Build the JSON body for a chat-completions request.
    #[must_use]
    pub fn build_request_body(&self, prompt: &[ChatCompletionMessage]) -> Value {
        json!({
            "model": self.model_name,
            "messages": build_chat_messages(prompt),
            "max_tokens": MAX_SUMMARY_TOKENS,
            "temperature": SUMMARY_TEMPERATURE,
        })
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP request to `OpenAI` fails or the response
    /// cannot be parsed into the expected shape.
    pub async fn generate_summary(
        &self,
        prompt: &[ChatCompletionMessage],
    ) -> Result<String, BotError> {
        #[cfg(feature = "debug-logs")]
        info!("Using ChatGPT prompt:\n{:?}", prompt);

        let estimated_input_tokens = prompt
            .iter()
            .map(|msg| estimate_tokens(&format!("{:?}", msg.content)))
            .sum::<usize>();
        info!(
            model = %self.model_name,
            "Generating summary, estimated input tokens: {}", estimated_input_tokens
        );

        let mut request = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.build_request_body(prompt));

        if let Some(org) = &self.org_id {
            request = request.header("OpenAI-Organization", org);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BotError::HttpError(format!("OpenAI API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|e| {
                format!("Failed to read error response body (status {status}): {e}")
            });
            return Err(BotError::OpenAIError(format!(
                "OpenAI API error (status {status}): {error_text}"
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| BotError::OpenAIError(format!("Failed to parse OpenAI response: {e}")))?;

        extract_completion_text(&response_json)
    }
}

#[async_trait]
impl Summarizer for LlmClient {
    async fn summarize(&self, transcript: &str, context_label: &str) -> Result<String, BotError> {
        let prompt = build_prompt(transcript, context_label);
        match self.generate_summary(&prompt).await {
            Ok(summary) => {
                debug!(channel = %context_label, "Summary generated");
                Ok(summary)
            }
            Err(e) => {
                error!(channel = %context_label, "Error generating summary with OpenAI: {}", e);
                Err(e)
            }
        }
    }
}

/// Convert a chat prompt into the `messages` array of a chat-completions request.
/// Image parts are not used by this bot and are dropped.
pub(crate) fn build_chat_messages(prompt: &[ChatCompletionMessage]) -> Vec<Value> {
    prompt
        .iter()
        .filter_map(|m| {
            let role = match m.role {
                MessageRole::system => "system",
                MessageRole::user | MessageRole::function | MessageRole::tool => "user",
                MessageRole::assistant => "assistant",
            };
            match &m.content {
                Content::Text(t) => Some(json!({ "role": role, "content": t })),
                Content::ImageUrl(_) => None,
            }
        })
        .collect()
}

/// Pull the first choice's trimmed text out of a chat-completions response.
///
/// # Errors
///
/// Returns an error when no choice carries non-empty text.
pub fn extract_completion_text(response: &Value) -> Result<String, BotError> {
    response
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| BotError::OpenAIError("No text in response".to_string()))
}
