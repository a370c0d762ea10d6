//! OpenAI-compatible chat completion client (Groq by default).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use hatchup_core::completion::{CompletionOptions, CompletionService, PromptMessage};
use hatchup_core::{HatchupError, Result};
use hatchup_infrastructure::config::CompletionConfig;

/// Completion service speaking the `/chat/completions` wire format.
#[derive(Clone)]
pub struct OpenAiCompatibleCompletion {
    client: Client,
    config: CompletionConfig,
}

impl OpenAiCompatibleCompletion {
    pub fn new(config: CompletionConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl CompletionService for OpenAiCompatibleCompletion {
    async fn complete(
        &self,
        messages: &[PromptMessage],
        options: CompletionOptions,
    ) -> Result<String> {
        let api_key = self.config.require_api_key()?;
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: options.temperature,
        };

        tracing::debug!(
            "[Completion] POST {} model={} messages={}",
            self.config.api_url,
            self.config.model,
            messages.len()
        );

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| HatchupError::completion(format!("request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unreadable error body".to_string());
            return Err(map_http_error(status, &body_text));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| HatchupError::completion(format!("malformed response: {err}")))?;

        extract_text_response(parsed)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| HatchupError::completion("response contained no content"))
}

fn map_http_error(status: StatusCode, body: &str) -> HatchupError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.to_string());
    tracing::warn!("[Completion] HTTP {}: {}", status.as_u16(), message);
    HatchupError::completion(format!("HTTP {}: {}", status.as_u16(), message))
}
