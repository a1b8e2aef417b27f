//! OpenAI chat completion provider (`/v1/chat/completions`).
//!
//! All OpenAI wire types are private to this module — callers only see
//! [`ChatRequest`] and the extracted text. When the request carries an image
//! the user message switches from a plain string to a two-part content array
//! (text + `data:` URI).

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use super::check_status;
use crate::llm::{ChatRequest, ProviderError};

// ── Public provider ───────────────────────────────────────────────────────────

/// Adapter for an HTTP endpoint implementing `/v1/chat/completions` with
/// bearer-token auth.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    api_key: String,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    /// `client` carries the request timeout; `api_key` is sent as
    /// `Authorization: Bearer <key>`.
    pub fn new(client: Client, api_base_url: String, model: String, temperature: f32, api_key: String) -> Self {
        Self { client, api_base_url, model, temperature, api_key }
    }

    /// One round-trip: system message, then the user message with the
    /// optional image attached.
    pub async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let payload = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message { role: "system", content: MessageContent::Text(request.system.clone()) },
                Message { role: "user", content: user_content(request) },
            ],
            temperature: self.temperature,
        };

        debug!(
            model = %payload.model,
            temperature = payload.temperature,
            content_len = request.user_text.len(),
            has_image = request.image_png.is_some(),
            "sending OpenAI request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full OpenAI request payload");
        }

        let response = self
            .client
            .post(&self.api_base_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.api_base_url, error = %e, "OpenAI HTTP request failed (transport)");
                ProviderError::Transport(e.to_string())
            })?;

        let response = check_status(response).await?;

        let parsed = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize OpenAI response");
            ProviderError::Parse(e.to_string())
        })?;

        debug!(choices = parsed.choices.len(), "received OpenAI response");
        extract_text(parsed)
    }
}

fn user_content(request: &ChatRequest) -> MessageContent {
    match &request.image_png {
        None => MessageContent::Text(request.user_text.clone()),
        Some(png) => MessageContent::Parts(vec![
            ContentPart::Text { text: request.user_text.clone() },
            ContentPart::ImageUrl {
                image_url: ImageUrl { url: format!("data:image/png;base64,{}", BASE64_STANDARD.encode(png)) },
            },
        ]),
    }
}

fn extract_text(parsed: ChatCompletionResponse) -> Result<String, ProviderError> {
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|s| !s.trim().is_empty())
        .ok_or(ProviderError::EmptyResponse)
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
