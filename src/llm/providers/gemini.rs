//! Google Gemini `generateContent` provider.
//!
//! Gemini takes no separate system turn here: the system instruction is
//! prepended to the user text, and the optional screenshot rides along as an
//! `inline_data` part of the same content entry. The API key travels as the
//! `key` query parameter, so transport errors are stripped of their URL
//! before they are logged or returned.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use super::check_status;
use crate::llm::{ChatRequest, ProviderError};

const IMAGE_MIME_TYPE: &str = "image/png";

#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    api_key: String,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl GeminiProvider {
    /// `api_base_url` is the models collection URL; the request goes to
    /// `{api_base_url}/{model}:generateContent`.
    pub fn new(client: Client, api_base_url: String, model: String, temperature: f32, api_key: String) -> Self {
        Self { client, api_base_url, model, temperature, api_key }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.api_base_url.trim_end_matches('/'), self.model)
    }

    pub async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let mut parts = vec![Part::Text { text: format!("{}\n\n{}", request.system, request.user_text) }];
        if let Some(png) = &request.image_png {
            parts.push(Part::InlineData {
                inline_data: InlineData { mime_type: IMAGE_MIME_TYPE, data: BASE64_STANDARD.encode(png) },
            });
        }

        let payload = GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig { temperature: self.temperature },
        };

        let endpoint = self.endpoint();
        debug!(
            model = %self.model,
            temperature = self.temperature,
            content_len = request.user_text.len(),
            has_image = request.image_png.is_some(),
            "sending Gemini request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full Gemini request payload");
        }

        let response = self
            .client
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!(url = %endpoint, error = %e, "Gemini HTTP request failed (transport)");
                ProviderError::Transport(e.to_string())
            })?;

        let response = check_status(response).await?;

        let parsed = response.json::<GenerateContentResponse>().await.map_err(|e| {
            let e = e.without_url();
            error!(error = %e, "failed to deserialize Gemini response");
            ProviderError::Parse(e.to_string())
        })?;

        debug!(candidates = parsed.candidates.len(), "received Gemini response");
        extract_text(parsed)
    }
}

/// Concatenate every text part of the first candidate, in order.
fn extract_text(parsed: GenerateContentResponse) -> Result<String, ProviderError> {
    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(text)
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
struct PartResponse {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    const KEY: &str = "AIzaSy-test-key-0123456789";
    const PATH: &str = "/v1beta/models/gemini-3-flash-preview:generateContent";

    fn provider(server: &MockServer) -> GeminiProvider {
        GeminiProvider::new(
            Client::new(),
            server.url("/v1beta/models"),
            "gemini-3-flash-preview".into(),
            0.4,
            KEY.into(),
        )
    }

    #[tokio::test]
    async fn key_in_query_and_system_prepended() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path(PATH).query_param("key", KEY).json_body(json!({
                    "contents": [{"parts": [{"text": "You are a coach.\n\nHow do I shell?"}]}],
                    "generationConfig": {"temperature": 0.4}
                }));
                then.status(200).json_body(json!({
                    "candidates": [{"content": {"role": "model", "parts": [{"text": "Use Shell."}]}}]
                }));
            })
            .await;

        let text = provider(&server)
            .complete(&ChatRequest::new("You are a coach.", "How do I shell?"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(text, "Use Shell.");
    }

    #[tokio::test]
    async fn image_is_inline_data_after_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path(PATH).json_body(json!({
                    "contents": [{"parts": [
                        {"text": "s\n\nu"},
                        {"inline_data": {"mime_type": "image/png", "data": "iVBORw=="}}
                    ]}],
                    "generationConfig": {"temperature": 0.4}
                }));
                then.status(200).json_body(json!({"candidates": [{"content": {"parts": [{"text": "ok"}]}}]}));
            })
            .await;

        let request = ChatRequest::new("s", "u").with_image(Some(vec![0x89, b'P', b'N', b'G']));
        assert_eq!(provider(&server).complete(&request).await.unwrap(), "ok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn text_parts_are_concatenated_in_order() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(200).json_body(json!({
                    "candidates": [{"content": {"parts": [
                        {"text": "1. Select the edge.\n"},
                        {"thought": true},
                        {"text": "2. Press F."}
                    ]}}]
                }));
            })
            .await;

        let text = provider(&server).complete(&ChatRequest::new("s", "u")).await.unwrap();
        assert_eq!(text, "1. Select the edge.\n2. Press F.");
    }

    #[tokio::test]
    async fn empty_candidates_is_empty_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(200).json_body(json!({"candidates": []}));
            })
            .await;

        let err = provider(&server).complete(&ChatRequest::new("s", "u")).await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));
    }

    #[tokio::test]
    async fn candidate_without_content_is_empty_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(200).json_body(json!({"candidates": [{"finishReason": "SAFETY"}]}));
            })
            .await;

        let err = provider(&server).complete(&ChatRequest::new("s", "u")).await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));
    }

    #[tokio::test]
    async fn whitespace_only_text_is_empty_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(200).json_body(json!({"candidates": [{"content": {"parts": [{"text": " "}, {"text": "\n"}]}}]}));
            })
            .await;

        let err = provider(&server).complete(&ChatRequest::new("s", "u")).await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));
    }

    #[tokio::test]
    async fn http_error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(400).json_body(json!({
                    "error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}
                }));
            })
            .await;

        let err = provider(&server).complete(&ChatRequest::new("s", "u")).await.unwrap_err();
        match err {
            ProviderError::Status { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("API key not valid"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_parse_error_without_key() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(200).body("<html>not json</html>");
            })
            .await;

        let err = provider(&server).complete(&ChatRequest::new("s", "u")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
        assert!(!err.to_string().contains(KEY));
    }

    #[tokio::test]
    async fn transport_error_never_leaks_key() {
        // Nothing listens on port 9 of localhost in the test environment.
        let client = Client::builder().timeout(std::time::Duration::from_secs(2)).build().unwrap();
        let p = GeminiProvider::new(
            client,
            "http://127.0.0.1:9/v1beta/models".into(),
            "m".into(),
            0.4,
            KEY.into(),
        );
        let err = p.complete(&ChatRequest::new("s", "u")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
        assert!(!err.to_string().contains(KEY));
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let p = GeminiProvider::new(Client::new(), "http://h/models/".into(), "g".into(), 0.4, KEY.into());
        assert_eq!(p.endpoint(), "http://h/models/g:generateContent");
    }
}
