//! LLM provider implementations.
//!
//! `build(kind, settings, api_key, client)` is the factory — called once per
//! question, after the credential is resolved.
//! Adding a new backend = new module + new match arm.

pub mod gemini;
pub mod openai;

use reqwest::Client;
use serde::Deserialize;
use tracing::error;

use crate::config::LlmSettings;
use crate::llm::{LlmProvider, ProviderError, ProviderKind};

/// Construct the `LlmProvider` for `kind`, sharing `client`.
pub fn build(kind: ProviderKind, settings: &LlmSettings, api_key: String, client: Client) -> LlmProvider {
    match kind {
        ProviderKind::OpenAi => LlmProvider::OpenAi(openai::OpenAiProvider::new(
            client,
            settings.openai.api_base_url.clone(),
            settings.openai.model.clone(),
            settings.temperature,
            api_key,
        )),
        ProviderKind::Gemini => LlmProvider::Gemini(gemini::GeminiProvider::new(
            client,
            settings.gemini.api_base_url.clone(),
            settings.gemini.model.clone(),
            settings.temperature,
            api_key,
        )),
    }
}

// Error envelope shared by OpenAI (`{error:{message,code}}`) and Gemini
// (`{error:{code,message,status}}`).
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    status: Option<String>,
}

/// Consume the response and return it if successful, or a structured error.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = describe_error_body(&body);
    error!(%status, %message, "LLM request returned HTTP error");
    Err(ProviderError::Status { status: status.as_u16(), message })
}

fn describe_error_body(body: &str) -> String {
    let Ok(env) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return body.to_string();
    };
    let code = env
        .error
        .code
        .map(|v| match v {
            serde_json::Value::String(s) => format!("[code={s}] "),
            other => format!("[code={other}] "),
        })
        .unwrap_or_default();
    let status = env.error.status.map(|s| format!("{s}: ")).unwrap_or_default();
    let message = env.error.message.unwrap_or_else(|| body.to_string());
    format!("{code}{status}{message}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_picks_variant_by_kind() {
        let settings = LlmSettings::default();
        let p = build(ProviderKind::Gemini, &settings, "k".into(), Client::new());
        assert_eq!(p.kind(), ProviderKind::Gemini);
        let p = build(ProviderKind::OpenAi, &settings, "k".into(), Client::new());
        assert_eq!(p.kind(), ProviderKind::OpenAi);
    }

    #[test]
    fn openai_envelope_is_described() {
        let body = r#"{"error":{"message":"Incorrect API key provided","code":"invalid_api_key"}}"#;
        assert_eq!(describe_error_body(body), "[code=invalid_api_key] Incorrect API key provided");
    }

    #[test]
    fn gemini_envelope_is_described() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(describe_error_body(body), "[code=400] INVALID_ARGUMENT: API key not valid");
    }

    #[test]
    fn unknown_body_is_kept_raw() {
        assert_eq!(describe_error_body("Bad Gateway"), "Bad Gateway");
    }
}
