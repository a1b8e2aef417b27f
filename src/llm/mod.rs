//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Every provider takes the same [`ChatRequest`] and returns plain text or a
//! [`ProviderError`] naming what went wrong. Nothing is retried here; the
//! caller decides what a failure means.

pub mod providers;

use std::{fmt, time::Duration};

use reqwest::Client;
use thiserror::Error;
use tracing::warn;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connection, TLS, timeout, or client construction failure.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    /// The body was not the JSON shape the provider documents.
    #[error("failed to parse response body: {0}")]
    Parse(String),
    /// Well-formed response without any usable text.
    #[error("empty or missing content in response")]
    EmptyResponse,
}

// ── Provider identity ─────────────────────────────────────────────────────────

/// The backends this crate can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
}

impl ProviderKind {
    /// Resolution order under an `auto` preference.
    pub const PRIORITY: [ProviderKind; 2] = [ProviderKind::Gemini, ProviderKind::OpenAi];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Request ───────────────────────────────────────────────────────────────────

/// One chat round-trip: a system instruction, the user's text, and an
/// optional PNG that belongs to the user turn.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub system: String,
    pub user_text: String,
    pub image_png: Option<Vec<u8>>,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>, user_text: impl Into<String>) -> Self {
        Self { system: system.into(), user_text: user_text.into(), image_png: None }
    }

    pub fn with_image(mut self, image_png: Option<Vec<u8>>) -> Self {
        self.image_png = image_png.filter(|bytes| !bytes.is_empty());
        self
    }
}

// ── Transport capability ──────────────────────────────────────────────────────

/// Whether outbound HTTP is possible at all.
///
/// Decided once, when the coach is built, and passed in. `Offline` means no
/// provider call is ever attempted.
#[derive(Debug, Clone)]
pub enum Transport {
    /// Shared client; `reqwest::Client` is an `Arc` internally.
    Http(Client),
    Offline,
}

impl Transport {
    /// Build an HTTP client with a fixed per-request timeout. A client that
    /// cannot be constructed (e.g. no TLS backend) leaves the coach offline.
    pub fn connect(timeout_seconds: u64) -> Self {
        match Client::builder().timeout(Duration::from_secs(timeout_seconds)).build() {
            Ok(client) => Transport::Http(client),
            Err(e) => {
                warn!(error = %e, "HTTP client unavailable — running offline");
                Transport::Offline
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Transport::Http(_))
    }
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
/// Adding a backend = new module + new variant + new `complete` arm.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    OpenAi(providers::openai::OpenAiProvider),
    Gemini(providers::gemini::GeminiProvider),
}

impl LlmProvider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            LlmProvider::OpenAi(_) => ProviderKind::OpenAi,
            LlmProvider::Gemini(_) => ProviderKind::Gemini,
        }
    }

    /// Send `request` to the provider and return its text reply.
    pub async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        match self {
            LlmProvider::OpenAi(p) => p.complete(request).await,
            LlmProvider::Gemini(p) => p.complete(request).await,
        }
    }
}
