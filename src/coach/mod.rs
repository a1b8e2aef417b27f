//! Response orchestration — one question in, one usable answer out.
//!
//! [`Coach::answer`] tries the provider path and falls back to the templated
//! answer on any failure. [`Coach::try_llm`] is the provider path on its
//! own, with the reason it gave up spelled out in [`CoachError`].
//!
//! The coach holds no per-question state: the credential, the context
//! payload and the provider are rebuilt for every call.

pub mod fallback;
pub mod prompt;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::LlmSettings;
use crate::context::{Screenshot, SessionContext, normalize};
use crate::credentials::{self, EnvSource, ResolveError};
use crate::llm::{ChatRequest, ProviderError, ProviderKind, Transport, providers};
use crate::store::ConfigStore;

/// Why the provider path produced no answer.
#[derive(Debug, Error)]
pub enum CoachError {
    #[error("no HTTP transport available")]
    NoTransport,
    #[error(transparent)]
    NoCredential(#[from] ResolveError),
    #[error("{provider} call failed: {source}")]
    Provider {
        provider: ProviderKind,
        #[source]
        source: ProviderError,
    },
}

pub struct Coach {
    transport: Transport,
    settings: LlmSettings,
    store: ConfigStore,
    env: EnvSource,
}

impl Coach {
    /// `transport` decides once whether HTTP is possible at all.
    pub fn new(transport: Transport, settings: LlmSettings, store: ConfigStore) -> Self {
        Self { transport, settings, store, env: EnvSource::Process }
    }

    /// Replace the environment the credential lookup reads from.
    pub fn with_env(mut self, env: EnvSource) -> Self {
        self.env = env;
        self
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Always returns a non-empty answer: the provider's text when the call
    /// succeeds, the templated answer otherwise.
    pub async fn answer(&self, question: &str, ctx: &SessionContext) -> String {
        match self.try_llm(question, ctx).await {
            Ok(text) => text,
            Err(reason) => {
                match &reason {
                    CoachError::Provider { .. } => warn!(%reason, "falling back to templated answer"),
                    _ => info!(%reason, "falling back to templated answer"),
                }
                fallback::structured_answer(question, ctx)
            }
        }
    }

    /// Provider path only: transport check, credential, request, one call.
    pub async fn try_llm(&self, question: &str, ctx: &SessionContext) -> Result<String, CoachError> {
        let Transport::Http(client) = &self.transport else {
            return Err(CoachError::NoTransport);
        };

        let credential = credentials::resolve(&self.store, &self.env)?;
        info!(
            provider = %credential.provider,
            source = %credential.source,
            key = %credential.masked(),
            "using provider API key"
        );

        let compact = normalize(ctx);
        let image = ctx.screenshot.as_ref().and_then(Screenshot::image_bytes);
        let request = ChatRequest::new(prompt::SYSTEM_PROMPT, prompt::user_prompt(question, &compact))
            .with_image(image);
        debug!(
            user_len = request.user_text.len(),
            image_bytes = request.image_png.as_ref().map_or(0, Vec::len),
            "chat request built"
        );

        let kind = credential.provider;
        let provider = providers::build(kind, &self.settings, credential.into_secret(), client.clone());
        let text = provider
            .complete(&request)
            .await
            .map_err(|source| CoachError::Provider { provider: kind, source })?;

        info!(provider = %kind, chars = text.len(), "provider call succeeded");
        Ok(text)
    }
}
