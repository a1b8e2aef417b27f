//! Provider and API key resolution.
//!
//! For each provider the preference allows, in priority order (Gemini, then
//! OpenAI), the key is looked up in:
//!   1. the primary env var (`GEMINI_API_KEY` / `OPENAI_API_KEY`)
//!   2. the namespaced alias (`FUSBUDDY360_GEMINI_API_KEY` / `FUSBUDDY360_OPENAI_API_KEY`)
//!   3. the per-user [`ConfigStore`]
//!
//! The first hit wins. Lookups are pure reads and are repeated for every
//! question; nothing is cached. Keys are only ever logged through
//! [`mask_key`].

use std::{collections::HashMap, fmt};

use thiserror::Error;

use crate::llm::ProviderKind;
use crate::store::{ConfigStore, ProviderPreference};

pub const GEMINI_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "FUSBUDDY360_GEMINI_API_KEY"];
pub const OPENAI_ENV_VARS: [&str; 2] = ["OPENAI_API_KEY", "FUSBUDDY360_OPENAI_API_KEY"];

pub fn env_vars(kind: ProviderKind) -> [&'static str; 2] {
    match kind {
        ProviderKind::Gemini => GEMINI_ENV_VARS,
        ProviderKind::OpenAi => OPENAI_ENV_VARS,
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no API key found for provider preference '{preference}'")]
    NoCredential { preference: ProviderPreference },
}

/// Where environment variables come from. Tests use `Fixed` so the process
/// environment is never touched.
#[derive(Debug, Clone, Default)]
pub enum EnvSource {
    #[default]
    Process,
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    pub fn fixed<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        EnvSource::Fixed(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn var(&self, name: &str) -> Option<String> {
        match self {
            EnvSource::Process => std::env::var(name).ok(),
            EnvSource::Fixed(vars) => vars.get(name).cloned(),
        }
    }
}

/// Which tier produced a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Env(&'static str),
    Store,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Env(name) => write!(f, "env:{name}"),
            CredentialSource::Store => f.write_str("user config"),
        }
    }
}

/// A resolved provider key. `Debug` shows only the masked preview.
#[derive(Clone)]
pub struct Credential {
    pub provider: ProviderKind,
    pub source: CredentialSource,
    secret: String,
}

impl Credential {
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn into_secret(self) -> String {
        self.secret
    }

    pub fn masked(&self) -> String {
        mask_key(&self.secret)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("provider", &self.provider)
            .field("source", &self.source)
            .field("secret", &self.masked())
            .finish()
    }
}

/// Pick the provider and key for one question.
pub fn resolve(store: &ConfigStore, env: &EnvSource) -> Result<Credential, ResolveError> {
    let preference = store.provider_preference();
    ProviderKind::PRIORITY
        .into_iter()
        .filter(|kind| preference.allows(*kind))
        .find_map(|kind| lookup(kind, store, env))
        .ok_or(ResolveError::NoCredential { preference })
}

/// Three-tier lookup for a single provider, ignoring the preference.
pub fn lookup(kind: ProviderKind, store: &ConfigStore, env: &EnvSource) -> Option<Credential> {
    env_vars(kind)
        .into_iter()
        .find_map(|name| {
            non_blank(env.var(name)).map(|secret| Credential {
                provider: kind,
                source: CredentialSource::Env(name),
                secret,
            })
        })
        .or_else(|| {
            store.api_key(kind).map(|secret| Credential {
                provider: kind,
                source: CredentialSource::Store,
                secret,
            })
        })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Loggable preview of a secret: first 7 and last 4 characters. Keys of 11
/// characters or fewer reveal nothing.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 11 {
        return "***".to_string();
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
