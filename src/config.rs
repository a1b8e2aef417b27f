//! Runtime settings loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory when
//! present, otherwise starts from built-in defaults, then applies the
//! `FUSBUDDY_LOG_LEVEL` env override.
//!
//! These settings describe *how* to reach providers (endpoints, models,
//! timeout). API keys and the provider preference live in the per-user
//! [`store`](crate::store), never in TOML.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Endpoint and model for one provider backend.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointConfig {
    /// OpenAI: full chat completions URL. Gemini: models base URL, the
    /// `/{model}:generateContent` suffix is appended per request.
    pub api_base_url: String,
    pub model: String,
}

/// LLM settings shared by every provider.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    /// Sampling temperature sent with every request.
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    pub openai: EndpointConfig,
    pub gemini: EndpointConfig,
}

impl Default for LlmSettings {
    fn default() -> Self {
        resolve(RawSettings::default(), None, None).llm
    }
}

/// Fully-resolved runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub log_level: String,
    pub llm: LlmSettings,
    /// File the settings were read from, `None` when running on defaults.
    pub source: Option<PathBuf>,
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize, Default)]
struct RawSettings {
    #[serde(default)]
    coach: RawCoach,
    #[serde(default)]
    llm: RawLlm,
}

#[derive(Deserialize)]
struct RawCoach {
    #[serde(default = "default_log_level")]
    log_level: String,
}

impl Default for RawCoach {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    #[serde(default = "default_temperature")]
    temperature: f32,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
    #[serde(default)]
    openai: RawEndpoint,
    #[serde(default)]
    gemini: RawEndpoint,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            timeout_seconds: default_timeout_seconds(),
            openai: RawEndpoint::default(),
            gemini: RawEndpoint::default(),
        }
    }
}

/// Endpoint sections fall back per field; the defaults depend on which
/// provider the section belongs to, so they are applied in [`resolve`].
#[derive(Deserialize, Default)]
struct RawEndpoint {
    #[serde(default)]
    api_base_url: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

impl RawEndpoint {
    fn resolve(self, url: &str, model: &str) -> EndpointConfig {
        EndpointConfig {
            api_base_url: self.api_base_url.unwrap_or_else(|| url.to_string()),
            model: self.model.unwrap_or_else(|| model.to_string()),
        }
    }
}

const OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_MODEL: &str = "gpt-4o-mini";
const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GEMINI_MODEL: &str = "gemini-3-flash-preview";

fn default_log_level() -> String { "warn".to_string() }
fn default_temperature() -> f32 { 0.4 }
fn default_timeout_seconds() -> u64 { 30 }

/// Load settings, then apply env-var overrides.
///
/// An explicit `path` must exist. Without one, `config/default.toml` is used
/// when present and built-in defaults otherwise.
pub fn load(path: Option<&str>) -> Result<Settings, AppError> {
    let log_level_override = env::var("FUSBUDDY_LOG_LEVEL").ok();
    match path {
        Some(p) => load_from(Path::new(p), log_level_override.as_deref()),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                load_from(default_path, log_level_override.as_deref())
            } else {
                Ok(resolve(RawSettings::default(), None, log_level_override.as_deref()))
            }
        }
    }
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, log_level_override: Option<&str>) -> Result<Settings, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawSettings = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let settings = resolve(parsed, Some(path.to_path_buf()), log_level_override);
    validate(&settings)?;
    Ok(settings)
}

fn resolve(raw: RawSettings, source: Option<PathBuf>, log_level_override: Option<&str>) -> Settings {
    Settings {
        log_level: log_level_override.unwrap_or(&raw.coach.log_level).to_string(),
        llm: LlmSettings {
            temperature: raw.llm.temperature,
            timeout_seconds: raw.llm.timeout_seconds,
            openai: raw.llm.openai.resolve(OPENAI_API_BASE_URL, OPENAI_MODEL),
            gemini: raw.llm.gemini.resolve(GEMINI_API_BASE_URL, GEMINI_MODEL),
        },
        source,
    }
}

fn validate(settings: &Settings) -> Result<(), AppError> {
    if settings.llm.timeout_seconds == 0 {
        return Err(AppError::Config("llm.timeout_seconds must be greater than zero".into()));
    }
    if !(0.0..=2.0).contains(&settings.llm.temperature) {
        return Err(AppError::Config(format!(
            "llm.temperature must be within 0.0..=2.0, got {}",
            settings.llm.temperature
        )));
    }
    Ok(())
}
