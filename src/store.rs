//! Per-user config store — one flat JSON object on disk.
//!
//! Layout:
//! ```text
//! <config_dir>/FusBuddy360/
//! └── config.json   {"gemini_api_key": "...", "openai_api_key": "...", "llm_provider": "gemini"}
//! ```
//!
//! `<config_dir>` is the OS config directory from `dirs` (`%APPDATA%`,
//! `~/Library/Application Support`, `~/.config`), or `FUSBUDDY_CONFIG_DIR`
//! when set. Keys this crate does not know are kept verbatim, in order, on
//! every read-modify-write.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::ProviderKind;

pub const APP_DIR_NAME: &str = "FusBuddy360";
pub const CONFIG_FILE_NAME: &str = "config.json";

const KEY_OPENAI: &str = "openai_api_key";
const KEY_GEMINI: &str = "gemini_api_key";
const KEY_PROVIDER: &str = "llm_provider";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no per-user config directory available on this platform")]
    NoConfigDir,
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("malformed config in {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("cannot write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("api key must not be empty")]
    EmptyKey,
}

/// Which backend the user prefers. `Gemini` is the default.
///
/// `Auto` tries Gemini first, then OpenAI. An explicit `Gemini` or `OpenAi`
/// only ever resolves to that provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProviderPreference {
    Auto,
    #[default]
    Gemini,
    OpenAi,
}

impl ProviderPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderPreference::Auto => "auto",
            ProviderPreference::Gemini => "gemini",
            ProviderPreference::OpenAi => "openai",
        }
    }

    /// Whether `kind` may be tried under this preference.
    pub fn allows(&self, kind: ProviderKind) -> bool {
        match self {
            ProviderPreference::Auto => true,
            ProviderPreference::Gemini => kind == ProviderKind::Gemini,
            ProviderPreference::OpenAi => kind == ProviderKind::OpenAi,
        }
    }
}

impl FromStr for ProviderPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(ProviderPreference::Auto),
            "gemini" => Ok(ProviderPreference::Gemini),
            "openai" => Ok(ProviderPreference::OpenAi),
            other => Err(format!("unknown provider preference '{other}' (expected auto, gemini or openai)")),
        }
    }
}

impl fmt::Display for ProviderPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to the JSON config file. Cheap to clone; holds no cached state, so
/// every read sees the file as it is on disk right now.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store backed by an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the per-user location, honouring `FUSBUDDY_CONFIG_DIR`.
    pub fn user_default() -> Result<Self, StoreError> {
        let override_dir = std::env::var("FUSBUDDY_CONFIG_DIR").ok();
        Self::in_base_dir(override_dir.as_deref())
    }

    fn in_base_dir(override_dir: Option<&str>) -> Result<Self, StoreError> {
        let dir = match override_dir.filter(|d| !d.trim().is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir().ok_or(StoreError::NoConfigDir)?.join(APP_DIR_NAME),
        };
        Ok(Self::new(dir.join(CONFIG_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole record. A missing file is an empty record; unreadable
    /// or non-object JSON is an error.
    pub fn try_load(&self) -> Result<Map<String, Value>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => return Err(StoreError::Read { path: self.path.clone(), source }),
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(StoreError::Parse {
                path: self.path.clone(),
                reason: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
            Err(e) => Err(StoreError::Parse { path: self.path.clone(), reason: e.to_string() }),
        }
    }

    /// Like [`try_load`](Self::try_load), but any failure reads as an empty
    /// record.
    pub fn load(&self) -> Map<String, Value> {
        self.try_load().unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable user config");
            Map::new()
        })
    }

    /// Write the record as indented JSON, creating the directory if needed.
    pub fn save(&self, record: &Map<String, Value>) -> Result<(), StoreError> {
        let write_err = |source: std::io::Error| StoreError::Write { path: self.path.clone(), source };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| write_err(std::io::Error::other(e)))?;
        fs::write(&self.path, json).map_err(write_err)?;
        debug!(path = %self.path.display(), keys = record.len(), "user config saved");
        Ok(())
    }

    /// Stored key for `kind`, trimmed. Empty or non-string values are absent.
    pub fn api_key(&self, kind: ProviderKind) -> Option<String> {
        self.load()
            .get(key_field(kind))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    }

    /// Persist a trimmed key for `kind`. All-whitespace keys are rejected and
    /// nothing is written.
    pub fn set_api_key(&self, kind: ProviderKind, key: &str) -> Result<(), StoreError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        self.update(|record| {
            record.insert(key_field(kind).to_string(), Value::String(key.to_string()));
        })
    }

    pub fn get_openai_api_key(&self) -> Option<String> {
        self.api_key(ProviderKind::OpenAi)
    }

    pub fn set_openai_api_key(&self, key: &str) -> Result<(), StoreError> {
        self.set_api_key(ProviderKind::OpenAi, key)
    }

    pub fn get_gemini_api_key(&self) -> Option<String> {
        self.api_key(ProviderKind::Gemini)
    }

    pub fn set_gemini_api_key(&self, key: &str) -> Result<(), StoreError> {
        self.set_api_key(ProviderKind::Gemini, key)
    }

    /// Stored preference; missing or unrecognised values read as the default.
    pub fn provider_preference(&self) -> ProviderPreference {
        self.load()
            .get(KEY_PROVIDER)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn set_provider_preference(&self, preference: ProviderPreference) -> Result<(), StoreError> {
        self.update(|record| {
            record.insert(KEY_PROVIDER.to_string(), Value::String(preference.as_str().to_string()));
        })
    }

    // Read-modify-write without locking: a single local user is assumed.
    fn update(&self, apply: impl FnOnce(&mut Map<String, Value>)) -> Result<(), StoreError> {
        let mut record = self.load();
        apply(&mut record);
        self.save(&record)
    }
}

fn key_field(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAi => KEY_OPENAI,
        ProviderKind::Gemini => KEY_GEMINI,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, ConfigStore) {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join(APP_DIR_NAME).join(CONFIG_FILE_NAME));
        (dir, store)
    }

    #[test]
    fn missing_file_is_empty_record() {
        let (_dir, store) = temp_store();
        assert!(store.try_load().unwrap().is_empty());
        assert_eq!(store.get_openai_api_key(), None);
        assert_eq!(store.provider_preference(), ProviderPreference::Gemini);
    }

    #[test]
    fn openai_key_round_trip_is_trimmed() {
        let (_dir, store) = temp_store();
        store.set_openai_api_key("  sk-test123456789\n").unwrap();
        assert_eq!(store.get_openai_api_key().as_deref(), Some("sk-test123456789"));
        assert_eq!(store.get_gemini_api_key(), None);
    }

    #[test]
    fn whitespace_key_is_rejected() {
        let (_dir, store) = temp_store();
        let err = store.set_gemini_api_key("   \t ").unwrap_err();
        assert!(matches!(err, StoreError::EmptyKey));
        assert_eq!(store.get_gemini_api_key(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn whitespace_value_on_disk_reads_as_absent() {
        let (_dir, store) = temp_store();
        let mut record = Map::new();
        record.insert("openai_api_key".into(), Value::String("   ".into()));
        record.insert("gemini_api_key".into(), Value::from(42));
        store.save(&record).unwrap();
        assert_eq!(store.get_openai_api_key(), None);
        assert_eq!(store.get_gemini_api_key(), None);
    }

    #[test]
    fn unknown_keys_survive_writes_in_order() {
        let (_dir, store) = temp_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), r#"{"theme": "dark", "window": {"w": 400}, "llm_provider": "auto"}"#).unwrap();

        store.set_gemini_api_key("AIza-example-key").unwrap();
        store.set_provider_preference(ProviderPreference::OpenAi).unwrap();

        let record = store.try_load().unwrap();
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, ["theme", "window", "llm_provider", "gemini_api_key"]);
        assert_eq!(record["theme"], "dark");
        assert_eq!(record["window"]["w"], 400);
        assert_eq!(store.provider_preference(), ProviderPreference::OpenAi);
    }

    #[test]
    fn malformed_json_reads_as_empty() {
        let (_dir, store) = temp_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();

        assert!(matches!(store.try_load(), Err(StoreError::Parse { .. })));
        assert!(store.load().is_empty());
        assert_eq!(store.get_openai_api_key(), None);

        // A later write replaces the broken file with a valid record.
        store.set_openai_api_key("sk-recovered-0001").unwrap();
        assert_eq!(store.get_openai_api_key().as_deref(), Some("sk-recovered-0001"));
    }

    #[test]
    fn non_object_json_is_malformed() {
        let (_dir, store) = temp_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "[1, 2, 3]").unwrap();
        let err = store.try_load().unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn unknown_preference_reads_as_gemini() {
        let (_dir, store) = temp_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), r#"{"llm_provider": "claude"}"#).unwrap();
        assert_eq!(store.provider_preference(), ProviderPreference::Gemini);
    }

    #[test]
    fn preference_parses_known_values_only() {
        assert_eq!("auto".parse::<ProviderPreference>(), Ok(ProviderPreference::Auto));
        assert_eq!("openai".parse::<ProviderPreference>(), Ok(ProviderPreference::OpenAi));
        assert!("OpenAI".parse::<ProviderPreference>().is_err());
    }

    #[test]
    fn preference_gates_providers() {
        assert!(ProviderPreference::Auto.allows(ProviderKind::OpenAi));
        assert!(ProviderPreference::Gemini.allows(ProviderKind::Gemini));
        assert!(!ProviderPreference::OpenAi.allows(ProviderKind::Gemini));
    }

    #[test]
    fn override_dir_wins() {
        let store = ConfigStore::in_base_dir(Some("/tmp/fusbuddy-test")).unwrap();
        assert_eq!(store.path(), Path::new("/tmp/fusbuddy-test/config.json"));
    }
}
