//! Configuration system (layered: code > env > config file > defaults).

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::agent_loop::{DEFAULT_DELEGATION_MAX_ITERATIONS, DEFAULT_MAX_ITERATIONS};
use crate::bus::DEFAULT_BUS_CAPACITY;
use crate::error::SkeinError;
use crate::provider::{openai::DEFAULT_BASE_URL, ModelProvider, OpenAiChatProvider};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LIST_TIMEOUT_MS: u64 = 250;
pub const DEFAULT_MAILBOX_CAPACITY: usize = 32;

/// Runtime configuration.
///
/// Resolution order, lowest to highest:
/// 1. Built-in defaults
/// 2. `~/.skein/config.toml` (or an explicit file)
/// 3. Environment variables, after loading `.env` if present
/// 4. Setters called from code
#[derive(Clone, PartialEq)]
pub struct SkeinConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub max_iterations: usize,
    pub delegation_max_iterations: usize,
    pub list_timeout_ms: u64,
    pub mailbox_capacity: usize,
    pub bus_capacity: usize,
    pub default_working_dir: Option<PathBuf>,
}

impl Default for SkeinConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            delegation_max_iterations: DEFAULT_DELEGATION_MAX_ITERATIONS,
            list_timeout_ms: DEFAULT_LIST_TIMEOUT_MS,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            bus_capacity: DEFAULT_BUS_CAPACITY,
            default_working_dir: None,
        }
    }
}

impl fmt::Debug for SkeinConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkeinConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("max_iterations", &self.max_iterations)
            .field("delegation_max_iterations", &self.delegation_max_iterations)
            .field("list_timeout_ms", &self.list_timeout_ms)
            .field("mailbox_capacity", &self.mailbox_capacity)
            .field("bus_capacity", &self.bus_capacity)
            .field("default_working_dir", &self.default_working_dir)
            .finish()
    }
}

/// The on-disk shape: every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    model: Option<String>,
    base_url: Option<String>,
    api_key: Option<String>,
    max_iterations: Option<usize>,
    delegation_max_iterations: Option<usize>,
    list_timeout_ms: Option<u64>,
    mailbox_capacity: Option<usize>,
    bus_capacity: Option<usize>,
    default_working_dir: Option<PathBuf>,
}

impl SkeinConfig {
    /// Load defaults, the default config file, then the environment.
    pub fn load() -> Result<Self, SkeinError> {
        Self::load_from(None)
    }

    /// Like [`SkeinConfig::load`] with an explicit config file. A missing
    /// default file is fine; a missing explicit file is an error.
    pub fn load_from(path: Option<&Path>) -> Result<Self, SkeinError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::default();
        match path {
            Some(path) => config.merge_file(path)?,
            None => {
                let path = default_config_path();
                if path.is_file() {
                    config.merge_file(&path)?;
                }
            }
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from a TOML file.
    pub fn merge_file(&mut self, path: &Path) -> Result<(), SkeinError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SkeinError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        self.merge_toml(&raw)
            .map_err(|e| SkeinError::Configuration(format!("{}: {e}", path.display())))
    }

    fn merge_toml(&mut self, raw: &str) -> Result<(), toml::de::Error> {
        let file: FileConfig = toml::from_str(raw)?;
        if let Some(v) = file.model {
            self.model = v;
        }
        if let Some(v) = file.base_url {
            self.base_url = v;
        }
        if file.api_key.is_some() {
            self.api_key = file.api_key;
        }
        if let Some(v) = file.max_iterations {
            self.max_iterations = v;
        }
        if let Some(v) = file.delegation_max_iterations {
            self.delegation_max_iterations = v;
        }
        if let Some(v) = file.list_timeout_ms {
            self.list_timeout_ms = v;
        }
        if let Some(v) = file.mailbox_capacity {
            self.mailbox_capacity = v;
        }
        if let Some(v) = file.bus_capacity {
            self.bus_capacity = v;
        }
        if file.default_working_dir.is_some() {
            self.default_working_dir = file.default_working_dir;
        }
        Ok(())
    }

    /// Overlay values from environment variables read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), SkeinError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SKEIN_MODEL") {
            self.model = v;
        }
        if let Some(v) = lookup("SKEIN_BASE_URL").or_else(|| lookup("OPENAI_BASE_URL")) {
            self.base_url = v;
        }
        if let Some(v) = lookup("SKEIN_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.api_key = Some(v);
        }
        if let Some(v) = parse_env(&lookup, "SKEIN_MAX_ITERATIONS")? {
            self.max_iterations = v;
        }
        if let Some(v) = parse_env(&lookup, "SKEIN_DELEGATION_MAX_ITERATIONS")? {
            self.delegation_max_iterations = v;
        }
        if let Some(v) = parse_env(&lookup, "SKEIN_LIST_TIMEOUT_MS")? {
            self.list_timeout_ms = v;
        }
        if let Some(v) = parse_env(&lookup, "SKEIN_MAILBOX_CAPACITY")? {
            self.mailbox_capacity = v;
        }
        if let Some(v) = parse_env(&lookup, "SKEIN_BUS_CAPACITY")? {
            self.bus_capacity = v;
        }
        if let Some(v) = lookup("SKEIN_WORKING_DIR") {
            self.default_working_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_default_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.default_working_dir = Some(dir.into());
        self
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_millis(self.list_timeout_ms)
    }

    /// Build the OpenAI-compatible provider this config describes.
    pub fn provider(&self) -> Result<Arc<dyn ModelProvider>, SkeinError> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| SkeinError::Authentication("Missing OPENAI_API_KEY".into()))?;
        Ok(Arc::new(OpenAiChatProvider::new(
            self.model.clone(),
            api_key,
            Some(self.base_url.clone()),
        )))
    }
}

fn parse_env<T, F>(lookup: &F, key: &str) -> Result<Option<T>, SkeinError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| SkeinError::Configuration(format!("{key}={raw:?}: {e}")))
        })
        .transpose()
}

/// `~/.skein/config.toml`.
pub fn default_config_path() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".skein"))
        .unwrap_or_else(|| PathBuf::from(".skein"))
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = SkeinConfig::default();
        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.delegation_max_iterations, 12);
        assert_eq!(config.list_timeout(), Duration::from_millis(250));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = \"from-file\"\nmax_iterations = 5\n").unwrap();

        let mut config = SkeinConfig::default();
        config.merge_file(&path).unwrap();
        assert_eq!(config.model, "from-file");
        assert_eq!(config.max_iterations, 5);

        config
            .apply_env(env(&[("SKEIN_MODEL", "from-env"), ("OPENAI_API_KEY", "sk-1")]))
            .unwrap();
        assert_eq!(config.model, "from-env");
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.api_key.as_deref(), Some("sk-1"));
    }

    #[test]
    fn skein_api_key_wins_over_openai_key() {
        let mut config = SkeinConfig::default();
        config
            .apply_env(env(&[("OPENAI_API_KEY", "a"), ("SKEIN_API_KEY", "b")]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("b"));
    }

    #[test]
    fn bad_numbers_are_configuration_errors() {
        let mut config = SkeinConfig::default();
        let err = config
            .apply_env(env(&[("SKEIN_MAX_ITERATIONS", "many")]))
            .unwrap_err();
        assert!(matches!(err, SkeinError::Configuration(_)));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let mut config = SkeinConfig::default();
        assert!(config.merge_toml("colour = \"blue\"").is_err());
    }

    #[test]
    fn provider_requires_api_key() {
        assert!(matches!(
            SkeinConfig::default().provider(),
            Err(SkeinError::Authentication(_))
        ));
        assert!(SkeinConfig::default().with_api_key("k").provider().is_ok());
    }

    #[test]
    fn debug_redacts_api_key() {
        let rendered = format!("{:?}", SkeinConfig::default().with_api_key("sk-secret"));
        assert!(!rendered.contains("sk-secret"));
    }
}
