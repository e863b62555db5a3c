use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::DomainError;
use crate::infrastructure::embeddings::simple_engine::{
    DEFAULT_SIMPLE_DIMENSIONS, DEFAULT_SIMPLE_MODEL,
};

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILENAME: &str = "review-lens.json";

pub const STORE_ENV: &str = "REVIEW_LENS_STORE";
pub const COLLECTION_ENV: &str = "REVIEW_LENS_COLLECTION";

/// Declarative list of embedding backends compiled into the binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum EmbeddingBackend {
    /// Lightweight deterministic hash embedder (always available).
    Simple {
        #[serde(default = "default_simple_model")]
        model: String,
        #[serde(default = "default_simple_dim")]
        dimensions: usize,
    },
    /// Sentence embeddings powered by FastEmbed (feature gated).
    #[cfg(feature = "fastembed-engine")]
    FastEmbed {
        #[serde(default = "default_fastembed_model")]
        model: String,
        /// Where downloaded weights are kept; fastembed's default cache when unset.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cache_dir: Option<PathBuf>,
    },
}

impl EmbeddingBackend {
    pub fn id(&self) -> &'static str {
        match self {
            EmbeddingBackend::Simple { .. } => "simple",
            #[cfg(feature = "fastembed-engine")]
            EmbeddingBackend::FastEmbed { .. } => "fastembed",
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            EmbeddingBackend::Simple { model, .. } => model,
            #[cfg(feature = "fastembed-engine")]
            EmbeddingBackend::FastEmbed { model, .. } => model,
        }
    }
}

impl Default for EmbeddingBackend {
    fn default() -> Self {
        #[cfg(feature = "fastembed-engine")]
        {
            EmbeddingBackend::FastEmbed {
                model: default_fastembed_model(),
                cache_dir: None,
            }
        }
        #[cfg(not(feature = "fastembed-engine"))]
        {
            EmbeddingBackend::Simple {
                model: default_simple_model(),
                dimensions: default_simple_dim(),
            }
        }
    }
}

/// Endpoint, model and credential lookup for one model provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderSettings {
    pub model: String,
    pub base_url: String,
    /// Environment variables checked in order for the API key.
    pub api_key_env: Vec<String>,
    /// Explicit key; takes precedence over the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ProviderSettings {
    fn new(model: &str, base_url: &str, api_key_env: &[&str]) -> Self {
        Self {
            model: model.into(),
            base_url: base_url.into(),
            api_key_env: api_key_env.iter().map(|v| v.to_string()).collect(),
            api_key: None,
        }
    }

    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| {
                self.api_key_env
                    .iter()
                    .find_map(|name| std::env::var(name).ok())
            })
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvidersConfig {
    #[serde(default = "default_openai")]
    pub openai: ProviderSettings,
    #[serde(default = "default_gemini")]
    pub gemini: ProviderSettings,
    #[serde(default = "default_claude")]
    pub claude: ProviderSettings,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai: default_openai(),
            gemini: default_gemini(),
            claude: default_claude(),
        }
    }
}

/// Complete configuration payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub embedding: EmbeddingBackend,
    /// Placed between retrieved reviews when building the prompt context.
    #[serde(default = "default_separator")]
    pub join_separator: String,
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            collection: default_collection(),
            embedding: EmbeddingBackend::default(),
            join_separator: default_separator(),
            excerpt_chars: default_excerpt_chars(),
            request_timeout_secs: default_timeout_secs(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Store path and collection overrides from `REVIEW_LENS_*` variables.
    pub fn apply_env_overrides(&mut self) {
        if let Some(path) = non_empty_env(STORE_ENV) {
            self.store_path = PathBuf::from(path);
        }
        if let Some(collection) = non_empty_env(COLLECTION_ENV) {
            self.collection = collection;
        }
    }
}

/// Loads `AppConfig` from disk.
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Use `path`, or `review-lens.json` in the working directory when `None`.
    pub fn new(path: Option<PathBuf>) -> Self {
        let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILENAME));
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file when it exists, otherwise defaults. A file that exists but does not
    /// parse is a configuration error.
    pub fn load(&self) -> Result<AppConfig, DomainError> {
        if !self.path.exists() {
            debug!(target: "review_lens::config", path = ?self.path, "no config file, using defaults");
            return Ok(AppConfig::default());
        }

        let bytes = fs::read(&self.path).map_err(|err| {
            DomainError::config(format!("failed to read {:?}: {err}", self.path))
        })?;
        let config = serde_json::from_slice::<AppConfig>(&bytes).map_err(|err| {
            DomainError::config(format!("failed to parse {:?}: {err}", self.path))
        })?;

        debug!(target: "review_lens::config", path = ?self.path, "config loaded");
        Ok(config)
    }

    /// `load` followed by environment overrides.
    pub fn load_with_env(&self) -> Result<AppConfig, DomainError> {
        let mut config = self.load()?;
        config.apply_env_overrides();
        Ok(config)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_store_path() -> PathBuf {
    PathBuf::from("car_review_embeddings")
}

fn default_collection() -> String {
    "car_reviews".to_string()
}

fn default_separator() -> String {
    ",".to_string()
}

const fn default_excerpt_chars() -> usize {
    1000
}

const fn default_timeout_secs() -> u64 {
    120
}

const fn default_simple_dim() -> usize {
    DEFAULT_SIMPLE_DIMENSIONS
}

fn default_simple_model() -> String {
    DEFAULT_SIMPLE_MODEL.to_string()
}

#[cfg(feature = "fastembed-engine")]
fn default_fastembed_model() -> String {
    "Qdrant/all-MiniLM-L6-v2-onnx".to_string()
}

fn default_openai() -> ProviderSettings {
    ProviderSettings::new("gpt-3.5-turbo", "https://api.openai.com", &["OPENAI_API_KEY"])
}

fn default_gemini() -> ProviderSettings {
    ProviderSettings::new(
        "gemini-2.5-flash",
        "https://generativelanguage.googleapis.com",
        &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
    )
}

fn default_claude() -> ProviderSettings {
    ProviderSettings::new(
        "claude-sonnet-4-5",
        "https://api.anthropic.com",
        &["ANTHROPIC_API_KEY"],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_setup() {
        let config = AppConfig::default();
        assert_eq!(config.store_path, PathBuf::from("car_review_embeddings"));
        assert_eq!(config.collection, "car_reviews");
        assert_eq!(config.join_separator, ",");
        assert_eq!(config.excerpt_chars, 1000);
        assert_eq!(config.providers.openai.model, "gpt-3.5-turbo");
        assert_eq!(config.providers.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.providers.claude.model, "claude-sonnet-4-5");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::new(Some(dir.path().join("absent.json")));
        assert_eq!(manager.load().unwrap(), AppConfig::default());
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("review-lens.json");
        fs::write(
            &path,
            r#"{
                "collection": "fixture",
                "join_separator": "\n---\n",
                "embedding": {"backend": "simple", "dimensions": 64},
                "providers": {
                    "claude": {
                        "model": "claude-haiku",
                        "base_url": "http://localhost:9999/",
                        "api_key_env": [],
                        "api_key": "local"
                    }
                }
            }"#,
        )
        .unwrap();

        let config = ConfigManager::new(Some(path.clone())).load().unwrap();
        assert_eq!(config.collection, "fixture");
        assert_eq!(config.join_separator, "\n---\n");
        assert_eq!(
            config.embedding,
            EmbeddingBackend::Simple {
                model: DEFAULT_SIMPLE_MODEL.into(),
                dimensions: 64
            }
        );
        assert_eq!(config.providers.claude.base_url(), "http://localhost:9999");
        assert_eq!(
            config.providers.claude.resolve_api_key().as_deref(),
            Some("local")
        );
        assert_eq!(config.providers.openai, default_openai());
        assert_eq!(config.store_path, default_store_path());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("review-lens.json");
        fs::write(&path, "{ not json").unwrap();

        let result = ConfigManager::new(Some(path.clone())).load();
        assert!(matches!(result, Err(DomainError::Config(_))));
    }

    #[test]
    fn test_blank_explicit_key_counts_as_missing() {
        let settings = ProviderSettings {
            api_key: Some("   ".into()),
            api_key_env: vec!["REVIEW_LENS_TEST_UNSET_KEY".into()],
            ..default_claude()
        };
        assert_eq!(settings.resolve_api_key(), None);
    }
}
