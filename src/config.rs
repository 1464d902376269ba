//! Configuration module for pdfchat.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - Global TOML file (`<config dir>/pdfchat/settings.toml`)
//! - Workspace TOML file (`.pdfchat/settings.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `PDFCHAT_` and use double
//! underscores to separate nested levels:
//! - `PDFCHAT_PROVIDER__CHAT_MODEL=gemini-1.5-flash` sets `provider.chat_model`
//! - `PDFCHAT_RETRIEVAL__TOP_K=8` sets `retrieval.top_k`
//! - `PDFCHAT_SERVER__BIND=0.0.0.0:8501` sets `server.bind`
//!
//! `GOOGLE_API_KEY` is read into `provider.api_key`. The key is never written
//! back to a settings file.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::documents::ChunkingConfig;
use crate::provider::ProviderError;

/// Directory holding the workspace settings file.
pub const CONFIG_DIR: &str = ".pdfchat";
pub const SETTINGS_FILE: &str = "settings.toml";

/// Environment variable carrying the API credential.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Root directory of the vector index
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Remote embedding and chat services
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Chunking of extracted text
    #[serde(default)]
    pub documents: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    /// API key; comes from `GOOGLE_API_KEY` and is never serialized
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL of the Generative Language API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Sampling temperature for answers
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Chunks sent per embedding request
    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("embedding_model", &self.embedding_model)
            .field("chat_model", &self.chat_model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("embed_batch_size", &self.embed_batch_size)
            .finish()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetrievalConfig {
    /// Number of chunks given to the chat model as context
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Address the page is served on
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Largest accepted upload request in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `process = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_index_path() -> PathBuf {
    PathBuf::from("faiss_index")
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_embedding_model() -> String {
    "models/embedding-001".to_string()
}
fn default_chat_model() -> String {
    "models/gemini-1.5-pro".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_embed_batch_size() -> usize {
    100
}
fn default_top_k() -> usize {
    4
}
fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}
fn default_max_upload_bytes() -> usize {
    200 * 1024 * 1024
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index_path: default_index_path(),
            provider: ProviderConfig::default(),
            documents: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            embedding_model: default_embedding_model(),
            chat_model: default_chat_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            embed_batch_size: default_embed_batch_size(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));

        if let Some(global) = Self::global_config_path() {
            figment = figment.merge(Toml::file(global));
        }

        let workspace = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(SETTINGS_FILE));
        figment = figment.merge(Toml::file(workspace));

        Self::with_env(figment).extract().map_err(Box::new)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()));
        Self::with_env(figment).extract().map_err(Box::new)
    }

    fn with_env(figment: Figment) -> Figment {
        figment
            // Use double underscore (__) to separate nested levels
            // Single underscore (_) remains as is within field names
            .merge(Env::prefixed("PDFCHAT_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .merge(Env::raw().filter_map(|key| {
                key.as_str()
                    .eq_ignore_ascii_case(API_KEY_ENV)
                    .then(|| "provider.api_key".into())
            }))
    }

    /// Global settings file under the user's config directory
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pdfchat").join(SETTINGS_FILE))
    }

    /// Find the workspace settings by looking for a .pdfchat directory
    /// Searches from current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join(SETTINGS_FILE));
            }
        }

        None
    }

    /// The configured API key, or `MissingCredential`.
    pub fn require_api_key(&self) -> Result<&str, ProviderError> {
        self.provider
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ProviderError::MissingCredential)
    }

    /// Save current configuration to file. The API key is left out.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(SETTINGS_FILE);
        Self::init_config_file_at(&config_path, force)?;
        Ok(config_path)
    }

    fn init_config_file_at(path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
        if !force && path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }
        Settings::default().save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.index_path, PathBuf::from("faiss_index"));
        assert_eq!(settings.provider.embedding_model, "models/embedding-001");
        assert_eq!(settings.provider.chat_model, "models/gemini-1.5-pro");
        assert_eq!(settings.provider.temperature, 0.3);
        assert_eq!(settings.retrieval.top_k, 4);
        assert_eq!(settings.documents.max_chunk_chars, 50_000);
        assert_eq!(settings.documents.overlap_chars, 1_000);
        assert!(settings.provider.api_key.is_none());
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
version = 2
index_path = "/tmp/pdf-index"

[provider]
chat_model = "gemini-1.5-flash"
temperature = 0.1

[documents]
max_chunk_chars = 2000
overlap_chars = 200

[retrieval]
top_k = 6

[logging.modules]
process = "debug"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.version, 2);
        assert_eq!(settings.index_path, PathBuf::from("/tmp/pdf-index"));
        assert_eq!(settings.provider.chat_model, "gemini-1.5-flash");
        assert!((settings.provider.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(settings.documents.max_chunk_chars, 2000);
        assert_eq!(settings.retrieval.top_k, 6);
        assert_eq!(settings.logging.modules["process"], "debug");
        // Untouched values keep their defaults
        assert_eq!(settings.provider.embedding_model, "models/embedding-001");
        assert_eq!(settings.server.bind, "127.0.0.1:8501");
    }

    #[test]
    fn test_save_never_writes_api_key() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.provider.api_key = Some("secret-key".to_string());
        settings.retrieval.top_k = 9;

        settings.save(&config_path).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(!content.contains("secret-key"));
        assert!(!content.contains("api_key"));

        let loaded: Settings = toml::from_str(&content).unwrap();
        assert_eq!(loaded.retrieval.top_k, 9);
        assert!(loaded.provider.api_key.is_none());
    }

    #[test]
    fn test_require_api_key() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.require_api_key(),
            Err(ProviderError::MissingCredential)
        ));

        settings.provider.api_key = Some(" key-123 ".to_string());
        assert_eq!(settings.require_api_key().unwrap(), "key-123");
        assert!(!format!("{settings:?}").contains("key-123"));
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_DIR).join(SETTINGS_FILE);

        Settings::init_config_file_at(&path, false).unwrap();
        assert!(path.exists());
        assert!(Settings::init_config_file_at(&path, false).is_err());
        Settings::init_config_file_at(&path, true).unwrap();
    }
}
