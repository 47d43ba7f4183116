//! Application settings storage
//!
//! Stores backend selection and tuning knobs in a JSON file. Settings are
//! plain values handed to whoever needs them; nothing here is global.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const DEFAULT_MOCK_RESPONSE: &str = "[MOCK] Default mock response.";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Which answer generator to build.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    #[default]
    Mock,
    Ollama,
}

impl LlmBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmBackend::Mock => "mock",
            LlmBackend::Ollama => "ollama",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "mock" => Some(LlmBackend::Mock),
            "ollama" => Some(LlmBackend::Ollama),
            _ => None,
        }
    }
}

/// Which embedding provider to build.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    Mock,
    Ollama,
}

impl EmbeddingBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingBackend::Mock => "mock",
            EmbeddingBackend::Ollama => "ollama",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "mock" => Some(EmbeddingBackend::Mock),
            "ollama" => Some(EmbeddingBackend::Ollama),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub llm_backend: LlmBackend,
    #[serde(default)]
    pub embedding_backend: EmbeddingBackend,
    /// Ollama server URL (OLLAMA_HOST takes precedence)
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,
    #[serde(default = "default_ollama_embedding_model")]
    pub ollama_embedding_model: String,
    #[serde(default = "default_mock_response")]
    pub mock_response: String,
    /// Dimensionality of the mock embedder
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
    /// Re-embed nodes whenever their content changes
    #[serde(default)]
    pub auto_embed: bool,
    #[serde(default = "default_top_k")]
    pub smart_ask_top_k: usize,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub storage_path: Option<String>,
}

fn default_ollama_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

fn default_ollama_model() -> String {
    "mistral".to_string()
}

fn default_ollama_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_mock_response() -> String {
    DEFAULT_MOCK_RESPONSE.to_string()
}

fn default_embedding_dim() -> usize {
    768
}

fn default_top_k() -> usize {
    3
}

fn default_timeout() -> u64 {
    60
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm_backend: LlmBackend::Mock,
            embedding_backend: EmbeddingBackend::Mock,
            ollama_url: default_ollama_url(),
            ollama_model: default_ollama_model(),
            ollama_embedding_model: default_ollama_embedding_model(),
            mock_response: default_mock_response(),
            embedding_dim: default_embedding_dim(),
            auto_embed: false,
            smart_ask_top_k: default_top_k(),
            request_timeout_secs: default_timeout(),
            storage_path: None,
        }
    }
}

impl Settings {
    /// Load settings from disk, falling back to defaults when the file is
    /// absent or unreadable.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Settings::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "invalid settings file, using defaults");
                Settings::default()
            }),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read settings file, using defaults");
                Settings::default()
            }
        }
    }

    /// Save settings to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(path, content)?;
        tracing::info!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Ollama URL (checks env var first, then stored setting)
    pub fn ollama_url(&self) -> String {
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            if !host.is_empty() {
                return if host.starts_with("http://") || host.starts_with("https://") {
                    host
                } else {
                    format!("http://{}", host)
                };
            }
        }
        self.ollama_url.clone()
    }
}

/// App data directory (`<data_dir>/conch`), or `./data` when the platform has none.
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("conch"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// Settings file location: CONCH_CONFIG, else `<data_dir>/settings.json`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("CONCH_CONFIG") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    data_dir().join("settings.json")
}

/// Graph file location when nothing was given explicitly.
///
/// Prefers a stored `storage_path`, then a local `data/conversations.json`
/// (development checkouts), then the app data directory.
pub fn default_storage_path(settings: &Settings) -> PathBuf {
    if let Some(ref custom) = settings.storage_path {
        return PathBuf::from(custom);
    }
    let local = PathBuf::from("data/conversations.json");
    if local.exists() {
        return local;
    }
    data_dir().join("conversations.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.smart_ask_top_k, 3);
        assert!(!settings.auto_embed);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"llm_backend": "ollama", "auto_embed": true}"#).unwrap();
        let settings = Settings::load(&path);
        assert_eq!(settings.llm_backend, LlmBackend::Ollama);
        assert!(settings.auto_embed);
        assert_eq!(settings.embedding_backend, EmbeddingBackend::Mock);
        assert_eq!(settings.ollama_model, "mistral");
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "llm_backend: ollama").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("settings.json");
        let mut settings = Settings::default();
        settings.embedding_backend = EmbeddingBackend::Ollama;
        settings.storage_path = Some("/tmp/graph.json".to_string());
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path), settings);
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(LlmBackend::from_str("ollama"), Some(LlmBackend::Ollama));
        assert_eq!(LlmBackend::from_str("bedrock"), None);
        assert_eq!(EmbeddingBackend::Mock.as_str(), "mock");
    }

    #[test]
    fn test_storage_path_prefers_setting() {
        let mut settings = Settings::default();
        settings.storage_path = Some("elsewhere/graph.json".to_string());
        assert_eq!(default_storage_path(&settings), PathBuf::from("elsewhere/graph.json"));
    }
}
