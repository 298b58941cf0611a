//! Configuration settings for TLDW.

use crate::embedding::EmbedderKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub corpus: CorpusSettings,
    pub embedding: EmbeddingSettings,
    pub tfidf: TfIdfSettings,
    pub recommend: RecommendSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.tldw".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Where corpora live and how access to them is serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// Directory holding catalogs, vector files and fitted transforms.
    pub dir: String,
    /// How long to wait for another process holding a category lock.
    pub lock_timeout_secs: u64,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            dir: "~/.tldw/corpus".to_string(),
            lock_timeout_secs: 30,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai, tfidf).
    pub provider: EmbedderKind,
    /// Embedding model to use (openai provider).
    pub model: String,
    /// Embedding dimensions (openai provider).
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbedderKind::OpenAI,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Settings for the term-frequency/inverse-document-frequency vectorizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TfIdfSettings {
    /// Keep only the N most frequent terms across the corpus.
    pub max_features: Option<usize>,
    /// Tokens shorter than this many characters are ignored.
    pub min_token_len: usize,
}

impl Default for TfIdfSettings {
    fn default() -> Self {
        Self {
            max_features: None,
            min_token_len: 2,
        }
    }
}

/// Recommendation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendSettings {
    /// Number of recommendations to return.
    pub top_k: usize,
    /// Characters per chunk when vectorizing a document.
    pub chunk_size: usize,
}

impl Default for RecommendSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            chunk_size: crate::chunking::DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.recommend.chunk_size == 0 {
            return Err(crate::error::TldwError::Config(
                "recommend.chunk_size must be at least 1".to_string(),
            ));
        }
        if self.embedding.provider == EmbedderKind::OpenAI && self.embedding.dimensions == 0 {
            return Err(crate::error::TldwError::Config(
                "embedding.dimensions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::TldwError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tldw")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded corpus directory path.
    pub fn corpus_dir(&self) -> PathBuf {
        Self::expand_path(&self.corpus.dir)
    }
}
