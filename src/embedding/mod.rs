//! Embedding generation for similarity retrieval.
//!
//! Two families of embedder exist: a neural model served over the OpenAI API
//! and a TF-IDF vectorizer fitted on a corpus. A query can only be compared
//! against a corpus produced by the same embedder, which is what
//! [`EmbedderDescriptor`] records.

mod openai;
mod tfidf;

pub use openai::OpenAIEmbedder;
pub use tfidf::{TfIdfEmbedder, TfIdfOptions};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Identity of the vector space this embedder produces.
    fn descriptor(&self) -> EmbedderDescriptor;
}

/// Embedder family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EmbedderKind {
    /// Neural embeddings via the OpenAI embeddings API.
    #[default]
    #[serde(rename = "openai")]
    OpenAI,
    /// Term-frequency/inverse-document-frequency vectors.
    #[serde(rename = "tfidf")]
    TfIdf,
}

impl EmbedderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbedderKind::OpenAI => "openai",
            EmbedderKind::TfIdf => "tfidf",
        }
    }
}

impl std::str::FromStr for EmbedderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(EmbedderKind::OpenAI),
            "tfidf" | "tf-idf" => Ok(EmbedderKind::TfIdf),
            _ => Err(format!("Unknown embedding provider: {}", s)),
        }
    }
}

impl std::fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies the vector space an embedder maps text into.
///
/// Persisted next to corpus vectors and compared on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedderDescriptor {
    pub provider: EmbedderKind,
    pub model: String,
    pub dimensions: usize,
    /// Hash of the fitted transform, for embedders that are fitted on data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl EmbedderDescriptor {
    /// Whether vectors from `other` can be compared against vectors from `self`.
    pub fn is_compatible_with(&self, other: &EmbedderDescriptor) -> bool {
        self == other
    }
}

impl std::fmt::Display for EmbedderDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} ({}d", self.provider, self.model, self.dimensions)?;
        if let Some(fingerprint) = &self.fingerprint {
            let short: String = fingerprint.chars().take(12).collect();
            write!(f, ", {}", short)?;
        }
        write!(f, ")")
    }
}
