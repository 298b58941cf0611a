//! TF-IDF vectorizer.
//!
//! The vocabulary and IDF weights are fitted once on a corpus and persisted.
//! Query text must go through the same fitted transform as the corpus, so the
//! model carries a fingerprint that ends up in the corpus vector file.

use super::{Embedder, EmbedderDescriptor, EmbedderKind};
use crate::corpus::write_atomic;
use crate::error::{Result, TldwError};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Common English words that carry no topical signal.
const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "being", "but", "by", "can", "could", "did", "do", "does", "for", "from", "had", "has",
    "have", "he", "her", "his", "how", "i", "if", "in", "into", "is", "it", "its", "just", "me",
    "my", "no", "not", "of", "on", "or", "our", "out", "so", "she", "than", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "to", "up", "us", "was", "we",
    "were", "what", "when", "which", "who", "will", "with", "would", "you", "your",
];

/// Options controlling how the vocabulary is fitted.
#[derive(Debug, Clone)]
pub struct TfIdfOptions {
    /// Keep only the N terms with the highest corpus-wide frequency.
    pub max_features: Option<usize>,
    /// Tokens shorter than this many characters are ignored.
    pub min_token_len: usize,
}

impl Default for TfIdfOptions {
    fn default() -> Self {
        Self {
            max_features: None,
            min_token_len: 2,
        }
    }
}

/// Persisted form of a fitted transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TfIdfModel {
    /// Sorted vocabulary; position is the vector dimension.
    vocabulary: Vec<String>,
    idf: Vec<f32>,
    min_token_len: usize,
    fingerprint: String,
}

/// TF-IDF embedder backed by a fitted vocabulary.
pub struct TfIdfEmbedder {
    model: TfIdfModel,
    index: HashMap<String, usize>,
    token_regex: Regex,
}

impl TfIdfEmbedder {
    /// Fit vocabulary and IDF weights on a corpus of documents.
    #[instrument(skip(documents), fields(documents = documents.len()))]
    pub fn fit(documents: &[&str], options: &TfIdfOptions) -> Result<Self> {
        if documents.is_empty() {
            return Err(TldwError::InvalidInput(
                "cannot fit TF-IDF on an empty corpus".to_string(),
            ));
        }

        let token_regex = token_regex();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut term_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let tokens = tokenize(&token_regex, doc, options.min_token_len);
            for token in &tokens {
                *term_freq.entry(token.clone()).or_insert(0) += 1;
            }
            let unique: HashSet<String> = tokens.into_iter().collect();
            for term in unique {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        let mut terms: Vec<String> = doc_freq.keys().cloned().collect();
        if let Some(max) = options.max_features {
            terms.sort_by(|a, b| term_freq[b].cmp(&term_freq[a]).then_with(|| a.cmp(b)));
            terms.truncate(max);
        }
        terms.sort();

        if terms.is_empty() {
            return Err(TldwError::InvalidInput(
                "corpus contains no indexable terms".to_string(),
            ));
        }

        let n = documents.len() as f32;
        let idf: Vec<f32> = terms
            .iter()
            .map(|term| {
                let df = doc_freq[term] as f32;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let fingerprint = fingerprint(&terms, &idf, options.min_token_len);
        info!("Fitted TF-IDF vocabulary of {} terms", terms.len());

        Ok(Self::from_model(
            TfIdfModel {
                vocabulary: terms,
                idf,
                min_token_len: options.min_token_len,
                fingerprint,
            },
            token_regex,
        ))
    }

    /// Load a fitted transform written by [`TfIdfEmbedder::save`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TldwError::CorpusNotFound(format!(
                "TF-IDF model {} does not exist",
                path.display()
            )));
        }

        let content = std::fs::read(path)?;
        let model: TfIdfModel = serde_json::from_slice(&content)?;

        if model.vocabulary.len() != model.idf.len() {
            return Err(TldwError::CorpusNotFound(format!(
                "TF-IDF model {} has {} terms but {} weights",
                path.display(),
                model.vocabulary.len(),
                model.idf.len()
            )));
        }
        if fingerprint(&model.vocabulary, &model.idf, model.min_token_len) != model.fingerprint {
            return Err(TldwError::CorpusNotFound(format!(
                "TF-IDF model {} failed its integrity check",
                path.display()
            )));
        }

        debug!("Loaded TF-IDF model with {} terms", model.vocabulary.len());
        Ok(Self::from_model(model, token_regex()))
    }

    /// Persist the fitted transform, replacing any previous file atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_vec(&self.model)?;
        write_atomic(path, &content)
    }

    /// Hash identifying this fitted transform.
    pub fn fingerprint(&self) -> &str {
        &self.model.fingerprint
    }

    fn from_model(model: TfIdfModel, token_regex: Regex) -> Self {
        let index = model
            .vocabulary
            .iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), i))
            .collect();

        Self {
            model,
            index,
            token_regex,
        }
    }

    fn transform(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.model.vocabulary.len()];

        for token in tokenize(&self.token_regex, text, self.model.min_token_len) {
            if let Some(&idx) = self.index.get(&token) {
                vector[idx] += 1.0;
            }
        }
        for (value, idf) in vector.iter_mut().zip(&self.model.idf) {
            *value *= idf;
        }

        normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl Embedder for TfIdfEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.transform(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.transform(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.model.vocabulary.len()
    }

    fn descriptor(&self) -> EmbedderDescriptor {
        EmbedderDescriptor {
            provider: EmbedderKind::TfIdf,
            model: "tfidf".to_string(),
            dimensions: self.dimensions(),
            fingerprint: Some(self.model.fingerprint.clone()),
        }
    }
}

fn token_regex() -> Regex {
    Regex::new(r"\w+").expect("Invalid regex")
}

/// Lowercase word tokens, minus stop words and short tokens.
fn tokenize(regex: &Regex, text: &str, min_token_len: usize) -> Vec<String> {
    let lower = text.to_lowercase();
    regex
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| w.chars().count() >= min_token_len)
        .filter(|w| !STOP_WORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

fn fingerprint(vocabulary: &[String], idf: &[f32], min_token_len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update((min_token_len as u64).to_le_bytes());
    for (term, weight) in vocabulary.iter().zip(idf) {
        hasher.update(term.as_bytes());
        hasher.update([0u8]);
        hasher.update(weight.to_bits().to_le_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Normalize a vector to unit length (in-place).
fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
