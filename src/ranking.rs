//! Similarity ranking against a corpus.

use crate::corpus::Corpus;
use crate::error::{Result, TldwError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A recommended item with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub url: String,
    /// Cosine similarity (higher is better).
    pub score: f32,
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero norm or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot_product / (norm_a * norm_b);
    if similarity.is_nan() {
        return 0.0;
    }
    similarity.clamp(-1.0, 1.0)
}

/// Rank every corpus item by similarity to `query` and keep the best `top_k`.
///
/// Equal scores keep corpus order. Fewer than `top_k` items are returned
/// when the corpus is smaller.
pub fn rank(query: &[f32], corpus: &Corpus, top_k: usize) -> Result<Vec<Recommendation>> {
    if query.len() != corpus.dimensions() {
        return Err(TldwError::DimensionMismatch {
            expected: corpus.dimensions(),
            actual: query.len(),
        });
    }
    if let Some(bad) = corpus.vectors().iter().find(|v| v.len() != query.len()) {
        return Err(TldwError::DimensionMismatch {
            expected: query.len(),
            actual: bad.len(),
        });
    }

    let mut scored: Vec<(usize, f32)> = corpus
        .vectors()
        .iter()
        .map(|v| cosine_similarity(query, v))
        .enumerate()
        .collect();

    // Stable sort; scores are never NaN.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(top_k);

    Ok(scored
        .into_iter()
        .map(|(i, score)| {
            let item = &corpus.items()[i];
            Recommendation {
                title: item.title.clone(),
                url: item.url.clone(),
                score,
            }
        })
        .collect())
}
