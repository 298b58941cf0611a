//! Document vectorization.
//!
//! A document vector is the element-wise mean of the embeddings of the
//! document's fixed-size chunks.

use crate::chunking::{chunk_text, DEFAULT_CHUNK_SIZE};
use crate::embedding::{Embedder, EmbedderDescriptor};
use crate::error::{Result, TldwError};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Turns whole documents into single vectors with one embedder.
#[derive(Clone)]
pub struct DocumentVectorizer {
    embedder: Arc<dyn Embedder>,
    chunk_size: usize,
}

impl DocumentVectorizer {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self::with_chunk_size(embedder, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(embedder: Arc<dyn Embedder>, chunk_size: usize) -> Self {
        Self {
            embedder,
            chunk_size,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn descriptor(&self) -> EmbedderDescriptor {
        self.embedder.descriptor()
    }

    /// Chunk, embed and mean-pool `text`.
    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn vectorize(&self, text: &str) -> Result<Vec<f32>> {
        let chunks = chunk_text(text, self.chunk_size)?;
        debug!("Embedding {} chunks", chunks.len());

        let embeddings = self.embedder.embed_batch(&chunks).await?;
        if embeddings.len() != chunks.len() {
            return Err(TldwError::ModelUnavailable(format!(
                "Embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimensions = self.embedder.dimensions();
        if let Some(bad) = embeddings.iter().find(|v| v.len() != dimensions) {
            return Err(TldwError::DimensionMismatch {
                expected: dimensions,
                actual: bad.len(),
            });
        }

        mean_pool(&embeddings)
    }
}

/// Element-wise arithmetic mean of equally sized vectors.
pub fn mean_pool(vectors: &[Vec<f32>]) -> Result<Vec<f32>> {
    let first = vectors
        .first()
        .ok_or_else(|| TldwError::InvalidInput("no vectors to pool".to_string()))?;

    if vectors.len() == 1 {
        return Ok(first.clone());
    }

    let mut sum = vec![0.0f64; first.len()];
    for vector in vectors {
        if vector.len() != first.len() {
            return Err(TldwError::DimensionMismatch {
                expected: first.len(),
                actual: vector.len(),
            });
        }
        for (acc, x) in sum.iter_mut().zip(vector) {
            *acc += f64::from(*x);
        }
    }

    let n = vectors.len() as f64;
    Ok(sum.into_iter().map(|s| (s / n) as f32).collect())
}
