//! Query-time recommendation.
//!
//! The [`Recommender`] owns the embedders for the lifetime of the process:
//! each is created on first use and reused for every later query.

use crate::config::{EmbeddingSettings, Settings};
use crate::corpus::{Category, Corpus, CorpusStore};
use crate::embedding::{Embedder, EmbedderDescriptor, EmbedderKind, OpenAIEmbedder, TfIdfEmbedder};
use crate::error::{Result, TldwError};
use crate::ranking::{rank, Recommendation};
use crate::vectorize::DocumentVectorizer;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, instrument, warn};

/// Recommends corpus items similar to a transcript.
pub struct Recommender {
    store: CorpusStore,
    provider: EmbedderKind,
    embedding: EmbeddingSettings,
    top_k: usize,
    chunk_size: usize,
    embedders: Mutex<HashMap<Category, Arc<dyn Embedder>>>,
}

impl Recommender {
    /// Create a recommender for the configured embedder.
    pub fn new(settings: &Settings) -> Self {
        Self {
            store: CorpusStore::from_settings(settings),
            provider: settings.embedding.provider,
            embedding: settings.embedding.clone(),
            top_k: settings.recommend.top_k,
            chunk_size: settings.recommend.chunk_size,
            embedders: Mutex::new(HashMap::new()),
        }
    }

    /// Create a recommender that uses `embedder` for every category.
    pub fn with_embedder(
        store: CorpusStore,
        embedder: Arc<dyn Embedder>,
        top_k: usize,
        chunk_size: usize,
    ) -> Self {
        let descriptor = embedder.descriptor();
        let embedders = Category::ALL
            .into_iter()
            .map(|category| (category, embedder.clone()))
            .collect();

        Self {
            store,
            provider: descriptor.provider,
            embedding: EmbeddingSettings {
                provider: descriptor.provider,
                model: descriptor.model,
                dimensions: descriptor.dimensions as u32,
            },
            top_k,
            chunk_size,
            embedders: Mutex::new(embedders),
        }
    }

    pub fn store(&self) -> &CorpusStore {
        &self.store
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Recommend the configured number of items for `transcript`.
    pub async fn recommend(&self, transcript: &str, category: &str) -> Result<Vec<Recommendation>> {
        self.recommend_top(transcript, category, self.top_k).await
    }

    /// Recommend up to `top_k` items for `transcript` from `category`.
    #[instrument(skip(self, transcript), fields(chars = transcript.chars().count()))]
    pub async fn recommend_top(
        &self,
        transcript: &str,
        category: &str,
        top_k: usize,
    ) -> Result<Vec<Recommendation>> {
        let result = self.try_recommend(transcript, category, top_k).await;

        match &result {
            Ok(recs) => info!("Recommended {} items from {}", recs.len(), category),
            Err(e) if e.is_integrity_error() => {
                error!("Corpus integrity problem for '{}': {}", category, e)
            }
            Err(e) => warn!("Recommendation failed: {}", e),
        }

        result
    }

    async fn try_recommend(
        &self,
        transcript: &str,
        category: &str,
        top_k: usize,
    ) -> Result<Vec<Recommendation>> {
        if transcript.trim().is_empty() {
            return Err(TldwError::InvalidInput("transcript is empty".to_string()));
        }
        let category: Category = category.parse()?;

        let (embedder, corpus) = self.load(category).await?;
        let vectorizer = DocumentVectorizer::with_chunk_size(embedder, self.chunk_size);
        let query = vectorizer.vectorize(transcript).await?;

        rank(&query, &corpus, top_k)
    }

    /// Load the category's corpus together with the embedder it must be queried with.
    async fn load(&self, category: Category) -> Result<(Arc<dyn Embedder>, Corpus)> {
        let embedder = self.embedder(category)?;
        match self.load_corpus(category, embedder.descriptor()).await {
            Ok(corpus) => Ok((embedder, corpus)),
            // The corpus was rebuilt since the transform was cached.
            Err(TldwError::EmbedderMismatch { .. } | TldwError::DimensionMismatch { .. })
                if self.provider == EmbedderKind::TfIdf =>
            {
                debug!("Reloading TF-IDF transform for {}", category);
                self.evict(category);
                let embedder = self.embedder(category)?;
                let corpus = self.load_corpus(category, embedder.descriptor()).await?;
                Ok((embedder, corpus))
            }
            Err(e) => Err(e),
        }
    }

    /// Read the corpus on the blocking pool; waiting for the category lock
    /// must not stall the async runtime.
    async fn load_corpus(&self, category: Category, expected: EmbedderDescriptor) -> Result<Corpus> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.load(category, &expected))
            .await
            .map_err(|e| TldwError::Io(std::io::Error::other(e)))?
    }

    /// The embedder for `category`, created on first use.
    pub fn embedder(&self, category: Category) -> Result<Arc<dyn Embedder>> {
        let mut embedders = self.embedders.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(embedder) = embedders.get(&category) {
            return Ok(embedder.clone());
        }

        let embedder: Arc<dyn Embedder> = match self.provider {
            EmbedderKind::OpenAI => match embedders.values().next() {
                // Neural embedders do not depend on the category.
                Some(shared) => shared.clone(),
                None => {
                    info!("Loading embedding model {}", self.embedding.model);
                    Arc::new(OpenAIEmbedder::connect(
                        &self.embedding.model,
                        self.embedding.dimensions as usize,
                    )?)
                }
            },
            EmbedderKind::TfIdf => {
                info!("Loading TF-IDF transform for {}", category);
                Arc::new(TfIdfEmbedder::load(&self.store.tfidf_path(category))?)
            }
        };

        embedders.insert(category, embedder.clone());
        Ok(embedder)
    }

    fn evict(&self, category: Category) {
        self.embedders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&category);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::TfIdfOptions;
    use crate::preprocess::Preprocessor;
    use crate::vectorize::tests::LetterEmbedder;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    const CATALOG: &str = r#"[
        {"title": "All about apples", "url": "https://ted.com/apples", "transcript": "aaaa aaaa aaaa banana"},
        {"title": "Eels and eagles", "url": "https://ted.com/eels", "transcript": "eeee eeee eeee"},
        {"title": "Oh oh", "url": "https://ted.com/oh", "transcript": "oooo oooo"},
        {"title": "Mixed", "url": "https://ted.com/mixed", "transcript": "aeo aeo"}
    ]"#;

    async fn prepared(embedder: Arc<dyn Embedder>) -> (tempfile::TempDir, CorpusStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path(), Duration::from_millis(200));
        std::fs::write(store.catalog_path(Category::Ted), CATALOG).unwrap();
        Preprocessor::new(store.clone(), 256)
            .run(Category::Ted, embedder)
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_recommend_ranks_best_match_first() {
        let embedder: Arc<dyn Embedder> = Arc::new(LetterEmbedder::new());
        let (_dir, store) = prepared(embedder.clone()).await;
        let recommender = Recommender::with_embedder(store, embedder, 3, 256);

        let recs = recommender.recommend("a talk about aaaaa", "ted").await.unwrap();
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].title, "All about apples");
        assert_eq!(recs[0].url, "https://ted.com/apples");
        assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_top_k_larger_than_corpus() {
        let embedder: Arc<dyn Embedder> = Arc::new(LetterEmbedder::new());
        let (_dir, store) = prepared(embedder.clone()).await;
        let recommender = Recommender::with_embedder(store, embedder, 3, 256);

        let recs = recommender.recommend_top("eeek", "ted", 10).await.unwrap();
        assert_eq!(recs.len(), 4);
    }

    #[tokio::test]
    async fn test_input_errors() {
        let embedder: Arc<dyn Embedder> = Arc::new(LetterEmbedder::new());
        let (_dir, store) = prepared(embedder.clone()).await;
        let recommender = Recommender::with_embedder(store, embedder, 3, 256);

        assert!(matches!(
            recommender.recommend("", "ted").await,
            Err(TldwError::InvalidInput(_))
        ));
        assert!(matches!(
            recommender.recommend("some text", "cooking").await,
            Err(TldwError::UnknownCategory(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_category_corpus() {
        let embedder: Arc<dyn Embedder> = Arc::new(LetterEmbedder::new());
        let (_dir, store) = prepared(embedder.clone()).await;
        let recommender = Recommender::with_embedder(store, embedder, 3, 256);

        let result = recommender.recommend("some text", "podcast").await;
        assert!(matches!(result, Err(TldwError::CorpusNotFound(_))));
    }

    #[tokio::test]
    async fn test_model_outage_fails_only_the_request() {
        let letters = Arc::new(LetterEmbedder::new());
        let (_dir, store) = prepared(letters.clone()).await;
        let recommender = Recommender::with_embedder(store, letters.clone(), 3, 256);

        letters.offline.store(true, Ordering::SeqCst);
        let result = recommender.recommend("hello", "ted").await;
        assert!(matches!(result, Err(TldwError::ModelUnavailable(_))));
        assert!(result.unwrap_err().is_retryable());

        letters.offline.store(false, Ordering::SeqCst);
        assert!(recommender.recommend("hello", "ted").await.is_ok());
    }

    #[tokio::test]
    async fn test_embedder_is_reused_across_queries() {
        let letters = Arc::new(LetterEmbedder::new());
        let (_dir, store) = prepared(letters.clone()).await;
        let recommender = Recommender::with_embedder(store, letters, 3, 256);

        let first = recommender.embedder(Category::Ted).unwrap();
        recommender.recommend("aaa", "ted").await.unwrap();
        let second = recommender.embedder(Category::Ted).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_tfidf_reloads_after_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.corpus.dir = dir.path().to_string_lossy().to_string();
        settings.corpus.lock_timeout_secs = 1;
        settings.embedding.provider = EmbedderKind::TfIdf;

        let store = CorpusStore::from_settings(&settings);
        std::fs::write(
            store.catalog_path(Category::Ted),
            r#"[
                {"title": "Volcanoes", "url": "https://ted.com/v", "transcript": "lava magma eruption volcano"},
                {"title": "Bees", "url": "https://ted.com/b", "transcript": "honey hive pollen bees"}
            ]"#,
        )
        .unwrap();
        let preprocessor = Preprocessor::new(store.clone(), 256);
        preprocessor
            .run_tfidf(Category::Ted, &TfIdfOptions::default(), |_, _| {})
            .await
            .unwrap();

        let recommender = Recommender::new(&settings);
        let recs = recommender.recommend("magma and lava", "ted").await.unwrap();
        assert_eq!(recs[0].title, "Volcanoes");

        // Rebuild with a different vocabulary; the cached transform is stale.
        std::fs::write(
            store.catalog_path(Category::Ted),
            r#"[
                {"title": "Volcanoes", "url": "https://ted.com/v", "transcript": "lava magma eruption volcano crater"},
                {"title": "Bees", "url": "https://ted.com/b", "transcript": "honey hive pollen bees"}
            ]"#,
        )
        .unwrap();
        preprocessor
            .run_tfidf(Category::Ted, &TfIdfOptions::default(), |_, _| {})
            .await
            .unwrap();

        let recs = recommender.recommend("a crater", "ted").await.unwrap();
        assert_eq!(recs[0].title, "Volcanoes");
        assert!(recs[0].score > 0.0);
    }
}
