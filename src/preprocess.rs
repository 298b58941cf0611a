//! Offline corpus preprocessing.
//!
//! Vectorizes every embeddable catalog document and replaces the persisted
//! vector file for the category. Rows without usable text are skipped and
//! left out of the persisted row index, so items and vectors stay aligned.

use crate::corpus::{catalog_digest, CatalogRow, Category, CorpusStore, VectorFile, VectorHeader};
use crate::embedding::{Embedder, TfIdfEmbedder, TfIdfOptions};
use crate::error::{Result, TldwError};
use crate::vectorize::DocumentVectorizer;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of a preprocessing run.
#[derive(Debug, Clone)]
pub struct PreprocessReport {
    pub category: Category,
    /// Number of documents embedded and persisted.
    pub embedded: usize,
    /// Titles of catalog rows skipped for lacking usable text.
    pub skipped: Vec<String>,
    pub dimensions: usize,
    /// Vector file written.
    pub path: PathBuf,
}

/// Builds and persists corpus vectors.
pub struct Preprocessor {
    store: CorpusStore,
    chunk_size: usize,
}

impl Preprocessor {
    pub fn new(store: CorpusStore, chunk_size: usize) -> Self {
        Self { store, chunk_size }
    }

    /// Embed the category's catalog with `embedder` and persist the vectors.
    pub async fn run(&self, category: Category, embedder: Arc<dyn Embedder>) -> Result<PreprocessReport> {
        self.run_with_progress(category, embedder, |_, _| {}).await
    }

    /// Like [`Preprocessor::run`], reporting `(done, total)` after each row.
    #[instrument(skip(self, embedder, on_progress))]
    pub async fn run_with_progress<F>(
        &self,
        category: Category,
        embedder: Arc<dyn Embedder>,
        on_progress: F,
    ) -> Result<PreprocessReport>
    where
        F: FnMut(usize, usize),
    {
        let catalog = self.store.load_catalog(category)?;
        self.build(category, &catalog, embedder, None, on_progress).await
    }

    /// Fit a TF-IDF transform on the category's catalog, embed the catalog
    /// with it, and persist both the transform and the vectors together.
    #[instrument(skip(self, options, on_progress))]
    pub async fn run_tfidf<F>(
        &self,
        category: Category,
        options: &TfIdfOptions,
        on_progress: F,
    ) -> Result<PreprocessReport>
    where
        F: FnMut(usize, usize),
    {
        let catalog = self.store.load_catalog(category)?;
        let texts: Vec<&str> = catalog.iter().filter_map(|row| row.text()).collect();
        let transform = Arc::new(TfIdfEmbedder::fit(&texts, options)?);

        self.build(
            category,
            &catalog,
            transform.clone(),
            Some(transform.as_ref()),
            on_progress,
        )
        .await
    }

    async fn build<F>(
        &self,
        category: Category,
        catalog: &[CatalogRow],
        embedder: Arc<dyn Embedder>,
        transform: Option<&TfIdfEmbedder>,
        mut on_progress: F,
    ) -> Result<PreprocessReport>
    where
        F: FnMut(usize, usize),
    {
        let descriptor = embedder.descriptor();
        let vectorizer = DocumentVectorizer::with_chunk_size(embedder, self.chunk_size);
        info!("Preprocessing {} catalog rows for {} with {}", catalog.len(), category, descriptor);

        let mut rows = Vec::with_capacity(catalog.len());
        let mut vectors = Vec::with_capacity(catalog.len());
        let mut skipped = Vec::new();

        for (i, row) in catalog.iter().enumerate() {
            match row.text() {
                Some(text) => {
                    vectors.push(vectorizer.vectorize(text).await?);
                    rows.push(i);
                }
                None => {
                    warn!("Skipping catalog row {} ('{}'): no usable source text", i, row.title);
                    skipped.push(row.title.clone());
                }
            }
            on_progress(i + 1, catalog.len());
        }

        if vectors.is_empty() {
            return Err(TldwError::InvalidInput(format!(
                "{} catalog has no documents with usable text",
                category
            )));
        }

        let file = VectorFile {
            header: VectorHeader {
                dimensions: descriptor.dimensions,
                embedder: descriptor,
                chunk_size: self.chunk_size,
                catalog_rows: catalog.len(),
                catalog_digest: catalog_digest(rows.iter().map(|&i| &catalog[i])),
                rows,
                created_at: Utc::now(),
            },
            vectors,
        };
        let path = self.store.replace(category, &file, transform)?;

        info!(
            "Persisted {} vectors for {} ({} skipped)",
            file.vectors.len(),
            category,
            skipped.len()
        );

        Ok(PreprocessReport {
            category,
            embedded: file.vectors.len(),
            skipped,
            dimensions: file.header.dimensions,
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbedderKind;
    use crate::ranking::rank;
    use crate::vectorize::tests::LetterEmbedder;
    use std::time::Duration;

    fn setup() -> (tempfile::TempDir, CorpusStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path(), Duration::from_millis(200));
        std::fs::write(
            store.catalog_path(Category::Podcast),
            r#"[
                {"title": "Bigfoot", "url": "https://skeptoid.com/1", "transcript": "Is there a large ape roaming the forests of the north west?"},
                {"title": "Missing", "url": "https://skeptoid.com/2", "transcript": null},
                {"title": "Oceans", "url": "https://skeptoid.com/3", "transcript": "Deep ocean creatures, sea serpents and the legends of sailors."}
            ]"#,
        )
        .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_skips_rows_without_text_and_stays_aligned() {
        let (_dir, store) = setup();
        let embedder = Arc::new(LetterEmbedder::new());
        let preprocessor = Preprocessor::new(store.clone(), 16);

        let report = preprocessor.run(Category::Podcast, embedder.clone()).await.unwrap();
        assert_eq!(report.embedded, 2);
        assert_eq!(report.skipped, vec!["Missing".to_string()]);
        assert_eq!(report.dimensions, 4);

        let corpus = store.load(Category::Podcast, &embedder.descriptor()).unwrap();
        let titles: Vec<&str> = corpus.items().iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Bigfoot", "Oceans"]);
        assert_eq!(corpus.vectors().len(), corpus.items().len());

        // Each stored vector equals vectorizing its own text.
        let vectorizer = DocumentVectorizer::with_chunk_size(embedder.clone(), 16);
        let oceans = vectorizer.vectorize(&corpus.items()[1].source_text).await.unwrap();
        assert_eq!(corpus.vectors()[1], oceans);
    }

    #[tokio::test]
    async fn test_failed_run_keeps_previous_vectors() {
        let (_dir, store) = setup();
        let embedder = Arc::new(LetterEmbedder::new());
        let preprocessor = Preprocessor::new(store.clone(), 16);
        preprocessor.run(Category::Podcast, embedder.clone()).await.unwrap();
        let path = store.vectors_path(Category::Podcast, EmbedderKind::OpenAI);
        let before = std::fs::read(&path).unwrap();

        let result = preprocessor.run(Category::Podcast, Arc::new(LetterEmbedder::offline())).await;
        assert!(matches!(result, Err(TldwError::ModelUnavailable(_))));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_progress_reports_every_row() {
        let (_dir, store) = setup();
        let preprocessor = Preprocessor::new(store, 256);
        let mut seen = Vec::new();

        preprocessor
            .run_with_progress(Category::Podcast, Arc::new(LetterEmbedder::new()), |done, total| {
                seen.push((done, total))
            })
            .await
            .unwrap();

        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_tfidf_transform_is_persisted_with_vectors() {
        let (_dir, store) = setup();
        let preprocessor = Preprocessor::new(store.clone(), 256);

        let report = preprocessor
            .run_tfidf(Category::Podcast, &TfIdfOptions::default(), |_, _| {})
            .await
            .unwrap();
        assert_eq!(report.embedded, 2);

        let transform = TfIdfEmbedder::load(&store.tfidf_path(Category::Podcast)).unwrap();
        let corpus = store.load(Category::Podcast, &transform.descriptor()).unwrap();

        let vectorizer = DocumentVectorizer::new(Arc::new(transform));
        let query = vectorizer.vectorize("sea serpents in the deep ocean").await.unwrap();
        let results = rank(&query, &corpus, 3).unwrap();
        assert_eq!(results[0].title, "Oceans");
    }

    #[tokio::test]
    async fn test_header_records_digest_of_embedded_rows() {
        let (_dir, store) = setup();
        let preprocessor = Preprocessor::new(store.clone(), 256);

        let report = preprocessor
            .run_tfidf(Category::Podcast, &TfIdfOptions::default(), |_, _| {})
            .await
            .unwrap();

        let catalog = store.load_catalog(Category::Podcast).unwrap();
        let header = VectorFile::read_header(&report.path).unwrap();
        assert_eq!(header.rows, vec![0, 2]);
        assert_eq!(header.catalog_digest, catalog_digest([&catalog[0], &catalog[2]]));
    }

    #[tokio::test]
    async fn test_missing_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path(), Duration::from_millis(200));
        let preprocessor = Preprocessor::new(store, 256);

        let result = preprocessor.run(Category::Ted, Arc::new(LetterEmbedder::new())).await;
        assert!(matches!(result, Err(TldwError::CorpusNotFound(_))));
    }
}
