//! Filesystem-backed corpus store.
//!
//! Layout inside the corpus directory:
//! - `<category>.catalog.json`: item catalog
//! - `<category>.<provider>.vectors`: document vectors per embedder family
//! - `<category>.tfidf.json`: fitted TF-IDF transform
//! - `<category>.lock`: advisory lock, shared by loads and exclusive while
//!   files are replaced

use super::{
    catalog_digest, load_catalog, CatalogRow, Category, CategoryLock, Corpus, CorpusItem, VectorFile,
};
use crate::config::Settings;
use crate::embedding::{EmbedderDescriptor, EmbedderKind, TfIdfEmbedder};
use crate::error::{Result, TldwError};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Loads corpora and resolves where their files live.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    dir: PathBuf,
    lock_timeout: Duration,
}

/// What is on disk for one category.
#[derive(Debug, Clone)]
pub struct CorpusStatus {
    pub category: Category,
    /// Catalog row count, or `None` when the catalog is missing or unreadable.
    pub catalog_rows: Option<usize>,
    pub vector_files: Vec<VectorFileStatus>,
}

/// Summary of one persisted vector file.
#[derive(Debug, Clone)]
pub struct VectorFileStatus {
    pub provider: EmbedderKind,
    pub path: PathBuf,
    pub embedder: EmbedderDescriptor,
    pub vectors: usize,
    pub catalog_rows: usize,
    pub chunk_size: usize,
    pub created_at: DateTime<Utc>,
}

impl CorpusStore {
    pub fn new(dir: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            lock_timeout,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.corpus_dir(),
            Duration::from_secs(settings.corpus.lock_timeout_secs),
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn catalog_path(&self, category: Category) -> PathBuf {
        self.dir.join(format!("{}.catalog.json", category))
    }

    pub fn vectors_path(&self, category: Category, provider: EmbedderKind) -> PathBuf {
        self.dir.join(format!("{}.{}.vectors", category, provider))
    }

    pub fn tfidf_path(&self, category: Category) -> PathBuf {
        self.dir.join(format!("{}.tfidf.json", category))
    }

    /// Take the category lock exclusively, as writers do.
    pub fn lock(&self, category: Category) -> Result<CategoryLock> {
        CategoryLock::exclusive(&self.dir, category, self.lock_timeout)
    }

    /// Take the category lock shared with other readers.
    pub fn lock_shared(&self, category: Category) -> Result<CategoryLock> {
        CategoryLock::shared(&self.dir, category, self.lock_timeout)
    }

    /// Read the catalog for a category.
    pub fn load_catalog(&self, category: Category) -> Result<Vec<CatalogRow>> {
        load_catalog(&self.catalog_path(category))
    }

    /// Load the corpus for `category` as embedded by `expected`.
    ///
    /// Fails when a file is missing, when the vector file no longer matches
    /// the catalog, or when it was produced by a different embedder.
    #[instrument(skip(self, expected), fields(embedder = %expected))]
    pub fn load(&self, category: Category, expected: &EmbedderDescriptor) -> Result<Corpus> {
        let catalog_path = self.catalog_path(category);
        let vectors_path = self.vectors_path(category, expected.provider);

        let (catalog, file) = {
            let _lock = self.lock_shared(category)?;
            for path in [&catalog_path, &vectors_path] {
                if !path.exists() {
                    return Err(TldwError::CorpusNotFound(format!(
                        "{} is missing",
                        path.display()
                    )));
                }
            }
            (load_catalog(&catalog_path)?, VectorFile::read(&vectors_path)?)
        };

        let header = &file.header;
        if header.dimensions != expected.dimensions {
            return Err(TldwError::DimensionMismatch {
                expected: expected.dimensions,
                actual: header.dimensions,
            });
        }
        if !header.embedder.is_compatible_with(expected) {
            return Err(TldwError::EmbedderMismatch {
                expected: expected.to_string(),
                found: header.embedder.to_string(),
            });
        }
        if header.catalog_rows != catalog.len() {
            return Err(TldwError::CorpusNotFound(format!(
                "{} was built for {} catalog rows but the catalog now has {}",
                vectors_path.display(),
                header.catalog_rows,
                catalog.len()
            )));
        }

        let items = select_items(&catalog, &header.rows, &vectors_path)?;
        if catalog_digest(header.rows.iter().map(|&row| &catalog[row])) != header.catalog_digest {
            return Err(TldwError::CorpusNotFound(format!(
                "{} was built from a different version of the catalog",
                vectors_path.display()
            )));
        }
        debug!(
            "Loaded {} of {} catalog rows for {}",
            items.len(),
            catalog.len(),
            category
        );

        Corpus::new(category, items, file.vectors, file.header.embedder)
    }

    /// Report what is on disk for a category.
    pub fn status(&self, category: Category) -> CorpusStatus {
        let catalog_rows = self.load_catalog(category).ok().map(|rows| rows.len());

        let vector_files = [EmbedderKind::OpenAI, EmbedderKind::TfIdf]
            .into_iter()
            .filter_map(|provider| {
                let path = self.vectors_path(category, provider);
                let header = VectorFile::read_header(&path).ok()?;
                Some(VectorFileStatus {
                    provider,
                    path,
                    embedder: header.embedder,
                    vectors: header.rows.len(),
                    catalog_rows: header.catalog_rows,
                    chunk_size: header.chunk_size,
                    created_at: header.created_at,
                })
            })
            .collect();

        CorpusStatus {
            category,
            catalog_rows,
            vector_files,
        }
    }

    /// Replace a category's vector file, and the fitted TF-IDF transform
    /// that produced it if any, while holding the category lock.
    pub fn replace(
        &self,
        category: Category,
        file: &VectorFile,
        transform: Option<&TfIdfEmbedder>,
    ) -> Result<PathBuf> {
        let path = self.vectors_path(category, file.header.embedder.provider);
        let _lock = self.lock(category)?;
        if let Some(transform) = transform {
            transform.save(&self.tfidf_path(category))?;
        }
        file.write(&path)?;
        info!("Wrote {} vectors to {:?}", file.vectors.len(), path);
        Ok(path)
    }
}

/// Pick the catalog rows a vector file was built from, in file order.
fn select_items(catalog: &[CatalogRow], rows: &[usize], path: &Path) -> Result<Vec<CorpusItem>> {
    let mut items = Vec::with_capacity(rows.len());
    let mut previous: Option<usize> = None;

    for &row in rows {
        if previous.is_some_and(|p| row <= p) {
            return Err(TldwError::CorpusNotFound(format!(
                "{} lists catalog rows out of order",
                path.display()
            )));
        }
        previous = Some(row);

        let entry = catalog.get(row).ok_or_else(|| {
            TldwError::CorpusNotFound(format!(
                "{} references catalog row {} beyond the catalog",
                path.display(),
                row
            ))
        })?;
        let text = entry.text().ok_or_else(|| {
            TldwError::CorpusNotFound(format!(
                "{} references catalog row {} which has no text",
                path.display(),
                row
            ))
        })?;

        items.push(CorpusItem {
            title: entry.title.clone(),
            url: entry.url.clone(),
            source_text: text.to_string(),
        });
    }

    Ok(items)
}
