//! Corpus storage for TLDW.
//!
//! A corpus is the catalog of recommendable items for one category plus the
//! document vectors computed for them by a single embedder. Items and vectors
//! are parallel sequences: `vectors[i]` embeds `items[i]`.

mod catalog;
mod lock;
mod store;
mod vectors;

pub use catalog::{catalog_digest, load_catalog, CatalogRow};
pub use lock::CategoryLock;
pub use store::{CorpusStatus, CorpusStore, VectorFileStatus};
pub use vectors::{VectorFile, VectorHeader};

use crate::embedding::EmbedderDescriptor;
use crate::error::{Result, TldwError};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Content category. Each category has its own corpus and is never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Ted,
    Podcast,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Ted, Category::Podcast];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Ted => "ted",
            Category::Podcast => "podcast",
        }
    }

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Ted => "TED Talks",
            Category::Podcast => "Podcasts",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = TldwError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ted" => Ok(Category::Ted),
            "podcast" => Ok(Category::Podcast),
            "" => Err(TldwError::InvalidInput("category is empty".to_string())),
            _ => Err(TldwError::UnknownCategory(s.to_string())),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recommendable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusItem {
    pub title: String,
    pub url: String,
    pub source_text: String,
}

/// Items of one category aligned with their document vectors.
#[derive(Debug, Clone)]
pub struct Corpus {
    category: Category,
    items: Vec<CorpusItem>,
    vectors: Vec<Vec<f32>>,
    embedder: EmbedderDescriptor,
}

impl Corpus {
    /// Build a corpus, enforcing that items and vectors line up and that
    /// every vector has the embedder's dimensionality.
    pub fn new(
        category: Category,
        items: Vec<CorpusItem>,
        vectors: Vec<Vec<f32>>,
        embedder: EmbedderDescriptor,
    ) -> Result<Self> {
        if items.len() != vectors.len() {
            return Err(TldwError::CorpusNotFound(format!(
                "{} corpus has {} items but {} vectors",
                category,
                items.len(),
                vectors.len()
            )));
        }

        if let Some(bad) = vectors.iter().find(|v| v.len() != embedder.dimensions) {
            return Err(TldwError::DimensionMismatch {
                expected: embedder.dimensions,
                actual: bad.len(),
            });
        }

        Ok(Self {
            category,
            items,
            vectors,
            embedder,
        })
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn items(&self) -> &[CorpusItem] {
        &self.items
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    /// The embedder the vectors were produced with.
    pub fn embedder(&self) -> &EmbedderDescriptor {
        &self.embedder
    }

    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Write `contents` to `path` via a temporary file in the same directory
/// followed by a rename, so readers see either the old file or the new one.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| TldwError::Io(e.error))?;
    Ok(())
}
