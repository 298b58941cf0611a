//! Item catalog loading.
//!
//! A catalog is a JSON array of rows with `title`, `url` and the source text
//! under `transcript` (or `source_text`). Rows whose text is missing, `null`,
//! not a string, or blank are kept but marked unembeddable.

use crate::error::{Result, TldwError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::debug;

/// One row of a catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogRow {
    pub title: String,
    pub url: String,
    #[serde(default, alias = "source_text")]
    pub transcript: serde_json::Value,
}

impl CatalogRow {
    /// The source text, if it is a usable string.
    pub fn text(&self) -> Option<&str> {
        self.transcript
            .as_str()
            .filter(|text| !text.trim().is_empty())
    }
}

/// SHA-256 over the title, url and text of `rows`, in order.
///
/// Stored with a vector file so that an edited catalog is detected even when
/// its length is unchanged.
pub fn catalog_digest<'a>(rows: impl IntoIterator<Item = &'a CatalogRow>) -> String {
    let mut hasher = Sha256::new();
    for row in rows {
        for field in [row.title.as_str(), row.url.as_str(), row.text().unwrap_or("")] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}

/// Load every row of a catalog file, in file order.
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogRow>> {
    if !path.exists() {
        return Err(TldwError::CorpusNotFound(format!(
            "catalog {} does not exist",
            path.display()
        )));
    }

    let content = std::fs::read(path)?;
    let rows: Vec<CatalogRow> = serde_json::from_slice(&content).map_err(|e| {
        TldwError::CorpusNotFound(format!("catalog {} is malformed: {}", path.display(), e))
    })?;

    debug!("Loaded {} catalog rows from {:?}", rows.len(), path);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_catalog_marks_unembeddable_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ted.catalog.json");
        std::fs::write(
            &path,
            r#"[
                {"title": "A", "url": "https://ted.com/a", "transcript": "hello there"},
                {"title": "B", "url": "https://ted.com/b", "transcript": null},
                {"title": "C", "url": "https://ted.com/c", "source_text": "aliased"},
                {"title": "D", "url": "https://ted.com/d", "transcript": 42},
                {"title": "E", "url": "https://ted.com/e"},
                {"title": "F", "url": "https://ted.com/f", "transcript": "   "}
            ]"#,
        )
        .unwrap();

        let rows = load_catalog(&path).unwrap();
        let texts: Vec<Option<&str>> = rows.iter().map(|r| r.text()).collect();
        assert_eq!(
            texts,
            vec![Some("hello there"), None, Some("aliased"), None, None, None]
        );
    }

    fn row(title: &str, text: &str) -> CatalogRow {
        CatalogRow {
            title: title.to_string(),
            url: format!("https://ted.com/{}", title),
            transcript: serde_json::Value::String(text.to_string()),
        }
    }

    #[test]
    fn test_digest_tracks_content_and_order() {
        let a = row("a", "apples");
        let b = row("b", "bananas");

        let digest = catalog_digest([&a, &b]);
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, catalog_digest([&a, &b]));
        assert_ne!(digest, catalog_digest([&b, &a]));
        assert_ne!(digest, catalog_digest([&a, &row("b", "blueberries")]));
    }

    #[test]
    fn test_missing_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_catalog(&dir.path().join("podcast.catalog.json"));
        assert!(matches!(result, Err(TldwError::CorpusNotFound(_))));
    }

    #[test]
    fn test_malformed_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ted.catalog.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_catalog(&path), Err(TldwError::CorpusNotFound(_))));
    }
}
