//! Binary vector file.
//!
//! Layout: 8-byte magic, little-endian `u32` header length, JSON header,
//! then `rows.len() * dimensions` little-endian `f32` values. Floats are
//! stored bit-exact, so a read reproduces the written vectors exactly.

use super::write_atomic;
use crate::embedding::EmbedderDescriptor;
use crate::error::{Result, TldwError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

const MAGIC: &[u8; 8] = b"TLDWVEC1";

/// Metadata stored in front of the vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHeader {
    /// Embedder that produced the vectors.
    pub embedder: EmbedderDescriptor,
    pub dimensions: usize,
    /// Chunk size used when vectorizing the documents.
    pub chunk_size: usize,
    /// Number of rows in the catalog at build time.
    pub catalog_rows: usize,
    /// Catalog row index of each stored vector, ascending.
    pub rows: Vec<usize>,
    /// SHA-256 of the embedded catalog rows, see [`super::catalog_digest`].
    pub catalog_digest: String,
    pub created_at: DateTime<Utc>,
}

/// A header plus the vectors it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorFile {
    pub header: VectorHeader,
    pub vectors: Vec<Vec<f32>>,
}

impl VectorFile {
    /// Serialize and atomically replace the file at `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        if self.header.rows.len() != self.vectors.len() {
            return Err(TldwError::InvalidInput(format!(
                "{} row indices for {} vectors",
                self.header.rows.len(),
                self.vectors.len()
            )));
        }
        if let Some(bad) = self
            .vectors
            .iter()
            .find(|v| v.len() != self.header.dimensions)
        {
            return Err(TldwError::DimensionMismatch {
                expected: self.header.dimensions,
                actual: bad.len(),
            });
        }

        let header = serde_json::to_vec(&self.header)?;
        let header_len = u32::try_from(header.len())
            .map_err(|_| TldwError::InvalidInput("vector file header too large".to_string()))?;

        let mut bytes = Vec::with_capacity(
            MAGIC.len() + 4 + header.len() + self.vectors.len() * self.header.dimensions * 4,
        );
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&header_len.to_le_bytes());
        bytes.extend_from_slice(&header);
        for vector in &self.vectors {
            bytes.extend(vector.iter().flat_map(|f| f.to_le_bytes()));
        }

        write_atomic(path, &bytes)
    }

    /// Read a whole vector file.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = read_existing(path)?;
        let (header, offset) = parse_header(path, &bytes)?;

        let body = &bytes[offset..];
        let expected = header
            .rows
            .len()
            .checked_mul(header.dimensions)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| corrupt(path, "declared vector size overflows"))?;
        if body.len() != expected {
            return Err(corrupt(
                path,
                &format!("expected {} bytes of vectors, found {}", expected, body.len()),
            ));
        }

        let vectors = if header.dimensions == 0 {
            vec![Vec::new(); header.rows.len()]
        } else {
            body.chunks_exact(header.dimensions * 4)
                .map(|row| {
                    row.chunks_exact(4)
                        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                        .collect()
                })
                .collect()
        };

        Ok(Self { header, vectors })
    }

    /// Read only the header, without loading the vectors.
    pub fn read_header(path: &Path) -> Result<VectorHeader> {
        if !path.exists() {
            return Err(TldwError::CorpusNotFound(format!(
                "vector file {} does not exist",
                path.display()
            )));
        }

        let mut file = std::fs::File::open(path)?;
        let mut prefix = [0u8; 12];
        file.read_exact(&mut prefix)
            .map_err(|_| corrupt(path, "file is truncated"))?;
        let header_len = check_prefix(path, &prefix)?;

        let mut header = vec![0u8; header_len];
        file.read_exact(&mut header)
            .map_err(|_| corrupt(path, "header is truncated"))?;
        decode_header(path, &header)
    }
}

fn read_existing(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(TldwError::CorpusNotFound(format!(
            "vector file {} does not exist",
            path.display()
        )));
    }
    Ok(std::fs::read(path)?)
}

fn parse_header(path: &Path, bytes: &[u8]) -> Result<(VectorHeader, usize)> {
    if bytes.len() < 12 {
        return Err(corrupt(path, "file is truncated"));
    }
    let header_len = check_prefix(path, &bytes[..12])?;
    let end = 12 + header_len;
    if bytes.len() < end {
        return Err(corrupt(path, "header is truncated"));
    }

    Ok((decode_header(path, &bytes[12..end])?, end))
}

fn decode_header(path: &Path, bytes: &[u8]) -> Result<VectorHeader> {
    let header: VectorHeader =
        serde_json::from_slice(bytes).map_err(|e| corrupt(path, &e.to_string()))?;

    if header.dimensions != header.embedder.dimensions {
        return Err(corrupt(
            path,
            &format!(
                "header declares {} dimensions but its embedder has {}",
                header.dimensions, header.embedder.dimensions
            ),
        ));
    }
    if let Some(fingerprint) = &header.embedder.fingerprint {
        if !is_sha256_hex(fingerprint) {
            return Err(corrupt(path, "embedder fingerprint is not a SHA-256 digest"));
        }
    }
    if !is_sha256_hex(&header.catalog_digest) {
        return Err(corrupt(path, "catalog digest is not a SHA-256 digest"));
    }

    Ok(header)
}

fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

fn check_prefix(path: &Path, prefix: &[u8]) -> Result<usize> {
    if &prefix[..8] != MAGIC {
        return Err(corrupt(path, "not a TLDW vector file"));
    }
    let len = u32::from_le_bytes([prefix[8], prefix[9], prefix[10], prefix[11]]);
    Ok(len as usize)
}

fn corrupt(path: &Path, reason: &str) -> TldwError {
    TldwError::CorpusNotFound(format!("vector file {} is corrupt: {}", path.display(), reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbedderKind;

    fn sample() -> VectorFile {
        VectorFile {
            header: VectorHeader {
                embedder: EmbedderDescriptor {
                    provider: EmbedderKind::OpenAI,
                    model: "text-embedding-3-small".to_string(),
                    dimensions: 3,
                    fingerprint: None,
                },
                dimensions: 3,
                chunk_size: 256,
                catalog_rows: 3,
                rows: vec![0, 2],
                catalog_digest: "ab".repeat(32),
                created_at: Utc::now(),
            },
            vectors: vec![
                vec![0.1, -2.5e-7, f32::MAX],
                vec![1.0 / 3.0, f32::MIN_POSITIVE, -0.0],
            ],
        }
    }

    #[test]
    fn test_write_then_read_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ted.openai.vectors");

        let original = sample();
        original.write(&path).unwrap();
        let loaded = VectorFile::read(&path).unwrap();

        assert_eq!(loaded.header, original.header);
        for (a, b) in loaded.vectors.iter().zip(&original.vectors) {
            let a_bits: Vec<u32> = a.iter().map(|f| f.to_bits()).collect();
            let b_bits: Vec<u32> = b.iter().map(|f| f.to_bits()).collect();
            assert_eq!(a_bits, b_bits);
        }
    }

    #[test]
    fn test_read_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ted.openai.vectors");
        sample().write(&path).unwrap();

        let header = VectorFile::read_header(&path).unwrap();
        assert_eq!(header.rows, vec![0, 2]);
        assert_eq!(header.catalog_rows, 3);
    }

    #[test]
    fn test_truncated_file_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ted.openai.vectors");
        sample().write(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();

        assert!(matches!(
            VectorFile::read(&path),
            Err(TldwError::CorpusNotFound(_))
        ));
    }

    #[test]
    fn test_wrong_magic_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ted.openai.vectors");
        std::fs::write(&path, b"PICKLE!!\x00\x00\x00\x00").unwrap();

        assert!(matches!(
            VectorFile::read(&path),
            Err(TldwError::CorpusNotFound(_))
        ));
    }

    /// Write `header_json` behind a valid prefix, followed by `body`.
    fn write_raw(path: &Path, header_json: &str, body: &[u8]) {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&(header_json.len() as u32).to_le_bytes());
        bytes.extend_from_slice(header_json.as_bytes());
        bytes.extend_from_slice(body);
        std::fs::write(path, bytes).unwrap();
    }

    fn header_json(file: &VectorFile) -> serde_json::Value {
        serde_json::to_value(&file.header).unwrap()
    }

    #[test]
    fn test_huge_declared_dimensions_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ted.openai.vectors");

        let mut header = header_json(&sample());
        header["dimensions"] = serde_json::json!(4611686018427387904u64);
        header["embedder"]["dimensions"] = serde_json::json!(4611686018427387904u64);
        write_raw(&path, &header.to_string(), &[0u8; 24]);

        assert!(matches!(
            VectorFile::read(&path),
            Err(TldwError::CorpusNotFound(_))
        ));
    }

    #[test]
    fn test_header_dimensions_must_match_embedder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ted.openai.vectors");

        let mut header = header_json(&sample());
        header["embedder"]["dimensions"] = serde_json::json!(4);
        write_raw(&path, &header.to_string(), &[0u8; 24]);

        assert!(matches!(
            VectorFile::read(&path),
            Err(TldwError::CorpusNotFound(_))
        ));
        assert!(matches!(
            VectorFile::read_header(&path),
            Err(TldwError::CorpusNotFound(_))
        ));
    }

    #[test]
    fn test_non_hex_fingerprint_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ted.tfidf.vectors");

        let mut header = header_json(&sample());
        header["embedder"]["fingerprint"] = serde_json::json!("aéééééééé");
        write_raw(&path, &header.to_string(), &[0u8; 24]);

        assert!(matches!(
            VectorFile::read(&path),
            Err(TldwError::CorpusNotFound(_))
        ));
    }

    #[test]
    fn test_write_rejects_misaligned_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = sample();
        file.header.rows.pop();

        assert!(file.write(&dir.path().join("x.vectors")).is_err());
    }
}
