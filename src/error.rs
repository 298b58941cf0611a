//! Error types for TLDW.

use thiserror::Error;

/// Library-level error type for TLDW operations.
#[derive(Error, Debug)]
pub enum TldwError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown category '{0}' (expected 'ted' or 'podcast')")]
    UnknownCategory(String),

    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Corpus not found: {0}")]
    CorpusNotFound(String),

    #[error("Corpus was embedded with {found}, but the active embedder is {expected}")]
    EmbedderMismatch { expected: String, found: String },

    #[error("Corpus '{0}' is locked by another process")]
    CorpusLocked(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl TldwError {
    /// Whether retrying the same request later can succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TldwError::ModelUnavailable(_) | TldwError::CorpusLocked(_))
    }

    /// Whether the error points at corrupted or stale corpus data rather than bad input.
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            TldwError::DimensionMismatch { .. } | TldwError::EmbedderMismatch { .. }
        )
    }

    /// Message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            TldwError::InvalidInput(msg) => format!("Please check your input: {}", msg),
            TldwError::UnknownCategory(category) => format!(
                "'{}' is not a supported category. Choose 'ted' or 'podcast'.",
                category
            ),
            TldwError::ModelUnavailable(_) => {
                "The embedding model is unavailable right now. Please try again shortly.".to_string()
            }
            TldwError::CorpusLocked(category) => format!(
                "The {} corpus is being rebuilt. Please try again shortly.",
                category
            ),
            TldwError::CorpusNotFound(msg) => format!(
                "Recommendations are not available: {}. Run 'tldw preprocess' to build the corpus.",
                msg
            ),
            TldwError::DimensionMismatch { .. } | TldwError::EmbedderMismatch { .. } => {
                "The recommendation corpus is out of date for the configured embedder. \
                 Run 'tldw preprocess' to rebuild it."
                    .to_string()
            }
            other => format!("Something went wrong: {}", other),
        }
    }
}

/// Result type alias for TLDW operations.
pub type Result<T> = std::result::Result<T, TldwError>;
