//! Configuration module for TLDW.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    CorpusSettings, EmbeddingSettings, GeneralSettings, RecommendSettings, Settings,
    TfIdfSettings,
};
