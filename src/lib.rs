//! TLDW - Too Long; Didn't Watch
//!
//! Recommends TED talks and podcast episodes that are similar to a given
//! transcript.
//!
//! # Overview
//!
//! Each content category has a catalog of titles, URLs and source texts.
//! An offline preprocessing run embeds every catalog entry into a vector
//! file. At query time the transcript is embedded the same way and the
//! closest entries are returned by cosine similarity.
//!
//! # Architecture
//!
//! - `chunking` - Fixed-size text chunking
//! - `embedding` - Embedders (OpenAI, TF-IDF)
//! - `vectorize` - Mean-pooled document vectors
//! - `ranking` - Cosine similarity and top-K ranking
//! - `corpus` - Catalogs, vector files and the on-disk store
//! - `preprocess` - Offline corpus builds
//! - `recommender` - Query pipeline
//!
//! # Example
//!
//! ```rust,no_run
//! use tldw::config::Settings;
//! use tldw::recommender::Recommender;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let recommender = Recommender::new(&settings);
//!
//!     for rec in recommender.recommend("a talk about solar power", "ted").await? {
//!         println!("{} ({:.2}) {}", rec.title, rec.score, rec.url);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod preprocess;
pub mod ranking;
pub mod recommender;
pub mod vectorize;

pub use error::{Result, TldwError};
