//! CLI module for TLDW.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// TLDW - Too Long; Didn't Watch
///
/// Recommends TED talks or podcast episodes similar to a transcript by
/// comparing embeddings against a precomputed corpus.
#[derive(Parser, Debug)]
#[command(name = "tldw")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Recommend content similar to a transcript
    Recommend {
        /// Transcript text (read from --file or stdin when omitted)
        transcript: Option<String>,

        /// Read the transcript from a file
        #[arg(short, long, conflicts_with = "transcript")]
        file: Option<String>,

        /// Content category (ted, podcast)
        #[arg(short = 't', long = "category", default_value = "ted")]
        category: String,

        /// Number of recommendations (defaults to recommend.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the embedding corpus for a category from its catalog
    Preprocess {
        /// Content category (ted, podcast, or all)
        category: String,

        /// Embedding provider to build with (defaults to embedding.provider)
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Inspect corpora on disk
    Corpus {
        #[command(subcommand)]
        action: CorpusAction,
    },

    /// Start HTTP API server for front-ends
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CorpusAction {
    /// List categories and the vector files built for them
    List,

    /// Show details for one category
    Info {
        /// Content category (ted, podcast)
        category: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
