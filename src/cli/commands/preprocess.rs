//! Preprocess command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::corpus::{Category, CorpusStore};
use crate::embedding::{Embedder, EmbedderKind, OpenAIEmbedder, TfIdfOptions};
use crate::preprocess::{PreprocessReport, Preprocessor};
use anyhow::Result;
use std::sync::Arc;

/// Run the preprocess command.
pub async fn run_preprocess(category: &str, provider: Option<&str>, settings: Settings) -> Result<()> {
    let categories: Vec<Category> = if category.eq_ignore_ascii_case("all") {
        Category::ALL.to_vec()
    } else {
        vec![category.parse()?]
    };

    let provider = match provider {
        Some(p) => p.parse::<EmbedderKind>().map_err(|e| anyhow::anyhow!(e))?,
        None => settings.embedding.provider,
    };

    let preprocessor = Preprocessor::new(
        CorpusStore::from_settings(&settings),
        settings.recommend.chunk_size,
    );

    // Loaded once and shared across categories.
    let neural: Option<Arc<dyn Embedder>> = match provider {
        EmbedderKind::OpenAI => Some(Arc::new(OpenAIEmbedder::connect(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        )?)),
        EmbedderKind::TfIdf => None,
    };

    let tfidf_options = TfIdfOptions {
        max_features: settings.tfidf.max_features,
        min_token_len: settings.tfidf.min_token_len,
    };

    for category in categories {
        Output::info(&format!("Preprocessing {} with {}", category.label(), provider));

        let pb = Output::progress_bar(0, category.as_str());
        let on_progress = |done: usize, total: usize| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        };

        let result = match &neural {
            Some(embedder) => {
                preprocessor
                    .run_with_progress(category, embedder.clone(), on_progress)
                    .await
            }
            None => {
                preprocessor
                    .run_tfidf(category, &tfidf_options, on_progress)
                    .await
            }
        };
        pb.finish_and_clear();

        match result {
            Ok(report) => print_report(&report),
            Err(e) => {
                Output::error(&format!("Preprocessing {} failed: {}", category, e));
                Output::info("The previous corpus, if any, was left untouched.");
                return Err(e.into());
            }
        }
    }

    Ok(())
}

fn print_report(report: &PreprocessReport) {
    Output::success(&format!(
        "Embedded {} {} documents ({} dimensions)",
        report.embedded,
        report.category,
        report.dimensions
    ));
    Output::kv("Vectors", &report.path.display().to_string());

    if !report.skipped.is_empty() {
        Output::warning(&format!(
            "Skipped {} documents without usable text:",
            report.skipped.len()
        ));
        for title in &report.skipped {
            Output::list_item(title);
        }
    }
}
