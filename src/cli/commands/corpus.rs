//! Corpus inspection commands.

use crate::cli::{CorpusAction, Output};
use crate::config::Settings;
use crate::corpus::{Category, CorpusStatus, CorpusStore};
use anyhow::Result;

/// Run a corpus subcommand.
pub fn run_corpus(action: &CorpusAction, settings: Settings) -> Result<()> {
    let store = CorpusStore::from_settings(&settings);

    match action {
        CorpusAction::List => {
            Output::header(&format!("Corpora in {}", store.dir().display()));
            for category in Category::ALL {
                print_summary(&store.status(category));
            }
        }

        CorpusAction::Info { category } => {
            let category: Category = category.parse()?;
            let status = store.status(category);

            Output::header(category.label());
            Output::kv("Catalog", &store.catalog_path(category).display().to_string());
            Output::kv(
                "Catalog rows",
                &status
                    .catalog_rows
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "missing".to_string()),
            );

            if status.vector_files.is_empty() {
                Output::warning("No vector files. Run 'tldw preprocess' to build one.");
            }
            for file in &status.vector_files {
                println!();
                Output::list_item(&file.provider.to_string());
                Output::kv("Path", &file.path.display().to_string());
                Output::kv("Embedder", &file.embedder.to_string());
                Output::kv("Vectors", &file.vectors.to_string());
                Output::kv("Chunk size", &file.chunk_size.to_string());
                Output::kv("Built", &file.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string());
                if status.catalog_rows != Some(file.catalog_rows) {
                    Output::warning("Catalog changed since this file was built; rerun preprocessing.");
                }
            }
        }
    }

    Ok(())
}

fn print_summary(status: &CorpusStatus) {
    let catalog = match status.catalog_rows {
        Some(n) => format!("{} catalog rows", n),
        None => "no catalog".to_string(),
    };
    let built: Vec<String> = status
        .vector_files
        .iter()
        .map(|f| format!("{} ({} vectors)", f.provider, f.vectors))
        .collect();
    let built = if built.is_empty() {
        "not preprocessed".to_string()
    } else {
        built.join(", ")
    };

    Output::list_item(&format!("{}: {}, {}", status.category.label(), catalog, built));
}
