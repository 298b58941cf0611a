//! Recommend command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::recommender::Recommender;
use anyhow::{Context, Result};
use std::io::Read;

/// Run the recommend command.
pub async fn run_recommend(
    transcript: Option<String>,
    file: Option<String>,
    category: &str,
    top_k: Option<usize>,
    json: bool,
    settings: Settings,
) -> Result<()> {
    let transcript = match (transcript, file) {
        (Some(text), _) => text,
        (None, Some(path)) => {
            let path = Settings::expand_path(&path);
            std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read transcript from {:?}", path))?
        }
        (None, None) => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read transcript from stdin")?;
            buffer
        }
    };

    let recommender = Recommender::new(&settings);
    let top_k = top_k.unwrap_or(recommender.top_k());

    let spinner = Output::spinner("Finding recommendations...");
    let result = recommender.recommend_top(&transcript, category, top_k).await;
    spinner.finish_and_clear();

    match result {
        Ok(recs) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&recs)?);
            } else if recs.is_empty() {
                Output::warning("No recommendations found.");
            } else {
                Output::header(&format!("Top {} Recommendations for {}", recs.len(), category));
                for (i, rec) in recs.iter().enumerate() {
                    Output::recommendation(i + 1, rec);
                }
            }
        }
        Err(e) => {
            Output::error(&e.user_message());
            return Err(e.into());
        }
    }

    Ok(())
}
