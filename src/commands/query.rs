use anyhow::{Context, Result};
use std::path::Path;

use crate::pdf::PageRenderer;
use crate::query::{MatchOutcome, QueryMatcher};

use super::read_input;

pub async fn run(
    path: &Path,
    query: &str,
    renderer: &PageRenderer,
    matcher: &QueryMatcher,
) -> Result<()> {
    let (name, bytes) = read_input(path)?;
    let doc = renderer
        .ingest(name, bytes)
        .await
        .with_context(|| format!("Failed to process {}", path.display()))?;

    match matcher.suggest(query, doc.pages(), doc.page_count()).await {
        MatchOutcome::Matched(indices) if indices.is_empty() => {
            println!("No matching pages.");
        }
        MatchOutcome::Matched(indices) => {
            for &index in &indices {
                let text = &doc.pages()[index].text;
                let preview: String = text.chars().take(80).collect();
                println!("p{}: {}", index + 1, preview);
            }
            println!("\n{} matching page(s).", indices.len());
        }
        MatchOutcome::Failed(reason) => {
            eprintln!("Search failed: {}", reason);
        }
    }

    Ok(())
}
