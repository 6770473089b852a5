use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::page_range::expand_page_ranges;
use crate::pdf::{extract_pages, Document, PageRenderer};
use crate::query::{MatchOutcome, QueryMatcher};
use crate::selection::Selection;
use crate::session::{Session, EXPORT_PREFIX};

use super::read_input;

/// Export the pages named by `pages` (e.g. "1-5,10"). Pages are always
/// written in ascending order.
pub fn run_ranges(input: &Path, pages: &str, output: Option<&Path>) -> Result<PathBuf> {
    let (name, bytes) = read_input(input)?;
    let doc = Document::load(name, bytes)
        .with_context(|| format!("Failed to process {}", input.display()))?;

    let mut selection = Selection::new();
    selection.replace(expand_page_ranges(pages, doc.page_count())?);
    if selection.is_empty() {
        anyhow::bail!("No pages specified");
    }

    let bytes = extract_pages(doc.raw_bytes(), &selection.indices())
        .context("Failed to generate output")?;
    let output = output_path(output, doc.name());
    write_output(&output, &bytes)?;

    println!(
        "Extracted {} page(s) to {}",
        selection.len(),
        output.display()
    );
    Ok(output)
}

/// Export whatever pages the query matcher suggests for `query`.
pub async fn run_query(
    input: &Path,
    query: &str,
    output: Option<&Path>,
    renderer: PageRenderer,
    matcher: QueryMatcher,
) -> Result<PathBuf> {
    let (name, bytes) = read_input(input)?;
    let mut session = Session::new(renderer, Some(matcher));
    session.load(name, bytes).await?;

    match session.query(query).await? {
        MatchOutcome::Matched(indices) if indices.is_empty() => {
            anyhow::bail!("No pages matched \"{}\"", query)
        }
        MatchOutcome::Failed(reason) => anyhow::bail!("Search failed: {}", reason),
        MatchOutcome::Matched(_) => {}
    }

    let export = session.export().await?;
    let output = match output {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(&export.file_name),
    };
    write_output(&output, &export.bytes)?;

    println!(
        "Extracted {} page(s) matching \"{}\" to {}",
        export.page_count,
        query,
        output.display()
    );
    Ok(output)
}

fn output_path(output: Option<&Path>, name: &str) -> PathBuf {
    output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("{EXPORT_PREFIX}{name}")))
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to save PDF: {}", path.display()))
}
