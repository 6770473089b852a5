pub mod export;
pub mod info;
pub mod preview;
pub mod query;

use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::AiArgs;
use crate::query::{AnthropicClient, QueryMatcher};

/// Read a PDF from disk, returning its file name and contents.
pub fn read_input(path: &Path) -> Result<(String, Vec<u8>)> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read PDF: {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string());
    Ok((name, bytes))
}

/// Build a query matcher from the AI arguments, or `None` without an API key.
pub fn matcher_from(ai: &AiArgs) -> Option<QueryMatcher> {
    let config = ai.config()?;
    let client = AnthropicClient::new(config);
    Some(QueryMatcher::new(std::sync::Arc::new(client), ai.excerpt_chars))
}

/// Like [`matcher_from`], but an API key is mandatory.
pub fn require_matcher(ai: &AiArgs) -> Result<QueryMatcher> {
    matcher_from(ai)
        .context("No API key configured; pass --api-key or set ANTHROPIC_API_KEY")
}
