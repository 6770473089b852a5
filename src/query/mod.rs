//! Natural-language page search backed by a text-generation service.

pub mod client;
pub mod decode;

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

pub use client::{AnthropicClient, TextGenerator};
pub use decode::{decode_indices, Decoded};

use crate::pdf::Page;

/// Characters of page text sent per page unless configured otherwise.
pub const DEFAULT_EXCERPT_CHARS: usize = 500;

const SYSTEM_PROMPT: &str = "You match search queries against the pages of a PDF document. \
You receive the query and a JSON array of pages, each with its zero-based \"index\" and an \
excerpt of its text. Reply with only a JSON array of the indices of the pages that best match \
the query, for example [0, 3, 4]. Reply with [] if no page matches.";

/// What a query produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The service answered with a usable list (possibly empty).
    Matched(Vec<usize>),
    /// The request failed or the reply could not be decoded.
    Failed(String),
}

impl MatchOutcome {
    /// Suggested indices; empty when the query failed.
    pub fn indices(&self) -> &[usize] {
        match self {
            MatchOutcome::Matched(indices) => indices,
            MatchOutcome::Failed(_) => &[],
        }
    }
}

#[derive(Serialize)]
struct Excerpt<'a> {
    index: usize,
    text: &'a str,
}

pub struct QueryMatcher {
    generator: Arc<dyn TextGenerator>,
    excerpt_chars: usize,
}

impl QueryMatcher {
    pub fn new(generator: Arc<dyn TextGenerator>, excerpt_chars: usize) -> Self {
        QueryMatcher {
            generator,
            excerpt_chars,
        }
    }

    /// Ask the service which of `pages` match `query`.
    ///
    /// Never fails: transport and decoding problems come back as
    /// [`MatchOutcome::Failed`]. Indices at or past `page_count` are dropped.
    pub async fn suggest(&self, query: &str, pages: &[Page], page_count: usize) -> MatchOutcome {
        let prompt = match self.build_prompt(query, pages) {
            Ok(prompt) => prompt,
            Err(err) => return MatchOutcome::Failed(err.to_string()),
        };

        let reply = match self.generator.generate(SYSTEM_PROMPT, &prompt).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "query request failed");
                return MatchOutcome::Failed(err.to_string());
            }
        };

        match decode_indices(&reply) {
            Decoded::Indices(indices) => {
                let total = indices.len();
                let valid: Vec<usize> = indices.into_iter().filter(|&i| i < page_count).collect();
                if valid.len() < total {
                    warn!(
                        dropped = total - valid.len(),
                        page_count, "model suggested pages outside the document"
                    );
                }
                info!(query, matches = valid.len(), "query answered");
                MatchOutcome::Matched(valid)
            }
            Decoded::Malformed(reason) => {
                warn!(%reason, "could not decode query reply");
                MatchOutcome::Failed(reason)
            }
        }
    }

    fn build_prompt(&self, query: &str, pages: &[Page]) -> serde_json::Result<String> {
        let excerpts: Vec<Excerpt<'_>> = pages
            .iter()
            .map(|page| Excerpt {
                index: page.index,
                text: truncate_chars(&page.text, self.excerpt_chars),
            })
            .collect();
        Ok(format!(
            "Query: {query}\n\nPages:\n{}",
            serde_json::to_string(&excerpts)?
        ))
    }
}

/// The first `max` characters of `text`, cut on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}
