//! A single user's working state: one document, one selection.
//!
//! Every operation returns the session to a stable state (`Idle` or
//! `Ready`) whether it succeeds, fails or is abandoned midway.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::pdf::{extract_pages, Document, ExtractError, LoadError, PageRenderer};
use crate::query::{MatchOutcome, QueryMatcher};
use crate::selection::Selection;

/// Prefix for the suggested output file name.
pub const EXPORT_PREFIX: &str = "extracted_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Load,
    Query,
    Export,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "operation")]
pub enum Status {
    /// No document loaded.
    Idle,
    /// An operation is outstanding; re-entry is refused.
    Busy(Operation),
    /// A document is loaded and can be queried or exported.
    Ready,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no document loaded")]
    NoDocument,

    #[error("query matching is not configured")]
    NoMatcher,

    #[error("failed to process {name}: {source}")]
    Load {
        name: String,
        #[source]
        source: LoadError,
    },

    #[error("failed to generate output: {0}")]
    Export(#[from] ExtractError),
}

/// The output of a successful export.
#[derive(Debug, Clone)]
pub struct Export {
    pub file_name: String,
    pub page_count: usize,
    pub bytes: Vec<u8>,
}

pub struct Session {
    renderer: PageRenderer,
    matcher: Option<QueryMatcher>,
    document: Option<Document>,
    selection: Selection,
    status: Status,
}

impl Session {
    pub fn new(renderer: PageRenderer, matcher: Option<QueryMatcher>) -> Self {
        Session {
            renderer,
            matcher,
            document: None,
            selection: Selection::new(),
            status: Status::Idle,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Replace the current document with `bytes`. On failure nothing is kept.
    pub async fn load(
        &mut self,
        name: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<&Document, SessionError> {
        let name = name.into();
        let mut busy = BusyGuard::enter(&mut self.status, Operation::Load, Status::Idle);
        self.document = None;
        self.selection.clear();

        match self.renderer.ingest(name.clone(), bytes).await {
            Ok(doc) => {
                busy.settle(Status::Ready);
                Ok(&*self.document.insert(doc))
            }
            Err(source) => {
                warn!(%name, error = %source, "load failed");
                Err(SessionError::Load { name, source })
            }
        }
    }

    pub fn reset(&mut self) {
        self.document = None;
        self.selection.clear();
        self.status = Status::Idle;
    }

    pub fn toggle(&mut self, index: usize) -> bool {
        self.selection.toggle(index)
    }

    /// Select every page, or clear when all are selected already.
    pub fn toggle_all(&mut self) -> Result<(), SessionError> {
        let total = self.loaded()?.page_count();
        self.selection.toggle_all(total);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Run a natural-language query. A usable answer replaces the selection;
    /// a failed one leaves it untouched.
    pub async fn query(&mut self, text: &str) -> Result<MatchOutcome, SessionError> {
        let matcher = self.matcher.as_ref().ok_or(SessionError::NoMatcher)?;
        let doc = self.document.as_ref().ok_or(SessionError::NoDocument)?;

        let _busy = BusyGuard::enter(&mut self.status, Operation::Query, Status::Ready);
        let outcome = matcher.suggest(text, doc.pages(), doc.page_count()).await;
        if let MatchOutcome::Matched(indices) = &outcome {
            self.selection.replace(indices.iter().copied());
        }
        Ok(outcome)
    }

    /// Assemble the selected pages, in ascending order, into a new PDF.
    pub async fn export(&mut self) -> Result<Export, SessionError> {
        let doc = self.document.as_ref().ok_or(SessionError::NoDocument)?;
        let indices = self.selection.indices();
        let source = Arc::clone(doc.raw_bytes());
        let file_name = format!("{EXPORT_PREFIX}{}", doc.name());

        let busy = BusyGuard::enter(&mut self.status, Operation::Export, Status::Ready);
        let result = tokio::task::spawn_blocking(move || extract_pages(&source, &indices)).await;
        drop(busy);

        let bytes = match result {
            Ok(extracted) => extracted?,
            Err(join) => return Err(ExtractError::Write(join.to_string()).into()),
        };
        info!(file = %file_name, pages = self.selection.len(), "exported selection");

        Ok(Export {
            file_name,
            page_count: self.selection.len(),
            bytes,
        })
    }

    fn loaded(&self) -> Result<&Document, SessionError> {
        self.document.as_ref().ok_or(SessionError::NoDocument)
    }
}

/// Holds the session `Busy` until dropped, then settles it. A caller that
/// abandons an operation midway still leaves a stable status behind.
struct BusyGuard<'a> {
    status: &'a mut Status,
    settled: Status,
}

impl<'a> BusyGuard<'a> {
    fn enter(status: &'a mut Status, operation: Operation, settled: Status) -> Self {
        *status = Status::Busy(operation);
        BusyGuard { status, settled }
    }

    fn settle(&mut self, status: Status) {
        self.settled = status;
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        *self.status = self.settled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::document::page_ids;
    use crate::pdf::fixtures::{self, page_marker};
    use crate::pdf::render::tests::{stub_renderer, StubRasterizer};
    use crate::pdf::{RenderConfig, RenderPipeline};
    use std::time::Duration;
    use crate::query::tests::MockGenerator;

    fn session_replying(reply: &str) -> Session {
        let matcher = QueryMatcher::new(MockGenerator::replying(reply), 200);
        Session::new(stub_renderer(RenderPipeline::Sequential), Some(matcher))
    }

    fn exported_markers(export: &Export) -> Vec<String> {
        let doc = lopdf::Document::load_mem(&export.bytes).unwrap();
        page_ids(&doc)
            .into_iter()
            .map(|(_, id)| page_marker(&doc, id))
            .collect()
    }

    #[tokio::test]
    async fn load_select_export_end_to_end() {
        let mut session = session_replying("[]");
        session.load("three.pdf", fixtures::sample_pdf(3)).await.unwrap();
        assert_eq!(session.status(), Status::Ready);

        session.toggle(2);
        session.toggle(0);
        let export = session.export().await.unwrap();

        assert_eq!(export.file_name, "extracted_three.pdf");
        assert_eq!(export.page_count, 2);
        assert_eq!(exported_markers(&export), vec!["Page 1", "Page 3"]);
    }

    #[tokio::test]
    async fn failed_export_keeps_the_selection() {
        let mut session = session_replying("[]");
        session.load("five.pdf", fixtures::sample_pdf(5)).await.unwrap();
        session.toggle(1);
        session.toggle(10);

        let err = session.export().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Export(ExtractError::OutOfRange { index: 10, .. })
        ));
        assert_eq!(session.selection().indices(), vec![1, 10]);
        assert_eq!(session.status(), Status::Ready);
    }

    #[tokio::test]
    async fn query_replaces_the_selection() {
        let mut session = session_replying("[3, 1]");
        session.load("four.pdf", fixtures::sample_pdf(4)).await.unwrap();
        session.toggle(0);

        let outcome = session.query("odd pages").await.unwrap();
        assert_eq!(outcome, MatchOutcome::Matched(vec![3, 1]));
        assert_eq!(session.selection().indices(), vec![1, 3]);
    }

    #[tokio::test]
    async fn failed_query_leaves_the_selection_alone() {
        let mut session = session_replying("no idea");
        session.load("four.pdf", fixtures::sample_pdf(4)).await.unwrap();
        session.toggle(2);

        let outcome = session.query("anything").await.unwrap();
        assert!(outcome.indices().is_empty());
        assert_eq!(session.selection().indices(), vec![2]);
    }

    #[tokio::test]
    async fn query_without_matcher_is_refused() {
        let mut session = Session::new(stub_renderer(RenderPipeline::Sequential), None);
        session.load("one.pdf", fixtures::sample_pdf(1)).await.unwrap();
        assert!(matches!(
            session.query("x").await,
            Err(SessionError::NoMatcher)
        ));
    }

    #[tokio::test]
    async fn failed_load_discards_previous_document() {
        let mut session = session_replying("[]");
        session.load("good.pdf", fixtures::sample_pdf(2)).await.unwrap();
        session.toggle(1);

        let err = session.load("bad.pdf", b"garbage".to_vec()).await.unwrap_err();
        assert!(err.to_string().starts_with("failed to process bad.pdf"));
        assert!(session.document().is_none());
        assert!(session.selection().is_empty());
        assert_eq!(session.status(), Status::Idle);
    }

    #[tokio::test]
    async fn new_load_clears_the_selection() {
        let mut session = session_replying("[]");
        session.load("a.pdf", fixtures::sample_pdf(3)).await.unwrap();
        session.toggle_all().unwrap();
        assert_eq!(session.selection().len(), 3);

        session.load("b.pdf", fixtures::sample_pdf(2)).await.unwrap();
        assert!(session.selection().is_empty());
        assert_eq!(session.document().unwrap().name(), "b.pdf");
    }

    #[tokio::test]
    async fn toggle_all_twice_clears() {
        let mut session = session_replying("[]");
        session.load("a.pdf", fixtures::sample_pdf(3)).await.unwrap();
        session.toggle_all().unwrap();
        session.toggle_all().unwrap();
        assert!(session.selection().is_empty());
    }

    #[tokio::test]
    async fn abandoned_load_settles_to_idle() {
        let rasterizer = Arc::new(StubRasterizer {
            stall: Some(Duration::from_millis(300)),
            ..Default::default()
        });
        let renderer = PageRenderer::new(rasterizer, RenderConfig::default());
        let mut session = Session::new(renderer, None);

        let attempt = tokio::time::timeout(
            Duration::from_millis(20),
            session.load("slow.pdf", fixtures::sample_pdf(2)),
        )
        .await;
        assert!(attempt.is_err());
        assert_eq!(session.status(), Status::Idle);
        assert!(session.document().is_none());
    }

    #[tokio::test]
    async fn abandoned_export_settles_to_ready() {
        let mut session = session_replying("[]");
        session.load("a.pdf", fixtures::sample_pdf(2)).await.unwrap();
        session.toggle(1);

        let polled_once = futures::FutureExt::now_or_never(session.export());
        drop(polled_once);
        assert_eq!(session.status(), Status::Ready);
    }

    #[tokio::test]
    async fn reset_returns_to_idle() {
        let mut session = session_replying("[]");
        session.load("a.pdf", fixtures::sample_pdf(1)).await.unwrap();
        session.reset();
        assert_eq!(session.status(), Status::Idle);
        assert!(matches!(
            session.export().await,
            Err(SessionError::NoDocument)
        ));
    }
}
