use anyhow::Result;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::commands::read_input;
use crate::pdf::Document;
use crate::query::MatchOutcome;
use crate::session::{Session, Status};

const TEXT_PREVIEW_CHARS: usize = 200;

// Request structs for tools

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LoadRequest {
    #[schemars(description = "Path to the PDF file")]
    pub path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PagesRequest {
    #[schemars(description = "Include JPEG thumbnails as data URIs (default: false)")]
    #[serde(default)]
    pub include_thumbnails: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ToggleRequest {
    #[schemars(description = "Zero-based page index")]
    pub index: usize,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct QueryRequest {
    #[schemars(description = "Natural-language description of the pages to find")]
    pub query: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExportRequest {
    #[schemars(description = "Output file path (default: extracted_<name> in the working directory)")]
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Clone)]
pub struct PdfServer {
    session: Arc<Mutex<Session>>,
    tool_router: ToolRouter<Self>,
}

impl PdfServer {
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            tool_router: Self::tool_router(),
        }
    }

    /// The session, unless another operation is still running on it.
    fn session(&self) -> Result<MutexGuard<'_, Session>, String> {
        self.session
            .try_lock()
            .map_err(|_| "Error: session is busy with another operation".to_string())
    }
}

#[tool_router]
impl PdfServer {
    #[tool(description = "Load a PDF into the session, rendering a thumbnail and extracting text for every page. Replaces any loaded document and clears the selection.")]
    async fn pdf_load(&self, Parameters(LoadRequest { path }): Parameters<LoadRequest>) -> String {
        let mut session = match self.session() {
            Ok(s) => s,
            Err(e) => return e,
        };
        let (name, bytes) = match read_input(&PathBuf::from(&path)) {
            Ok(input) => input,
            Err(e) => return format!("Error: {}", e),
        };

        match session.load(name, bytes).await {
            Ok(doc) => to_json(&DocumentResult::from_document(doc)),
            Err(e) => format!("Error: {}", e),
        }
    }

    #[tool(description = "List the pages of the loaded document with their extracted text and selection state")]
    async fn pdf_pages(&self, Parameters(req): Parameters<PagesRequest>) -> String {
        let session = match self.session() {
            Ok(s) => s,
            Err(e) => return e,
        };
        let Some(doc) = session.document() else {
            return "Error: no document loaded".to_string();
        };

        let result: Vec<PageResult> = doc
            .pages()
            .iter()
            .map(|page| PageResult {
                index: page.index,
                selected: session.selection().contains(page.index),
                text: page.text.clone(),
                thumbnail: req.include_thumbnails.then(|| page.thumbnail.data_uri()),
            })
            .collect();
        to_json(&result)
    }

    #[tool(description = "Toggle whether a page (zero-based index) is selected for export")]
    async fn pdf_toggle(&self, Parameters(ToggleRequest { index }): Parameters<ToggleRequest>) -> String {
        let mut session = match self.session() {
            Ok(s) => s,
            Err(e) => return e,
        };
        session.toggle(index);
        to_json(&SelectionResult::from_session(&session))
    }

    #[tool(description = "Select every page, or clear the selection if every page is already selected")]
    async fn pdf_toggle_all(&self) -> String {
        let mut session = match self.session() {
            Ok(s) => s,
            Err(e) => return e,
        };
        if let Err(e) = session.toggle_all() {
            return format!("Error: {}", e);
        }
        to_json(&SelectionResult::from_session(&session))
    }

    #[tool(description = "Clear the page selection")]
    async fn pdf_clear_selection(&self) -> String {
        let mut session = match self.session() {
            Ok(s) => s,
            Err(e) => return e,
        };
        session.clear_selection();
        to_json(&SelectionResult::from_session(&session))
    }

    #[tool(description = "Ask the language model which pages match a natural-language query. Matching pages replace the current selection.")]
    async fn pdf_query(&self, Parameters(QueryRequest { query }): Parameters<QueryRequest>) -> String {
        let mut session = match self.session() {
            Ok(s) => s,
            Err(e) => return e,
        };
        let outcome = match session.query(&query).await {
            Ok(outcome) => outcome,
            Err(e) => return format!("Error: {}", e),
        };

        let result = QueryResult {
            suggested: outcome.indices().to_vec(),
            error: match outcome {
                MatchOutcome::Failed(reason) => Some(format!("search failed: {}", reason)),
                MatchOutcome::Matched(_) => None,
            },
            selection: SelectionResult::from_session(&session),
        };
        to_json(&result)
    }

    #[tool(description = "Write the selected pages, in ascending order, to a new PDF file")]
    async fn pdf_export(&self, Parameters(ExportRequest { output }): Parameters<ExportRequest>) -> String {
        let mut session = match self.session() {
            Ok(s) => s,
            Err(e) => return e,
        };
        let export = match session.export().await {
            Ok(export) => export,
            Err(e) => return format!("Error: {}", e),
        };

        let output_path = output.unwrap_or_else(|| export.file_name.clone());
        if let Err(e) = tokio::fs::write(&output_path, &export.bytes).await {
            return format!("Error: Failed to save PDF {}: {}", output_path, e);
        }

        to_json(&ExportResult {
            output_path,
            page_count: export.page_count,
        })
    }

    #[tool(description = "Discard the loaded document and selection")]
    async fn pdf_reset(&self) -> String {
        let mut session = match self.session() {
            Ok(s) => s,
            Err(e) => return e,
        };
        session.reset();
        to_json(&StatusResult {
            status: session.status(),
        })
    }
}

// Result types for MCP tools

#[derive(Debug, Serialize)]
pub struct DocumentResult {
    pub name: String,
    pub size_bytes: usize,
    pub page_count: usize,
    pub title: Option<String>,
    pub pages: Vec<PagePreview>,
}

impl DocumentResult {
    fn from_document(doc: &Document) -> Self {
        DocumentResult {
            name: doc.name().to_string(),
            size_bytes: doc.size_bytes(),
            page_count: doc.page_count(),
            title: doc.info().title.clone(),
            pages: doc
                .pages()
                .iter()
                .map(|page| PagePreview {
                    index: page.index,
                    text: page.text.chars().take(TEXT_PREVIEW_CHARS).collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PagePreview {
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct PageResult {
    pub index: usize,
    pub selected: bool,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SelectionResult {
    pub selected: Vec<usize>,
    pub status: Status,
}

impl SelectionResult {
    fn from_session(session: &Session) -> Self {
        SelectionResult {
            selected: session.selection().indices(),
            status: session.status(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueryResult {
    pub suggested: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub selection: SelectionResult,
}

#[derive(Debug, Serialize)]
pub struct ExportResult {
    pub output_path: String,
    pub page_count: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResult {
    pub status: Status,
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("Error: {}", e))
}

#[tool_handler]
impl ServerHandler for PdfServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "PDF page picking session. Use pdf_load to open a document, pdf_pages to list \
                 pages with their text, pdf_toggle / pdf_toggle_all / pdf_clear_selection to \
                 choose pages, pdf_query to select pages matching a natural-language query, and \
                 pdf_export to write the selected pages to a new PDF."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn run_server(session: Session) -> Result<()> {
    let server = PdfServer::new(session);
    info!("serving MCP on stdio");

    // Serve using stdin/stdout as a tuple
    let service = server.serve((tokio::io::stdin(), tokio::io::stdout())).await?;

    service.waiting().await?;

    Ok(())
}
