use thiserror::Error;

/// Failure to turn raw bytes into a fully rendered document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to parse PDF: {0}")]
    Parse(#[from] lopdf::Error),

    #[error("document has no pages")]
    Empty,

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// A single page could not be rasterized or encoded.
#[derive(Debug, Error)]
#[error("page {} failed to render: {kind}", .page + 1)]
pub struct RenderError {
    /// Zero-based index of the failing page.
    pub page: usize,
    pub kind: RenderErrorKind,
}

#[derive(Debug, Error)]
pub enum RenderErrorKind {
    #[error("rasterizer: {0}")]
    Backend(String),

    #[error("thumbnail encoding: {0}")]
    Encode(#[from] image::ImageError),

    #[error("render task aborted: {0}")]
    Join(String),
}

impl RenderError {
    pub fn new(page: usize, kind: RenderErrorKind) -> Self {
        RenderError { page, kind }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to parse source PDF: {0}")]
    Parse(#[source] lopdf::Error),

    #[error("source PDF is malformed: {0}")]
    Structure(String),

    #[error("no pages selected")]
    Empty,

    #[error("page index {index} is out of range (document has {page_count} pages)")]
    OutOfRange { index: usize, page_count: usize },

    #[error("page index {index} is selected more than once")]
    Duplicate { index: usize },

    #[error("failed to write PDF: {0}")]
    Write(String),
}
