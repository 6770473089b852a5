pub mod document;
pub mod error;
pub mod extract;
pub mod render;
pub mod text;

#[cfg(test)]
pub(crate) mod fixtures;

pub use document::{Document, Page};
pub use error::{ExtractError, LoadError};
pub use extract::extract_pages;
pub use render::{PageRenderer, RenderConfig, RenderPipeline};
