//! Per-page thumbnail and text pipeline.
//!
//! Rasterization goes through [`PageRasterizer`] so the pdfium backend can be
//! swapped out. Thumbnails are JPEG-encoded; the page list is always
//! assembled in index order, whichever [`RenderPipeline`] is configured.

use base64::Engine as _;
use futures::{stream, StreamExt, TryStreamExt};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use pdfium_render::prelude::{PdfRenderConfig, Pdfium, PdfiumError};
use std::num::NonZeroUsize;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::document::{Document, Page};
use super::error::{LoadError, RenderError, RenderErrorKind};
use super::text::page_text;

/// Receives each rasterized page, in order.
pub type PageSink<'a> = dyn FnMut(usize, RgbaImage) -> Result<(), RenderError> + 'a;

/// Produces bitmaps for a run of pages of a PDF held in memory.
pub trait PageRasterizer: Send + Sync {
    /// Render the zero-based `pages` of `pdf` in order, scaled by `scale`
    /// relative to their native size in points, handing each bitmap to
    /// `sink`. The document is parsed once per call. Stops at the first page
    /// that fails or the first error returned by `sink`.
    fn rasterize(
        &self,
        pdf: &[u8],
        pages: Range<usize>,
        scale: f32,
        sink: &mut PageSink<'_>,
    ) -> Result<(), RenderError>;
}

/// Rasterizer backed by a dynamically bound pdfium library.
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl PdfiumRasterizer {
    /// Bind to pdfium at `library`, or search the working directory and
    /// then the system library path.
    pub fn bind(library: Option<&Path>) -> anyhow::Result<Self> {
        let bindings = match library {
            Some(path) => Pdfium::bind_to_library(path).map_err(|err| {
                anyhow::anyhow!("failed to load pdfium from {}: {}", path.display(), err)
            })?,
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
                .map_err(|err| {
                    anyhow::anyhow!(
                        "pdfium library not found ({}); install it or pass --pdfium-lib",
                        err
                    )
                })?,
        };
        Ok(PdfiumRasterizer {
            pdfium: Pdfium::new(bindings),
        })
    }
}

fn backend_error(page: usize) -> impl FnOnce(PdfiumError) -> RenderError {
    move |err| RenderError::new(page, RenderErrorKind::Backend(err.to_string()))
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(
        &self,
        pdf: &[u8],
        pages: Range<usize>,
        scale: f32,
        sink: &mut PageSink<'_>,
    ) -> Result<(), RenderError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(backend_error(pages.start))?;
        let config = PdfRenderConfig::new()
            .scale_page_by_factor(scale)
            .render_form_data(false);

        for index in pages {
            let page_index = u16::try_from(index).map_err(|_| {
                RenderError::new(index, RenderErrorKind::Backend("page index out of range".into()))
            })?;
            let page = document
                .pages()
                .get(page_index)
                .map_err(backend_error(index))?;
            let bitmap = page
                .render_with_config(&config)
                .map_err(backend_error(index))?;
            sink(index, bitmap.as_image().to_rgba8())?;
        }
        Ok(())
    }
}

/// A lossy page preview.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

impl Thumbnail {
    pub fn encode(image: RgbaImage, quality: u8) -> Result<Self, image::ImageError> {
        let (width, height) = image.dimensions();
        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, quality).encode_image(&rgb)?;
        Ok(Thumbnail {
            width,
            height,
            jpeg,
        })
    }

    pub fn data_uri(&self) -> String {
        format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.jpeg)
        )
    }
}

/// How pages are scheduled during ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderPipeline {
    /// Page N+1 starts only after page N has finished.
    #[default]
    Sequential,
    /// Pages split into up to `workers` contiguous runs rendered in
    /// parallel; results still come back in index order.
    Concurrent { workers: NonZeroUsize },
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Raster scale relative to native page size.
    pub scale: f32,
    /// JPEG quality, 1-100.
    pub quality: u8,
    pub pipeline: RenderPipeline,
    /// Explicit pdfium library; `None` searches the default locations.
    pub pdfium_library: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            scale: 0.5,
            quality: 80,
            pipeline: RenderPipeline::Sequential,
            pdfium_library: None,
        }
    }
}

/// Fills a [`Document`] with thumbnails and text.
#[derive(Clone)]
pub struct PageRenderer {
    rasterizer: Arc<dyn PageRasterizer>,
    config: RenderConfig,
}

impl PageRenderer {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, config: RenderConfig) -> Self {
        PageRenderer { rasterizer, config }
    }

    /// Bind pdfium according to `config` and build a renderer around it.
    pub fn with_pdfium(config: RenderConfig) -> anyhow::Result<Self> {
        let rasterizer = PdfiumRasterizer::bind(config.pdfium_library.as_deref())?;
        Ok(PageRenderer::new(Arc::new(rasterizer), config))
    }

    /// Load `bytes` and render every page. Any page failure aborts the load.
    pub async fn ingest(
        &self,
        name: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<Document, LoadError> {
        let name = name.into();
        let bytes = bytes.into();
        let mut doc = tokio::task::spawn_blocking(move || Document::load(name, bytes))
            .await
            .map_err(|err| RenderError::new(0, RenderErrorKind::Join(err.to_string())))??;

        let pages = self.render(&doc).await?;
        doc.set_pages(pages);
        info!(
            name = doc.name(),
            pages = doc.page_count(),
            size = doc.size_bytes(),
            "document ready"
        );
        Ok(doc)
    }

    /// Render every page of `doc` in physical order.
    pub async fn render(&self, doc: &Document) -> Result<Vec<Page>, RenderError> {
        let count = doc.page_count();
        let (runs, in_flight) = match self.config.pipeline {
            RenderPipeline::Sequential => (vec![0..count], 1),
            RenderPipeline::Concurrent { workers } => (split_runs(count, workers), workers.get()),
        };

        let batches: Vec<Vec<Page>> = stream::iter(runs)
            .map(|pages| self.spawn_run(doc, pages))
            .buffered(in_flight)
            .try_collect()
            .await?;
        Ok(batches.into_iter().flatten().collect())
    }

    fn spawn_run(
        &self,
        doc: &Document,
        pages: Range<usize>,
    ) -> impl std::future::Future<Output = Result<Vec<Page>, RenderError>> {
        let first = pages.start;
        let job = RunJob {
            rasterizer: Arc::clone(&self.rasterizer),
            bytes: Arc::clone(doc.raw_bytes()),
            source: Arc::clone(doc.source()),
            scale: self.config.scale,
            quality: self.config.quality,
            pages,
        };
        async move {
            tokio::task::spawn_blocking(move || job.run())
                .await
                .map_err(|err| RenderError::new(first, RenderErrorKind::Join(err.to_string())))?
        }
    }
}

/// Cut `0..count` into at most `workers` contiguous runs of near-equal size.
fn split_runs(count: usize, workers: NonZeroUsize) -> Vec<Range<usize>> {
    let size = count.div_ceil(workers.get()).max(1);
    (0..count)
        .step_by(size)
        .map(|start| start..(start + size).min(count))
        .collect()
}

/// One contiguous run of pages, rendered on a blocking thread.
struct RunJob {
    rasterizer: Arc<dyn PageRasterizer>,
    bytes: Arc<[u8]>,
    source: Arc<lopdf::Document>,
    scale: f32,
    quality: u8,
    pages: Range<usize>,
}

impl RunJob {
    fn run(self) -> Result<Vec<Page>, RenderError> {
        let mut rendered = Vec::with_capacity(self.pages.len());
        let source = &self.source;
        let quality = self.quality;

        self.rasterizer.rasterize(
            &self.bytes,
            self.pages.clone(),
            self.scale,
            &mut |index, bitmap| {
                let thumbnail = Thumbnail::encode(bitmap, quality)
                    .map_err(|err| RenderError::new(index, RenderErrorKind::Encode(err)))?;
                let text = text_or_empty(source, index);
                debug!(
                    page = index,
                    width = thumbnail.width,
                    height = thumbnail.height,
                    text_len = text.len(),
                    "rendered page"
                );
                rendered.push(Page {
                    index,
                    thumbnail,
                    text,
                });
                Ok(())
            },
        )?;
        Ok(rendered)
    }
}

/// A page whose text lopdf cannot decode still renders; it just has no text.
fn text_or_empty(source: &lopdf::Document, index: usize) -> String {
    match page_text(source, index as u32 + 1) {
        Ok(text) => text,
        Err(err) => {
            warn!(page = index, error = %err, "could not extract page text");
            String::new()
        }
    }
}
