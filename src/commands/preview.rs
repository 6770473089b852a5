use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::pdf::{Document, PageRenderer};

use super::read_input;

const EXCERPT_CHARS: usize = 100;

#[derive(Serialize)]
struct PageManifest<'a> {
    index: usize,
    width: u32,
    height: u32,
    thumbnail: String,
    text: &'a str,
}

#[derive(Serialize)]
struct Manifest<'a> {
    name: &'a str,
    size_bytes: usize,
    page_count: usize,
    pages: Vec<PageManifest<'a>>,
}

pub async fn run(
    path: &Path,
    renderer: &PageRenderer,
    thumbnails: Option<&Path>,
    json: bool,
) -> Result<()> {
    let (name, bytes) = read_input(path)?;
    let doc = renderer
        .ingest(name, bytes)
        .await
        .with_context(|| format!("Failed to process {}", path.display()))?;

    if let Some(dir) = thumbnails {
        write_thumbnails(&doc, dir)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&manifest(&doc))?);
        return Ok(());
    }

    for page in doc.pages() {
        println!(
            "p{} ({}x{}): {}",
            page.index + 1,
            page.thumbnail.width,
            page.thumbnail.height,
            excerpt(&page.text)
        );
    }
    println!("\n{} page(s) in {}", doc.page_count(), doc.name());

    Ok(())
}

fn manifest(doc: &Document) -> Manifest<'_> {
    Manifest {
        name: doc.name(),
        size_bytes: doc.size_bytes(),
        page_count: doc.page_count(),
        pages: doc
            .pages()
            .iter()
            .map(|page| PageManifest {
                index: page.index,
                width: page.thumbnail.width,
                height: page.thumbnail.height,
                thumbnail: page.thumbnail.data_uri(),
                text: &page.text,
            })
            .collect(),
    }
}

fn write_thumbnails(doc: &Document, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    for page in doc.pages() {
        let path = dir.join(format!("page_{:04}.jpg", page.index + 1));
        std::fs::write(&path, &page.thumbnail.jpeg)
            .with_context(|| format!("Failed to write thumbnail: {}", path.display()))?;
    }
    tracing::info!(count = doc.pages().len(), dir = %dir.display(), "wrote thumbnails");
    Ok(())
}

fn excerpt(text: &str) -> String {
    if text.is_empty() {
        return "(no text)".to_string();
    }
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((byte, _)) => format!("{}...", &text[..byte]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures;
    use crate::pdf::render::tests::stub_renderer;
    use crate::pdf::RenderPipeline;

    #[tokio::test]
    async fn writes_one_thumbnail_per_page() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("doc.pdf");
        std::fs::write(&input, fixtures::sample_pdf(3)).unwrap();
        let out = dir.path().join("thumbs");

        let renderer = stub_renderer(RenderPipeline::Sequential);
        run(&input, &renderer, Some(&out), false).await.unwrap();

        for n in 1..=3 {
            let jpeg = std::fs::read(out.join(format!("page_{n:04}.jpg"))).unwrap();
            assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        }
        assert!(!out.join("page_0004.jpg").exists());
    }

    #[tokio::test]
    async fn manifest_lists_pages_in_order() {
        let renderer = stub_renderer(RenderPipeline::Sequential);
        let doc = renderer.ingest("m.pdf", fixtures::sample_pdf(2)).await.unwrap();
        let value = serde_json::to_value(manifest(&doc)).unwrap();

        assert_eq!(value["page_count"], 2);
        assert_eq!(value["pages"][1]["index"], 1);
        assert_eq!(value["pages"][1]["text"], "Page 2");
        assert!(value["pages"][0]["thumbnail"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn excerpts_are_shortened() {
        let long = "x".repeat(250);
        assert_eq!(excerpt(&long).len(), EXCERPT_CHARS + 3);
        assert_eq!(excerpt(""), "(no text)");
        assert_eq!(excerpt("short"), "short");
    }
}
