use lopdf::Document;

/// Extract the text runs of one page (1-indexed) in content-stream order,
/// joined by single spaces. No layout is reconstructed.
pub fn page_text(doc: &Document, page_number: u32) -> Result<String, lopdf::Error> {
    let raw = doc.extract_text(&[page_number])?;
    Ok(join_runs(&raw))
}

fn join_runs(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
