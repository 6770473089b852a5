use lopdf::{Object, ObjectId};
use std::sync::Arc;
use tracing::debug;

use super::error::LoadError;
use super::render::Thumbnail;

/// A loaded PDF held entirely in memory.
///
/// Created empty by [`Document::load`]; the page list is filled once by the
/// renderer and never reordered afterwards.
#[derive(Debug)]
pub struct Document {
    name: String,
    raw_bytes: Arc<[u8]>,
    source: Arc<lopdf::Document>,
    page_count: usize,
    info: PdfInfo,
    pages: Vec<Page>,
}

/// One page as shown to the user.
#[derive(Debug, Clone)]
pub struct Page {
    /// Zero-based physical position in the source document.
    pub index: usize,
    pub thumbnail: Thumbnail,
    /// Text runs in content order, joined with single spaces.
    pub text: String,
}

impl Document {
    pub fn load(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Result<Self, LoadError> {
        let name = name.into();
        let raw_bytes: Arc<[u8]> = bytes.into();

        let source = lopdf::Document::load_mem(&raw_bytes)?;
        let page_count = source.get_pages().len();
        if page_count == 0 {
            return Err(LoadError::Empty);
        }

        let info = read_info(&source);
        debug!(%name, size = raw_bytes.len(), page_count, "parsed document");

        Ok(Document {
            name,
            raw_bytes,
            source: Arc::new(source),
            page_count,
            info,
            pages: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> usize {
        self.raw_bytes.len()
    }

    /// The complete original file, kept for re-extraction on export.
    pub fn raw_bytes(&self) -> &Arc<[u8]> {
        &self.raw_bytes
    }

    pub(crate) fn source(&self) -> &Arc<lopdf::Document> {
        &self.source
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn info(&self) -> &PdfInfo {
        &self.info
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub(crate) fn set_pages(&mut self, pages: Vec<Page>) {
        debug_assert!(pages.iter().enumerate().all(|(i, p)| p.index == i));
        self.pages = pages;
    }
}

/// 1-indexed page object IDs, in physical order
pub(crate) fn page_ids(doc: &lopdf::Document) -> Vec<(u32, ObjectId)> {
    let mut pages: Vec<_> = doc.get_pages().into_iter().collect();
    pages.sort_by_key(|(num, _)| *num);
    pages
}

/// Metadata from the document info dictionary
#[derive(Debug, Default, Clone)]
pub struct PdfInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub mod_date: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
}

fn read_info(doc: &lopdf::Document) -> PdfInfo {
    let mut info = PdfInfo::default();

    let dict = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(info_ref)) => doc.get_dictionary(*info_ref).ok(),
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };

    if let Some(dict) = dict {
        info.title = get_string_from_dict(dict, b"Title");
        info.author = get_string_from_dict(dict, b"Author");
        info.creator = get_string_from_dict(dict, b"Creator");
        info.producer = get_string_from_dict(dict, b"Producer");
        info.creation_date = get_string_from_dict(dict, b"CreationDate");
        info.mod_date = get_string_from_dict(dict, b"ModDate");
        info.subject = get_string_from_dict(dict, b"Subject");
        info.keywords = get_string_from_dict(dict, b"Keywords");
    }

    info
}

fn get_string_from_dict(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key).ok().and_then(|obj| match obj {
        Object::String(bytes, _) => decode_pdf_string(bytes),
        _ => None,
    })
}

fn decode_pdf_string(bytes: &[u8]) -> Option<String> {
    if let [0xFE, 0xFF, rest @ ..] = bytes {
        // UTF-16 BE
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units).ok()
    } else {
        // PDFDocEncoding, approximated as Latin-1
        Some(bytes.iter().map(|&b| b as char).collect())
    }
}
