use lopdf::{Document, Object, ObjectId};
use std::collections::HashSet;
use tracing::debug;

use super::document::page_ids;
use super::error::ExtractError;

/// Attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Catalog entries that point into the old page tree.
const STALE_CATALOG_KEYS: [&[u8]; 8] = [
    b"Outlines",
    b"PageLabels",
    b"OpenAction",
    b"StructTreeRoot",
    b"MarkInfo",
    b"Names",
    b"Dests",
    b"AcroForm",
];

/// Build a standalone PDF holding exactly the pages at `indices` (zero-based),
/// in the order given. Page objects are copied as-is; nothing is re-rendered.
pub fn extract_pages(source: &[u8], indices: &[usize]) -> Result<Vec<u8>, ExtractError> {
    if indices.is_empty() {
        return Err(ExtractError::Empty);
    }

    let mut doc = Document::load_mem(source).map_err(ExtractError::Parse)?;
    let all_pages = page_ids(&doc);
    let page_count = all_pages.len();

    let mut seen = HashSet::with_capacity(indices.len());
    for &index in indices {
        if index >= page_count {
            return Err(ExtractError::OutOfRange { index, page_count });
        }
        if !seen.insert(index) {
            return Err(ExtractError::Duplicate { index });
        }
    }

    let selected: Vec<ObjectId> = indices.iter().map(|&i| all_pages[i].1).collect();
    let dropped: HashSet<ObjectId> = all_pages
        .iter()
        .map(|&(_, id)| id)
        .filter(|id| !selected.contains(id))
        .collect();
    let root_pages = root_pages_id(&doc)?;

    // Flatten the tree: every kept page hangs directly off the root node,
    // so anything it inherited has to move onto the page itself.
    for &page_id in &selected {
        push_down_inherited(&mut doc, page_id)?;
        let page = doc.get_dictionary_mut(page_id).map_err(structure)?;
        page.set("Parent", root_pages);
        page.remove(b"StructParents");
    }

    let root = doc.get_dictionary_mut(root_pages).map_err(structure)?;
    root.set(
        "Kids",
        selected
            .iter()
            .map(|&id| Object::Reference(id))
            .collect::<Vec<_>>(),
    );
    root.set("Count", selected.len() as i64);

    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(structure)?;
    let catalog = doc.get_dictionary_mut(catalog_id).map_err(structure)?;
    for key in STALE_CATALOG_KEYS {
        catalog.remove(key);
    }

    // Links and annotations on kept pages may still point at dropped ones.
    for object in doc.objects.values_mut() {
        unlink(object, &dropped);
    }

    let pruned = doc.prune_objects();
    doc.renumber_objects();
    debug!(
        kept = selected.len(),
        of = page_count,
        pruned = pruned.len(),
        "assembled extracted document"
    );

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|err| ExtractError::Write(err.to_string()))?;
    Ok(out)
}

fn root_pages_id(doc: &Document) -> Result<ObjectId, ExtractError> {
    doc.catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(structure)
}

fn push_down_inherited(doc: &mut Document, page_id: ObjectId) -> Result<(), ExtractError> {
    let mut inherited = Vec::new();
    {
        let page = doc.get_dictionary(page_id).map_err(structure)?;
        let mut missing: Vec<&[u8]> = INHERITABLE
            .iter()
            .copied()
            .filter(|key| !page.has(key))
            .collect();
        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        let mut visited = HashSet::new();

        while let Some(node_id) = parent {
            if missing.is_empty() || !visited.insert(node_id) {
                break;
            }
            let node = doc.get_dictionary(node_id).map_err(structure)?;
            missing.retain(|key| match node.get(key) {
                Ok(value) => {
                    inherited.push((key.to_vec(), value.clone()));
                    false
                }
                Err(_) => true,
            });
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        }
    }

    let page = doc.get_dictionary_mut(page_id).map_err(structure)?;
    for (key, value) in inherited {
        page.set(key, value);
    }
    Ok(())
}

/// Replace every reference to a page in `dropped` with null.
fn unlink(object: &mut Object, dropped: &HashSet<ObjectId>) {
    match object {
        Object::Reference(id) => {
            if dropped.contains(id) {
                *object = Object::Null;
            }
        }
        Object::Array(items) => {
            for item in items {
                unlink(item, dropped);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                unlink(value, dropped);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                unlink(value, dropped);
            }
        }
        _ => {}
    }
}

fn structure(err: lopdf::Error) -> ExtractError {
    ExtractError::Structure(err.to_string())
}
