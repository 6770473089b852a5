//! In-memory PDFs for tests. Every page draws the text `Page N` (1-based).

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

/// A flat page tree with `pages` pages. Resources and MediaBox live on the
/// root `Pages` node and are inherited.
pub fn sample_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let resources_id = add_font_resources(&mut doc);

    let kids: Vec<Object> = (1..=pages)
        .map(|n| add_page(&mut doc, pages_id, n).into())
        .collect();

    let root = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(root));
    finish(doc, pages_id)
}

/// Pages split across two intermediate `Pages` nodes; resources are
/// declared on the intermediate nodes, MediaBox on the root.
pub fn nested_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let root_id = doc.new_object_id();
    let resources_id = add_font_resources(&mut doc);

    let split = pages / 2;
    let mut branches = Vec::new();
    for range in [1..=split, split + 1..=pages] {
        let branch_id = doc.new_object_id();
        let kids: Vec<Object> = range
            .clone()
            .map(|n| add_page(&mut doc, branch_id, n).into())
            .collect();
        let count = kids.len() as i64;
        let branch = dictionary! {
            "Type" => "Pages",
            "Parent" => root_id,
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
        };
        doc.objects.insert(branch_id, Object::Dictionary(branch));
        branches.push(branch_id.into());
    }

    let root = dictionary! {
        "Type" => "Pages",
        "Kids" => branches,
        "Count" => pages as i64,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(root_id, Object::Dictionary(root));
    finish(doc, root_id)
}

/// One page drawn with a composite `Identity-H` font that has no `ToUnicode`
/// map, so its glyph codes cannot be turned back into text.
pub fn identity_h_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let descendant = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => "NotoSans",
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
    });
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => "NotoSans",
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![descendant.into()],
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(vec![0, 1, 0, 2], StringFormat::Hexadecimal)],
            ),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("fixture content encodes"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    finish(doc, pages_id)
}

fn add_font_resources(doc: &mut Document) -> ObjectId {
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    })
}

fn add_page(doc: &mut Document, parent: ObjectId, number: usize) -> ObjectId {
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(format!("Page {number}"))]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("fixture content encodes"),
    ));
    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => parent,
        "Contents" => content_id,
    })
}

fn finish(mut doc: Document, pages_id: ObjectId) -> Vec<u8> {
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Sample Document"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("fixture saves");
    out
}

/// The `Page N` marker drawn on a page of a loaded document.
pub fn page_marker(doc: &Document, page_id: ObjectId) -> String {
    let content = doc.get_page_content(page_id).expect("page content");
    let text = String::from_utf8_lossy(&content);
    let start = text.find("(Page ").expect("page marker present") + 1;
    let end = start + text[start..].find(')').expect("closing paren");
    text[start..end].to_string()
}
