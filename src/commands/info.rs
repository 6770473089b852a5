use crate::pdf::Document;
use anyhow::{Context, Result};
use std::path::Path;

use super::read_input;

pub fn run<P: AsRef<Path>>(path: P) -> Result<()> {
    let (name, bytes) = read_input(path.as_ref())?;
    let doc = Document::load(name, bytes)
        .with_context(|| format!("Failed to process {}", path.as_ref().display()))?;
    let info = doc.info();

    println!("File: {}", doc.name());
    println!("Size: {}", format_size(doc.size_bytes()));
    println!("Pages: {}", doc.page_count());

    if let Some(title) = &info.title {
        println!("Title: {}", title);
    }
    if let Some(author) = &info.author {
        println!("Author: {}", author);
    }
    if let Some(subject) = &info.subject {
        println!("Subject: {}", subject);
    }
    if let Some(keywords) = &info.keywords {
        println!("Keywords: {}", keywords);
    }
    if let Some(creator) = &info.creator {
        println!("Creator: {}", creator);
    }
    if let Some(producer) = &info.producer {
        println!("Producer: {}", producer);
    }
    if let Some(creation_date) = &info.creation_date {
        println!("Created: {}", format_pdf_date(creation_date));
    }
    if let Some(mod_date) = &info.mod_date {
        println!("Modified: {}", format_pdf_date(mod_date));
    }

    Ok(())
}

fn format_size(bytes: usize) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} bytes", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = "bytes";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{:.1} {}", value, unit)
}

fn format_pdf_date(date: &str) -> String {
    // PDF date format: D:YYYYMMDDHHmmSSOHH'mm
    let Some(d) = date.strip_prefix("D:") else {
        return date.to_string();
    };
    if d.len() < 8 || !d.is_ascii() {
        return date.to_string();
    }
    let time = if d.len() >= 14 {
        format!(" {}:{}:{}", &d[8..10], &d[10..12], &d[12..14])
    } else {
        String::new()
    };
    format!("{}-{}-{}{}", &d[0..4], &d[4..6], &d[6..8], time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_pdf_dates() {
        assert_eq!(format_pdf_date("D:20240131093000+01'00"), "2024-01-31 09:30:00");
        assert_eq!(format_pdf_date("D:20240131"), "2024-01-31");
        assert_eq!(format_pdf_date("yesterday"), "yesterday");
        assert_eq!(format_pdf_date("D:202\u{e9}5678"), "D:202\u{e9}5678");
        assert_eq!(format_pdf_date("D:2024013109\u{e9}00"), "D:2024013109\u{e9}00");
    }

    #[test]
    fn formats_sizes() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
