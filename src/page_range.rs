use anyhow::{anyhow, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRange {
    pub start: PageRef,
    pub end: Option<PageRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRef {
    Number(u32),
    End,
}

impl PageRange {
    /// Parse a page range specification like "1-5", "9-6", "1-end", "7"
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow!("Empty page range"));
        }

        match s.split_once('-') {
            // "-5" is not a range
            Some(("", _)) => Err(anyhow!("Invalid page range: {}", s)),
            Some((start, end)) => Ok(PageRange {
                start: parse_page_ref(start)?,
                end: Some(parse_page_ref(end)?),
            }),
            None => Ok(PageRange {
                start: parse_page_ref(s)?,
                end: None,
            }),
        }
    }

    /// Expand this range into 1-based page numbers
    pub fn expand(&self, total_pages: u32) -> Result<Vec<u32>> {
        let resolve = |r: &PageRef| match r {
            PageRef::Number(n) => *n,
            PageRef::End => total_pages,
        };
        let start = resolve(&self.start);
        let end = self.end.as_ref().map(resolve).unwrap_or(start);

        if start == 0 || end == 0 {
            return Err(anyhow!("Page numbers must be >= 1"));
        }
        for page in [start, end] {
            if page > total_pages {
                return Err(anyhow!(
                    "Page {} exceeds total pages {}",
                    page,
                    total_pages
                ));
            }
        }

        let pages: Vec<u32> = if start <= end {
            (start..=end).collect()
        } else {
            (end..=start).rev().collect()
        };

        Ok(pages)
    }
}

fn parse_page_ref(s: &str) -> Result<PageRef> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("end") {
        Ok(PageRef::End)
    } else {
        s.parse::<u32>()
            .map(PageRef::Number)
            .map_err(|_| anyhow!("Invalid page number: {}", s))
    }
}

/// Parse a comma-separated list of page ranges like "1-5,10,15-end"
pub fn parse_page_ranges(s: &str) -> Result<Vec<PageRange>> {
    s.split(',')
        .map(|part| PageRange::parse(part.trim()))
        .collect()
}

/// Expand a page range string into zero-based page indices, in the order written
pub fn expand_page_ranges(s: &str, total_pages: usize) -> Result<Vec<usize>> {
    let total = u32::try_from(total_pages).map_err(|_| anyhow!("Document is too large"))?;
    let mut indices = Vec::new();
    for range in parse_page_ranges(s)? {
        indices.extend(range.expand(total)?.into_iter().map(|p| p as usize - 1));
    }
    Ok(indices)
}
