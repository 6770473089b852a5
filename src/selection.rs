use std::collections::BTreeSet;

/// The set of page indices chosen for export.
///
/// Membership is not checked against the document here; the extractor
/// rejects out-of-range indices at export time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pages: BTreeSet<usize>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `index` if absent, remove it if present. Returns whether it is
    /// selected afterwards.
    pub fn toggle(&mut self, index: usize) -> bool {
        if self.pages.remove(&index) {
            false
        } else {
            self.pages.insert(index);
            true
        }
    }

    pub fn select_all(&mut self, total: usize) {
        self.pages = (0..total).collect();
    }

    /// Select everything, or clear when everything is already selected.
    pub fn toggle_all(&mut self, total: usize) {
        if total > 0 && (0..total).all(|i| self.pages.contains(&i)) {
            self.clear();
        } else {
            self.select_all(total);
        }
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }

    /// Replace the whole membership, e.g. with query suggestions.
    pub fn replace<I: IntoIterator<Item = usize>>(&mut self, indices: I) {
        self.pages = indices.into_iter().collect();
    }

    pub fn contains(&self, index: usize) -> bool {
        self.pages.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Selected indices in ascending order, the order used for export.
    pub fn indices(&self) -> Vec<usize> {
        self.pages.iter().copied().collect()
    }
}
