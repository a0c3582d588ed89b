//! The live source buffer owned by one editing session

use serde::{Deserialize, Serialize};

/// A selected byte range. `start <= end` always holds; a collapsed range is
/// a plain cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub fn cursor(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Pull both ends inside `text` and back onto char boundaries
    pub fn clamp(self, text: &str) -> Self {
        Self::new(floor_boundary(text, self.start), floor_boundary(text, self.end))
    }
}

fn floor_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Text buffer plus selection and the last saved baseline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    text: String,
    selection: Selection,
    baseline: String,
    version: u64,
}

impl SourceDocument {
    /// A document whose baseline is `text`, i.e. freshly loaded and clean
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            selection: Selection::cursor(0),
            baseline: text.clone(),
            text,
            version: 0,
        }
    }

    /// A document that has never been saved
    pub fn unsaved(text: impl Into<String>) -> Self {
        Self {
            baseline: String::new(),
            ..Self::new(text)
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn selected_text(&self) -> &str {
        &self.text[self.selection.start..self.selection.end]
    }

    /// Bumped on every text change
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_dirty(&self) -> bool {
        self.text != self.baseline
    }

    pub fn mark_saved(&mut self) {
        self.baseline = self.text.clone();
    }

    /// Replace the whole buffer. Returns false when the text is unchanged.
    pub fn replace(&mut self, text: impl Into<String>, selection: Selection) -> bool {
        let text = text.into();
        let changed = text != self.text;
        if changed {
            self.text = text;
            self.version += 1;
        }
        self.selection = selection.clamp(&self.text);
        changed
    }

    pub fn select(&mut self, selection: Selection) {
        self.selection = selection.clamp(&self.text);
    }
}
