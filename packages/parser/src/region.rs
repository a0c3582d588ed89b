//! Block content with container prefixes removed.
//!
//! Block quotes and list items strip their markers and indentation before the
//! inner blocks are parsed. A [`Region`] holds that stripped text together with
//! a map back to byte offsets in the original source, so every span and error
//! position reported by the parser points into the author's text.

use crate::ast::Span;

/// A line inside a region: `start..end` excludes the line terminator,
/// `next` is the offset of the following line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    pub start: usize,
    pub end: usize,
    pub next: usize,
}

/// Split text into lines, accepting `\n` and `\r\n` terminators
pub fn split_lines(text: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();

    while start < text.len() {
        let (end, next) = match text[start..].find('\n') {
            Some(rel) => {
                let nl = start + rel;
                let end = if nl > start && bytes[nl - 1] == b'\r' { nl - 1 } else { nl };
                (end, nl + 1)
            }
            None => (text.len(), text.len()),
        };
        lines.push(Line { start, end, next });
        start = next;
    }

    lines
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    local: usize,
    source: usize,
}

/// Text of a nested block container plus its mapping to source offsets
#[derive(Debug, Clone)]
pub struct Region {
    pub text: String,
    segments: Vec<Segment>,
    source_end: usize,
}

impl Region {
    /// The whole document: identity mapping
    pub fn root(source: &str) -> Self {
        Self {
            text: source.to_string(),
            segments: vec![Segment { local: 0, source: 0 }],
            source_end: source.len(),
        }
    }

    /// Build a region from pieces of this region's text, each given as a local
    /// byte range. Pieces are joined with `\n`.
    pub fn from_pieces(&self, pieces: &[(usize, usize)]) -> Self {
        let mut text = String::new();
        let mut segments = Vec::with_capacity(pieces.len());
        let mut source_end = self.to_source(pieces.last().map(|p| p.1).unwrap_or(0));

        for (i, &(start, end)) in pieces.iter().enumerate() {
            if i > 0 {
                text.push('\n');
            }
            segments.push(Segment {
                local: text.len(),
                source: self.to_source(start),
            });
            text.push_str(&self.text[start..end]);
            source_end = self.to_source(end);
        }

        if segments.is_empty() {
            segments.push(Segment { local: 0, source: source_end });
        }

        Self {
            text,
            segments,
            source_end,
        }
    }

    /// A contiguous sub-range of this region
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let mut segments: Vec<Segment> = self
            .segments
            .iter()
            .filter(|s| s.local > start && s.local < end)
            .map(|s| Segment {
                local: s.local - start,
                source: s.source,
            })
            .collect();
        segments.insert(
            0,
            Segment {
                local: 0,
                source: self.to_source(start),
            },
        );

        Self {
            text: self.text[start..end].to_string(),
            segments,
            source_end: self.to_source(end),
        }
    }

    /// Map a local byte offset to an offset in the original source
    pub fn to_source(&self, local: usize) -> usize {
        if local >= self.text.len() {
            return self.source_end;
        }
        let idx = self.segments.partition_point(|s| s.local <= local);
        match idx.checked_sub(1).and_then(|i| self.segments.get(i)) {
            Some(seg) => seg.source + (local - seg.local),
            None => local,
        }
    }

    /// Map a local range to a source span
    pub fn span(&self, start: usize, end: usize) -> Span {
        let source_start = self.to_source(start);
        let source_end = if end > start {
            self.to_source(end - 1) + self.char_len_at(end - 1)
        } else {
            source_start
        };
        Span::new(source_start, source_end.max(source_start))
    }

    fn char_len_at(&self, local: usize) -> usize {
        let mut idx = local;
        while idx > 0 && !self.text.is_char_boundary(idx) {
            idx -= 1;
        }
        self.text[idx..].chars().next().map(char::len_utf8).unwrap_or(1)
    }

    pub fn lines(&self) -> Vec<Line> {
        split_lines(&self.text)
    }
}
