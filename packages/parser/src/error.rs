use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// Every position is a byte offset into the original source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unclosed '{delimiter}' at {pos}")]
    UnclosedDelimiter { pos: usize, delimiter: char },

    #[error("Unmatched '{delimiter}' at {pos}")]
    UnmatchedDelimiter { pos: usize, delimiter: char },

    #[error("Widget <{name}> opened at {pos} is never closed")]
    UnclosedWidget { pos: usize, name: String },

    #[error("Unexpected closing tag </{name}> at {pos}")]
    UnexpectedClosingTag { pos: usize, name: String },

    #[error("Unterminated string at {pos}")]
    UnterminatedString { pos: usize },

    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input at {pos}")]
    UnexpectedEof { pos: usize },

    #[error("Invalid syntax at {pos}: {message}")]
    InvalidSyntax { pos: usize, message: String },

    #[error("Invalid metadata at {pos}: {message}")]
    InvalidMetadata { pos: usize, message: String },
}

impl ParseError {
    pub fn unexpected_token(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize) -> Self {
        Self::UnexpectedEof { pos }
    }

    pub fn invalid_syntax(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            pos,
            message: message.into(),
        }
    }

    pub fn invalid_metadata(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            pos,
            message: message.into(),
        }
    }

    pub fn pos(&self) -> usize {
        match self {
            Self::UnclosedDelimiter { pos, .. }
            | Self::UnmatchedDelimiter { pos, .. }
            | Self::UnclosedWidget { pos, .. }
            | Self::UnexpectedClosingTag { pos, .. }
            | Self::UnterminatedString { pos }
            | Self::UnexpectedToken { pos, .. }
            | Self::UnexpectedEof { pos }
            | Self::InvalidSyntax { pos, .. }
            | Self::InvalidMetadata { pos, .. } => *pos,
        }
    }

    /// Re-base the position (errors found in a nested region)
    pub(crate) fn map_pos(self, f: impl Fn(usize) -> usize) -> Self {
        match self {
            Self::UnclosedDelimiter { pos, delimiter } => Self::UnclosedDelimiter { pos: f(pos), delimiter },
            Self::UnmatchedDelimiter { pos, delimiter } => Self::UnmatchedDelimiter { pos: f(pos), delimiter },
            Self::UnclosedWidget { pos, name } => Self::UnclosedWidget { pos: f(pos), name },
            Self::UnexpectedClosingTag { pos, name } => Self::UnexpectedClosingTag { pos: f(pos), name },
            Self::UnterminatedString { pos } => Self::UnterminatedString { pos: f(pos) },
            Self::UnexpectedToken { pos, expected, found } => Self::UnexpectedToken {
                pos: f(pos),
                expected,
                found,
            },
            Self::UnexpectedEof { pos } => Self::UnexpectedEof { pos: f(pos) },
            Self::InvalidSyntax { pos, message } => Self::InvalidSyntax { pos: f(pos), message },
            Self::InvalidMetadata { pos, message } => Self::InvalidMetadata { pos: f(pos), message },
        }
    }

    /// Short label for the offending source range
    pub fn label(&self) -> String {
        match self {
            Self::UnclosedDelimiter { delimiter, .. } => format!("'{}' opened here", delimiter),
            Self::UnmatchedDelimiter { delimiter, .. } => format!("no opening for '{}'", delimiter),
            Self::UnclosedWidget { name, .. } => format!("missing </{}>", name),
            Self::UnexpectedClosingTag { .. } => "nothing to close".to_string(),
            Self::UnterminatedString { .. } => "string starts here".to_string(),
            Self::UnexpectedToken { expected, .. } => format!("expected {}", expected),
            Self::UnexpectedEof { .. } => "input ends here".to_string(),
            Self::InvalidSyntax { message, .. } | Self::InvalidMetadata { message, .. } => message.clone(),
        }
    }

    pub fn location(&self, source: &str) -> Location {
        Location::from_offset(source, self.pos())
    }
}

/// 1-based line/column of a byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Location {
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;

        Self { line, column, offset }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Pretty-print an error with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn format_error(source: &str, filename: &str, error: &ParseError) -> String {
    format_message(source, filename, error.pos(), &error.to_string(), &error.label())
}

/// Pretty-print any message anchored at a byte offset
#[cfg(feature = "pretty-errors")]
pub fn format_message(source: &str, filename: &str, pos: usize, message: &str, label: &str) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let mut output = Vec::new();
    // ariadne works in char offsets
    let start = source[..pos.min(source.len())].chars().count();
    let end = start + 1;

    let report = Report::build(ReportKind::Error, filename, start)
        .with_message(message)
        .with_label(
            Label::new((filename, start..end))
                .with_color(Color::Red)
                .with_message(label),
        )
        .finish();

    if report.write((filename, Source::from(source)), &mut output).is_err() {
        return format!("{}: {}", filename, message);
    }

    String::from_utf8(output).unwrap_or_else(|_| "Error formatting failed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_offset() {
        let source = "first\nsecond line\nthird";
        let loc = Location::from_offset(source, 13);
        assert_eq!(loc.line, 2);
        assert_eq!(loc.column, 8);
        assert_eq!(loc.to_string(), "2:8");
    }

    #[test]
    fn test_location_clamps_past_end() {
        let loc = Location::from_offset("ab", 99);
        assert_eq!(loc.line, 1);
        assert_eq!(loc.column, 3);
    }

    #[test]
    fn test_error_position() {
        let err = ParseError::UnclosedDelimiter { pos: 4, delimiter: '{' };
        assert_eq!(err.pos(), 4);
        assert_eq!(err.to_string(), "Unclosed '{' at 4");
    }
}
