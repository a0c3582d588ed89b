//! Declaration handling ahead of compilation.
//!
//! Authors may start a document with metadata (YAML front matter or an
//! `export const meta = {...}` literal) and import-style lines. Neither is
//! renderable: [`strip`] blanks them out before the text reaches the
//! compiler and [`extract_metadata`] reads the metadata on its own.

use crate::ast::{Metadata, MetadataFormat, Span};
use crate::blocks::{scan_declarations, Declaration, DeclarationKind};
use crate::error::{ParseError, ParseResult};
use std::collections::BTreeMap;

/// Remove metadata and import declarations. Removed text is blanked out
/// rather than cut, so byte offsets and line numbers in the stripped text
/// match the raw text. Text without declarations is returned unchanged.
pub fn strip(raw: &str) -> String {
    let declarations = scan_declarations(raw);
    if declarations.is_empty() {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut cursor = 0;

    for decl in &declarations {
        out.push_str(&raw[cursor..decl.span.start]);
        let removed = &raw[decl.span.start..decl.span.end];
        for c in removed.chars() {
            match c {
                '\n' | '\r' => out.push(c),
                other => out.extend(std::iter::repeat(' ').take(other.len_utf8())),
            }
        }
        cursor = decl.span.end;
    }
    out.push_str(&raw[cursor..]);

    out
}

/// Read the leading metadata declaration, if any
pub fn extract_metadata(raw: &str) -> ParseResult<Option<Metadata>> {
    scan_declarations(raw)
        .iter()
        .find(|d| matches!(d.kind, DeclarationKind::FrontMatter | DeclarationKind::ExportMeta))
        .map(|decl| parse_metadata(raw, decl))
        .transpose()
}

/// Parse the fields of one metadata declaration
pub(crate) fn parse_metadata(source: &str, decl: &Declaration) -> ParseResult<Metadata> {
    let text = &source[decl.span.start..decl.span.end];

    let (format, value) = match decl.kind {
        DeclarationKind::FrontMatter => {
            let body = front_matter_body(text);
            let value: serde_json::Value = if body.trim().is_empty() {
                serde_json::Value::Null
            } else {
                serde_yaml::from_str(body).map_err(|e| ParseError::invalid_metadata(decl.span.start, e.to_string()))?
            };
            (MetadataFormat::FrontMatter, value)
        }
        DeclarationKind::ExportMeta => {
            let literal = text
                .find('{')
                .map(|open| text[open..].trim_end().trim_end_matches(';'))
                .unwrap_or_default();
            // JSON first; YAML flow syntax also accepts unquoted keys
            let value: serde_json::Value = serde_json::from_str(literal)
                .or_else(|_| serde_yaml::from_str(literal))
                .map_err(|e| ParseError::invalid_metadata(decl.span.start, e.to_string()))?;
            (MetadataFormat::Export, value)
        }
        DeclarationKind::Import => {
            return Err(ParseError::invalid_metadata(decl.span.start, "import is not metadata"));
        }
    };

    let fields = match value {
        serde_json::Value::Null => BTreeMap::new(),
        serde_json::Value::Object(map) => map.into_iter().collect(),
        other => {
            return Err(ParseError::invalid_metadata(
                decl.span.start,
                format!("expected key/value pairs, found {}", kind_name(&other)),
            ));
        }
    };

    Ok(Metadata {
        format,
        fields,
        span: Span::new(decl.span.start, decl.span.end),
    })
}

/// Lines between the opening and closing `---`
fn front_matter_body(text: &str) -> &str {
    let after_open = text.find('\n').map(|i| i + 1).unwrap_or(text.len());
    let before_close = text.rfind('\n').unwrap_or(after_open).max(after_open);
    &text[after_open..before_close]
}

fn kind_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}
