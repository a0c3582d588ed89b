//! Line-level recognisers shared by the parser and the preprocessor.
//!
//! Nothing here builds AST nodes. These functions answer "what kind of line is
//! this" and "where does this construct end" so that the parser and
//! [`crate::preprocess`] agree on which regions are code fences, widget bodies
//! and top-level declarations.

use crate::ast::{Prop, PropValue, Span};
use crate::error::{ParseError, ParseResult};
use crate::region::split_lines;
use crate::tokenizer::{unquote, TagToken};
use logos::Logos;

/// Opening line of a fenced code block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fence {
    pub marker: char,
    pub len: usize,
    pub indent: usize,
    pub info: Option<String>,
}

/// Recognise a fence opener (up to three spaces of indentation)
pub fn fence_open(line: &str) -> Option<Fence> {
    let indent = leading_spaces(line);
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let marker = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = rest.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }
    let info = rest[len..].trim();
    if marker == '`' && info.contains('`') {
        return None;
    }

    Some(Fence {
        marker,
        len,
        indent,
        info: (!info.is_empty()).then(|| info.to_string()),
    })
}

/// Whether `line` closes a fence opened by `fence`
pub fn fence_close(line: &str, fence: &Fence) -> bool {
    let trimmed = line.trim_start();
    if leading_spaces(line) > 3 {
        return false;
    }
    let len = trimmed.chars().take_while(|c| *c == fence.marker).count();
    len >= fence.len && trimmed[len..].trim().is_empty()
}

/// ATX heading: level and the content range relative to `line`
pub fn heading(line: &str) -> Option<(u8, usize, usize)> {
    let indent = leading_spaces(line);
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let level = rest.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let after = &rest[level..];
    if !after.is_empty() && !after.starts_with(' ') && !after.starts_with('\t') {
        return None;
    }

    let mut content = after.trim();
    // Optional closing sequence: `## Title ##`
    let without_hashes = content.trim_end_matches('#');
    if without_hashes.is_empty() || without_hashes.ends_with(' ') {
        content = without_hashes.trim_end();
    }

    let start = if content.is_empty() {
        line.len()
    } else {
        indent + level + (after.len() - after.trim_start().len())
    };
    Some((level as u8, start, start + content.len()))
}

/// A line of three or more `-`, `*` or `_` (spaces allowed between)
pub fn thematic_break(line: &str) -> bool {
    if leading_spaces(line) > 3 {
        return false;
    }
    let chars: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    match chars.first() {
        Some(&c @ ('-' | '*' | '_')) => chars.len() >= 3 && chars.iter().all(|x| *x == c),
        _ => false,
    }
}

/// Block quote marker: byte length of `>` plus one optional space
pub fn quote_marker(line: &str) -> Option<usize> {
    let indent = leading_spaces(line);
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    if !rest.starts_with('>') {
        return None;
    }
    let extra = usize::from(rest[1..].starts_with(' '));
    Some(indent + 1 + extra)
}

/// List item marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMarker {
    pub ordered: bool,
    pub number: Option<u64>,
    /// Column where the item content starts
    pub content_offset: usize,
}

pub fn list_marker(line: &str) -> Option<ListMarker> {
    let indent = leading_spaces(line);
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];

    let (ordered, number, marker_len) = if rest.starts_with(['-', '*', '+']) {
        (false, None, 1)
    } else {
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 || digits > 9 || !rest[digits..].starts_with(['.', ')']) {
            return None;
        }
        (true, rest[..digits].parse().ok(), digits + 1)
    };

    let after = &rest[marker_len..];
    if after.is_empty() {
        return Some(ListMarker {
            ordered,
            number,
            content_offset: line.len(),
        });
    }
    if !after.starts_with(' ') && !after.starts_with('\t') {
        return None;
    }
    let spaces = leading_spaces(after).clamp(1, 4);

    Some(ListMarker {
        ordered,
        number,
        content_offset: indent + marker_len + spaces,
    })
}

/// A line that starts a block widget: `<` + uppercase letter
pub fn widget_start(line: &str) -> bool {
    let indent = leading_spaces(line);
    if indent > 3 {
        return false;
    }
    let mut chars = line[indent..].chars();
    chars.next() == Some('<') && chars.next().is_some_and(|c| c.is_ascii_uppercase())
}

pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

pub fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

/// Scan a `{ ... }` expression starting at the `{` at `open`. Returns the
/// offset just past the matching `}`. String literals are skipped so braces
/// inside quotes do not count.
pub fn scan_expression(text: &str, open: usize) -> ParseResult<usize> {
    let mut depth = 0usize;
    let mut chars = text[open..].char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(open + i + 1);
                }
            }
            '"' | '\'' | '`' => {
                let quote = c;
                let mut closed = false;
                while let Some((_, inner)) = chars.next() {
                    if inner == '\\' {
                        chars.next();
                    } else if inner == quote {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(ParseError::UnterminatedString { pos: open + i });
                }
            }
            _ => {}
        }
    }

    Err(ParseError::UnclosedDelimiter {
        pos: open,
        delimiter: '{',
    })
}

/// Parsed opening tag of a widget
#[derive(Debug, Clone, PartialEq)]
pub struct OpenTag {
    pub name: String,
    pub props: Vec<Prop>,
    pub self_closing: bool,
    /// Offset just past `>` or `/>`
    pub end: usize,
}

/// Scan the widget tag starting with the `<` at `at`. Offsets in the result
/// and in errors are relative to `text`.
pub fn scan_open_tag(text: &str, at: usize) -> ParseResult<OpenTag> {
    let mut lexer = TagToken::lexer(&text[at..]);

    match lexer.next() {
        Some(Ok(TagToken::Open)) => {}
        _ => return Err(ParseError::unexpected_token(at, "'<'", describe(text, at))),
    }

    let name = match lexer.next() {
        Some(Ok(TagToken::Ident(name))) => name.to_string(),
        Some(_) => {
            let pos = at + lexer.span().start;
            return Err(ParseError::unexpected_token(pos, "widget name", describe(text, pos)));
        }
        None => return Err(ParseError::unexpected_eof(text.len())),
    };

    let mut props: Vec<Prop> = Vec::new();

    loop {
        let token = lexer.next();
        let span = lexer.span();
        let pos = at + span.start;

        match token {
            None => {
                return Err(ParseError::UnclosedWidget { pos: at, name });
            }
            Some(Err(())) => {
                return Err(match text[pos..].chars().next() {
                    Some('"' | '\'') => ParseError::UnterminatedString { pos },
                    _ => ParseError::unexpected_token(pos, "prop, '>' or '/>'", describe(text, pos)),
                });
            }
            Some(Ok(TagToken::SelfClose)) => {
                return Ok(OpenTag {
                    name,
                    props,
                    self_closing: true,
                    end: at + span.end,
                });
            }
            Some(Ok(TagToken::Close)) => {
                return Ok(OpenTag {
                    name,
                    props,
                    self_closing: false,
                    end: at + span.end,
                });
            }
            Some(Ok(TagToken::Ident(prop_name))) => {
                let prop_start = pos;
                let checkpoint = lexer.clone();
                match lexer.next() {
                    Some(Ok(TagToken::Equals)) => {}
                    _ => {
                        // Bare flag; re-read the token after it
                        lexer = checkpoint;
                        props.push(Prop {
                            name: prop_name.to_string(),
                            value: PropValue::Flag,
                            span: Span::new(prop_start, at + span.end),
                        });
                        continue;
                    }
                }

                let value_token = lexer.next();
                let value_span = lexer.span();
                let value_pos = at + value_span.start;
                let value = match value_token {
                    Some(Ok(TagToken::Str(literal))) => PropValue::String(unquote(literal)),
                    Some(Ok(TagToken::LBrace)) => {
                        let close = scan_expression(text, value_pos)?;
                        lexer.bump(close - (at + value_span.end));
                        PropValue::Expression(text[value_pos + 1..close - 1].trim().to_string())
                    }
                    Some(Err(())) if matches!(text[value_pos..].chars().next(), Some('"' | '\'')) => {
                        return Err(ParseError::UnterminatedString { pos: value_pos });
                    }
                    Some(_) => {
                        return Err(ParseError::unexpected_token(
                            value_pos,
                            "string or {expression}",
                            describe(text, value_pos),
                        ));
                    }
                    None => return Err(ParseError::UnclosedWidget { pos: at, name }),
                };

                props.push(Prop {
                    name: prop_name.to_string(),
                    value,
                    span: Span::new(prop_start, at + lexer.span().end),
                });
            }
            Some(Ok(other)) => {
                return Err(ParseError::unexpected_token(pos, "prop, '>' or '/>'", other.to_string()));
            }
        }
    }
}

fn describe(text: &str, pos: usize) -> String {
    match text[pos.min(text.len())..].chars().next() {
        Some(c) => format!("'{}'", c),
        None => "end of input".to_string(),
    }
}

/// Closing tag `</Name>` located by [`find_closing_tag`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosingTag {
    pub start: usize,
    pub end: usize,
}

/// Find the `</name>` that closes a widget whose opening tag ends at `from`.
/// Nested widgets of the same name are balanced; fenced code and inline code
/// spans are skipped.
pub fn find_closing_tag(text: &str, from: usize, name: &str) -> Option<ClosingTag> {
    let open_pat = format!("<{}", name);
    let close_pat = format!("</{}", name);
    let mut depth = 0usize;
    let mut i = from;
    let mut at_line_start = from == 0 || text[..from].ends_with('\n');

    while i < text.len() {
        if at_line_start {
            at_line_start = false;
            let line_end = text[i..].find('\n').map(|n| i + n).unwrap_or(text.len());
            if let Some(fence) = fence_open(&text[i..line_end]) {
                i = skip_fence(text, line_end, &fence);
                at_line_start = true;
                continue;
            }
        }

        let rest = &text[i..];
        let Some(c) = rest.chars().next() else { break };

        if c == '\n' {
            at_line_start = true;
            i += 1;
            continue;
        }

        if c == '`' {
            let run = rest.chars().take_while(|c| *c == '`').count();
            let ticks = &rest[..run];
            if let Some(close) = rest[run..].find(ticks) {
                i += run + close + run;
            } else {
                i += run;
            }
            continue;
        }

        if rest.starts_with(&close_pat) && name_ends(rest, close_pat.len()) {
            let after = &rest[close_pat.len()..];
            if let Some(gt) = after.find('>').filter(|gt| after[..*gt].trim().is_empty()) {
                let end = i + close_pat.len() + gt + 1;
                if depth == 0 {
                    return Some(ClosingTag { start: i, end });
                }
                depth -= 1;
                i = end;
                continue;
            }
        }

        if rest.starts_with(&open_pat) && name_ends(rest, open_pat.len()) {
            if let Ok(tag) = scan_open_tag(text, i) {
                if !tag.self_closing {
                    depth += 1;
                }
                i = tag.end;
                continue;
            }
        }

        i += c.len_utf8();
    }

    None
}

fn name_ends(rest: &str, at: usize) -> bool {
    !rest[at..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-'))
}

/// Offset just past the closing fence line, or end of text if unterminated
fn skip_fence(text: &str, open_line_end: usize, fence: &Fence) -> usize {
    let mut pos = (open_line_end + 1).min(text.len());
    while pos < text.len() {
        let line_end = text[pos..].find('\n').map(|n| pos + n).unwrap_or(text.len());
        let next = (line_end + 1).min(text.len());
        if fence_close(text[pos..line_end].trim_end_matches('\r'), fence) {
            return next;
        }
        pos = next;
    }
    text.len()
}

/// Kind of top-level declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    FrontMatter,
    ExportMeta,
    Import,
}

/// A top-level declaration region. The span covers whole lines (without the
/// final line terminator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub span: Span,
}

/// Find the declarations of a document: the single leading metadata block and
/// every top-level import statement. Fenced code and widget bodies are
/// skipped, so declaration-like text inside them is left alone.
pub fn scan_declarations(source: &str) -> Vec<Declaration> {
    let lines = split_lines(source);
    let mut declarations = Vec::new();
    let mut idx = 0;
    let mut metadata_allowed = true;

    if let Some(first) = lines.first() {
        let body_follows = lines.get(1).is_some_and(|l| !is_blank(&source[l.start..l.end]));
        if source[first.start..first.end].trim_end() == "---" && body_follows {
            let close = lines
                .iter()
                .enumerate()
                .skip(1)
                .find(|(_, l)| matches!(source[l.start..l.end].trim_end(), "---" | "..."));
            if let Some((close_idx, close_line)) = close {
                declarations.push(Declaration {
                    kind: DeclarationKind::FrontMatter,
                    span: Span::new(first.start, close_line.end),
                });
                idx = close_idx + 1;
                metadata_allowed = false;
            }
        }
    }

    while idx < lines.len() {
        let line = lines[idx];
        let text = &source[line.start..line.end];

        if is_blank(text) {
            idx += 1;
            continue;
        }

        if let Some(fence) = fence_open(text) {
            metadata_allowed = false;
            let end = skip_fence(source, line.end, &fence);
            if end >= source.len() {
                break;
            }
            idx = line_index_at(&lines, end, idx + 1);
            continue;
        }

        if text.starts_with("import ") || text.starts_with("import{") {
            if let Some(last) = import_end(source, &lines, idx) {
                declarations.push(Declaration {
                    kind: DeclarationKind::Import,
                    span: Span::new(line.start, lines[last].end),
                });
                idx = last + 1;
                continue;
            }
        }

        if metadata_allowed && is_export_meta(text) {
            metadata_allowed = false;
            if let Some(brace) = source[line.start..].find('{').map(|b| line.start + b) {
                if let Ok(close) = scan_expression(source, brace) {
                    let last = line_index_at(&lines, close - 1, idx).min(lines.len() - 1);
                    declarations.push(Declaration {
                        kind: DeclarationKind::ExportMeta,
                        span: Span::new(line.start, lines[last].end),
                    });
                    idx = last + 1;
                    continue;
                }
            }
            idx += 1;
            continue;
        }

        metadata_allowed = false;

        if widget_start(text) {
            let at = line.start + leading_spaces(text);
            if let Ok(tag) = scan_open_tag(source, at) {
                let end = if tag.self_closing {
                    tag.end
                } else {
                    match find_closing_tag(source, tag.end, &tag.name) {
                        Some(close) => close.end,
                        None => source.len(),
                    }
                };
                idx = line_index_at(&lines, end.saturating_sub(1), idx) + 1;
                continue;
            }
        }

        idx += 1;
    }

    declarations
}

fn is_export_meta(line: &str) -> bool {
    let mut words = line.split_whitespace();
    words.next() == Some("export")
        && words.next() == Some("const")
        && words.next().is_some_and(|w| w == "meta" || w.starts_with("meta="))
}

/// Index of the line containing `offset`, searching from `from`
fn line_index_at(lines: &[crate::region::Line], offset: usize, from: usize) -> usize {
    lines
        .iter()
        .enumerate()
        .skip(from.min(lines.len()))
        .find(|(_, l)| offset < l.next || l.next == l.end)
        .map(|(i, _)| i)
        .unwrap_or(lines.len())
}

/// Last line index of an import statement starting at line `first`.
/// A statement ends on the first line that ends with a quoted module path
/// (optionally followed by `;`). Prose that merely starts with "import" never
/// reaches such a line before a blank line and yields `None`.
fn import_end(source: &str, lines: &[crate::region::Line], first: usize) -> Option<usize> {
    for (i, line) in lines.iter().enumerate().skip(first) {
        let text = source[line.start..line.end].trim_end();
        if is_blank(text) {
            return None;
        }
        let text = text.strip_suffix(';').unwrap_or(text).trim_end();
        if text.ends_with('"') || text.ends_with('\'') {
            return Some(i);
        }
    }
    None
}
