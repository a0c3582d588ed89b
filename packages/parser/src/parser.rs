use crate::ast::*;
use crate::blocks::{
    fence_close, fence_open, find_closing_tag, heading, is_blank, leading_spaces, list_marker, quote_marker,
    scan_declarations, scan_expression, scan_open_tag, thematic_break, widget_start, Declaration, DeclarationKind,
    Fence, ListMarker, OpenTag,
};
use crate::error::{ParseError, ParseResult};
use crate::preprocess::parse_metadata;
use crate::region::{Line, Region};
use crate::tokenizer::{tokenize, Token};
use std::ops::Range;

/// Containers (quotes, lists, widgets) nested deeper than this are rejected
const MAX_NESTING: usize = 48;

/// Parser for the hybrid prose/widget markup
pub struct Parser<'src> {
    source: &'src str,
    depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self { source, depth: 0 }
    }

    /// Parse a complete document
    pub fn parse_document(&mut self) -> ParseResult<Document> {
        let mut doc = Document::new();
        let declarations = scan_declarations(self.source);

        for decl in &declarations {
            match decl.kind {
                DeclarationKind::FrontMatter | DeclarationKind::ExportMeta => {
                    doc.metadata = Some(parse_metadata(self.source, decl)?);
                }
                DeclarationKind::Import => {
                    doc.imports.push(Import {
                        statement: self.source[decl.span.start..decl.span.end].trim().to_string(),
                        span: decl.span,
                    });
                }
            }
        }

        let root = Region::root(self.source);
        doc.blocks = self.parse_blocks(&root, &declarations)?;

        Ok(doc)
    }

    /// Parse the blocks of a region. `skip` lists top-level declarations and
    /// is only non-empty for the root region.
    fn parse_blocks(&mut self, region: &Region, skip: &[Declaration]) -> ParseResult<Vec<Block>> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ParseError::invalid_syntax(region.to_source(0), "blocks are nested too deeply"));
        }

        let text = region.text.as_str();
        let lines = region.lines();
        let mut blocks = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];
            let content = &text[line.start..line.end];

            if let Some(decl) = skip
                .iter()
                .find(|d| d.span.start <= line.start && line.start <= d.span.end)
            {
                i = lines
                    .iter()
                    .position(|l| l.start > decl.span.end)
                    .unwrap_or(lines.len());
                continue;
            }

            if is_blank(content) {
                i += 1;
                continue;
            }

            let (block, next) = if let Some(fence) = fence_open(content) {
                self.parse_code_block(region, &lines, i, fence)
            } else if let Some((level, start, end)) = heading(content) {
                let inner = region.slice(line.start + start, line.start + end);
                let heading = Block::Heading {
                    level,
                    children: self.parse_inline(&inner)?,
                    span: region.span(line.start, line.end),
                };
                (heading, i + 1)
            } else if thematic_break(content) {
                let rule = Block::ThematicBreak {
                    span: region.span(line.start, line.end),
                };
                (rule, i + 1)
            } else if quote_marker(content).is_some() {
                self.parse_quote(region, &lines, i)?
            } else if let Some(marker) = list_marker(content) {
                self.parse_list(region, &lines, i, marker)?
            } else if widget_start(content) {
                self.parse_block_widget(region, &lines, i)?
            } else if let Some(name) = closing_tag_name(content) {
                let pos = region.to_source(line.start + leading_spaces(content));
                return Err(ParseError::UnexpectedClosingTag { pos, name });
            } else {
                self.parse_paragraph(region, &lines, i)?
            };

            blocks.push(block);
            i = next;
        }

        self.depth -= 1;
        Ok(blocks)
    }

    fn parse_code_block(&mut self, region: &Region, lines: &[Line], i: usize, fence: Fence) -> (Block, usize) {
        let text = region.text.as_str();
        let mut code_lines = Vec::new();
        let mut last = i;
        let mut next = lines.len();

        for (j, line) in lines.iter().enumerate().skip(i + 1) {
            let content = &text[line.start..line.end];
            last = j;
            if fence_close(content, &fence) {
                next = j + 1;
                break;
            }
            code_lines.push(strip_indent(content, fence.indent));
        }

        let mut code = code_lines.join("\n");
        if !code_lines.is_empty() {
            code.push('\n');
        }

        let block = Block::CodeBlock {
            info: fence.info,
            code,
            span: region.span(lines[i].start, lines[last].end),
        };
        (block, next)
    }

    fn parse_quote(&mut self, region: &Region, lines: &[Line], i: usize) -> ParseResult<(Block, usize)> {
        let text = region.text.as_str();
        let mut pieces = Vec::new();
        let mut j = i;

        while j < lines.len() {
            let line = lines[j];
            match quote_marker(&text[line.start..line.end]) {
                Some(marker) => pieces.push(((line.start + marker).min(line.end), line.end)),
                None => break,
            }
            j += 1;
        }

        let inner = region.from_pieces(&pieces);
        let block = Block::BlockQuote {
            children: self.parse_blocks(&inner, &[])?,
            span: region.span(lines[i].start, lines[j - 1].end),
        };
        Ok((block, j))
    }

    fn parse_list(
        &mut self,
        region: &Region,
        lines: &[Line],
        i: usize,
        first: ListMarker,
    ) -> ParseResult<(Block, usize)> {
        let text = region.text.as_str();
        let mut items = Vec::new();
        let mut tight = true;
        let mut j = i;
        let mut last_line = i;

        while j < lines.len() {
            let line = lines[j];
            let content = &text[line.start..line.end];
            let marker = match list_marker(content) {
                Some(m) if m.ordered == first.ordered && !thematic_break(content) => m,
                _ => break,
            };

            let column = marker.content_offset;
            let mut pieces = vec![((line.start + column).min(line.end), line.end)];
            let mut item_last = j;
            let mut pending_blank = false;
            let mut k = j + 1;

            while k < lines.len() {
                let next = lines[k];
                let next_content = &text[next.start..next.end];

                if is_blank(next_content) {
                    pending_blank = true;
                    pieces.push((next.start, next.start));
                    k += 1;
                    continue;
                }

                let indent = leading_spaces(next_content);
                if indent >= column {
                    if pending_blank {
                        tight = false;
                    }
                    pending_blank = false;
                    pieces.push((next.start + column, next.end));
                    item_last = k;
                    k += 1;
                    continue;
                }

                if !pending_blank && !starts_block(next_content) {
                    // Lazy paragraph continuation
                    pieces.push((next.start + indent, next.end));
                    item_last = k;
                    k += 1;
                    continue;
                }

                break;
            }

            while pieces.len() > 1 && pieces.last().is_some_and(|(s, e)| s == e) {
                pieces.pop();
            }

            if pending_blank && k < lines.len() {
                let following = &text[lines[k].start..lines[k].end];
                if list_marker(following).is_some_and(|m| m.ordered == first.ordered) {
                    tight = false;
                }
            }

            let inner = region.from_pieces(&pieces);
            items.push(ListItem {
                children: self.parse_blocks(&inner, &[])?,
                span: region.span(line.start, lines[item_last].end),
            });

            last_line = item_last;
            j = k;
        }

        let block = Block::List {
            ordered: first.ordered,
            start: first.number,
            tight,
            items,
            span: region.span(lines[i].start, lines[last_line].end),
        };
        Ok((block, j))
    }

    fn parse_block_widget(&mut self, region: &Region, lines: &[Line], i: usize) -> ParseResult<(Block, usize)> {
        let text = region.text.as_str();
        let line = lines[i];
        let at = line.start + leading_spaces(&text[line.start..line.end]);

        let tag = scan_open_tag(text, at).map_err(|e| e.map_pos(|p| region.to_source(p)))?;

        let (children, end) = if tag.self_closing {
            (Vec::new(), tag.end)
        } else {
            let close = find_closing_tag(text, tag.end, &tag.name).ok_or_else(|| ParseError::UnclosedWidget {
                pos: region.to_source(at),
                name: tag.name.clone(),
            })?;
            let body = dedent(&region.slice(tag.end, close.start));
            (self.parse_blocks(&body, &[])?, close.end)
        };

        let line_end = text[end..].find('\n').map(|n| end + n).unwrap_or(text.len());
        if !text[end..line_end].trim().is_empty() {
            if tag.self_closing {
                // `<Badge /> tail` is a paragraph opening with an inline widget
                return self.parse_paragraph(region, lines, i);
            }
            let pos = region.to_source(end + leading_spaces(&text[end..line_end]));
            return Err(ParseError::invalid_syntax(
                pos,
                format!("unexpected text after </{}>", tag.name),
            ));
        }

        let next = lines.iter().position(|l| l.start >= end).unwrap_or(lines.len());
        let widget = widget_element(region, tag, children, at, end);
        Ok((Block::Widget(widget), next))
    }

    fn parse_paragraph(&mut self, region: &Region, lines: &[Line], i: usize) -> ParseResult<(Block, usize)> {
        let text = region.text.as_str();
        let mut pieces = Vec::new();
        let mut j = i;

        while j < lines.len() {
            let line = lines[j];
            let content = &text[line.start..line.end];
            if is_blank(content) || (j > i && starts_block(content)) {
                break;
            }
            pieces.push((line.start + leading_spaces(content), line.end));
            j += 1;
        }

        let inner = region.from_pieces(&pieces);
        let block = Block::Paragraph {
            children: self.parse_inline(&inner)?,
            span: region.span(lines[i].start, lines[j - 1].end),
        };
        Ok((block, j))
    }

    fn parse_inline(&mut self, region: &Region) -> ParseResult<Vec<Inline>> {
        let mut inline = InlineParser::new(region);
        let (mut children, _) = inline.parse_until(None)?;
        trim_edges(&mut children);
        Ok(children)
    }
}

/// Parse a document
pub fn parse(source: &str) -> ParseResult<Document> {
    let mut parser = Parser::new(source);
    parser.parse_document()
}

/// Lines that interrupt a paragraph
fn starts_block(line: &str) -> bool {
    fence_open(line).is_some()
        || heading(line).is_some()
        || thematic_break(line)
        || quote_marker(line).is_some()
        || list_marker(line).is_some_and(|m| m.content_offset < line.len())
        || widget_start(line)
        || closing_tag_name(line).is_some()
}

fn closing_tag_name(line: &str) -> Option<String> {
    let rest = line.trim_start().strip_prefix("</")?;
    if !rest.starts_with(|c: char| c.is_ascii_uppercase()) {
        return None;
    }
    let name: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-'))
        .collect();
    Some(name)
}

fn strip_indent(line: &str, indent: usize) -> &str {
    let available = leading_spaces(line).min(indent);
    &line[available..]
}

/// Remove the common indentation of a widget body
fn dedent(body: &Region) -> Region {
    let lines = body.lines();
    let indent = lines
        .iter()
        .map(|l| &body.text[l.start..l.end])
        .filter(|l| !is_blank(l))
        .map(leading_spaces)
        .min()
        .unwrap_or(0);

    if indent == 0 {
        return body.clone();
    }

    let pieces: Vec<(usize, usize)> = lines
        .iter()
        .map(|l| ((l.start + indent).min(l.end), l.end))
        .collect();
    body.from_pieces(&pieces)
}

fn widget_element(region: &Region, tag: OpenTag, children: Vec<Block>, start: usize, end: usize) -> WidgetElement {
    let props = tag
        .props
        .into_iter()
        .map(|prop| Prop {
            span: region.span(prop.span.start, prop.span.end),
            ..prop
        })
        .collect();

    WidgetElement {
        name: tag.name,
        props,
        children,
        self_closing: tag.self_closing,
        span: region.span(start, end),
    }
}

/// Which token ends the inline run being parsed
#[derive(Debug, Clone, Copy, PartialEq)]
enum Stop {
    Strong(bool),
    Emphasis(bool),
    Strikethrough,
    LinkText,
}

impl Stop {
    /// `bool` selects the underscore flavour of the delimiter
    fn matches(self, token: &Token<'_>) -> bool {
        match (self, token) {
            (Stop::Strong(false), Token::DoubleStar) => true,
            (Stop::Strong(true), Token::DoubleUnderscore) => true,
            (Stop::Emphasis(false), Token::Star) => true,
            (Stop::Emphasis(true), Token::Underscore) => true,
            (Stop::Strikethrough, Token::DoubleTilde) => true,
            (Stop::LinkText, Token::LinkTarget) => true,
            _ => false,
        }
    }
}

/// Inline parser over the tokens of one paragraph, heading or item line
struct InlineParser<'r> {
    region: &'r Region,
    text: &'r str,
    tokens: Vec<(Token<'r>, Range<usize>)>,
    pos: usize,
}

impl<'r> InlineParser<'r> {
    fn new(region: &'r Region) -> Self {
        let text = region.text.as_str();
        Self {
            region,
            text,
            tokens: tokenize(text),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<&(Token<'r>, Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    /// Skip every token that starts before `offset`. A token running past
    /// `offset` is cut down to its tail, which stays queued as plain text.
    fn skip_to(&mut self, offset: usize) {
        while let Some((_, range)) = self.peek() {
            if range.start >= offset {
                break;
            }
            if range.end > offset {
                let end = range.end;
                self.tokens[self.pos] = (Token::Text(&self.text[offset..end]), offset..end);
                break;
            }
            self.advance();
        }
    }

    fn source_pos(&self, local: usize) -> usize {
        self.region.to_source(local)
    }

    fn char_before(&self, offset: usize) -> Option<char> {
        self.text[..offset].chars().next_back()
    }

    fn char_after(&self, offset: usize) -> Option<char> {
        self.text[offset..].chars().next()
    }

    /// Delimiter run may open emphasis
    fn can_open(&self, idx: usize) -> bool {
        let (token, range) = &self.tokens[idx];
        let next_ok = self.char_after(range.end).is_some_and(|c| !c.is_whitespace());
        match token {
            Token::Underscore | Token::DoubleUnderscore => {
                next_ok && !self.char_before(range.start).is_some_and(char::is_alphanumeric)
            }
            _ => next_ok,
        }
    }

    /// Delimiter run may close emphasis
    fn can_close(&self, idx: usize) -> bool {
        let (token, range) = &self.tokens[idx];
        let prev_ok = self.char_before(range.start).is_some_and(|c| !c.is_whitespace());
        match token {
            Token::Underscore | Token::DoubleUnderscore => {
                prev_ok && !self.char_after(range.end).is_some_and(char::is_alphanumeric)
            }
            _ => prev_ok,
        }
    }

    fn has_closer(&self, stop: Stop, from: usize) -> bool {
        (from..self.tokens.len()).any(|i| stop.matches(&self.tokens[i].0) && self.can_close(i))
    }

    /// Index of the `](` that ends a bracketed label opened just before `from`
    fn find_link_target(&self, from: usize) -> Option<usize> {
        let mut depth = 0usize;
        for i in from..self.tokens.len() {
            match self.tokens[i].0 {
                Token::LBracket | Token::ImageOpen => depth += 1,
                Token::RBracket => {
                    if depth == 0 {
                        return None;
                    }
                    depth -= 1;
                }
                Token::LinkTarget => {
                    if depth == 0 {
                        return Some(i);
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
        None
    }

    /// Raw destination text after `](` up to the closing `)`
    fn parse_destination(&mut self, target_idx: usize) -> ParseResult<String> {
        let open = self.tokens[target_idx].1.clone();
        let close = (target_idx + 1..self.tokens.len()).find(|&i| self.tokens[i].0 == Token::RParen);

        match close {
            Some(close_idx) => {
                let close_start = self.tokens[close_idx].1.start;
                self.pos = close_idx + 1;
                Ok(self.text[open.end..close_start].trim().to_string())
            }
            None => Err(ParseError::UnclosedDelimiter {
                pos: self.source_pos(open.start + 1),
                delimiter: '(',
            }),
        }
    }

    /// Parse inlines until `stop` (not consumed). Returns whether the stop
    /// token was reached.
    fn parse_until(&mut self, stop: Option<Stop>) -> ParseResult<(Vec<Inline>, bool)> {
        let mut out: Vec<Inline> = Vec::new();

        while let Some((token, range)) = self.peek().cloned() {
            let idx = self.pos;

            if let Some(stop) = stop {
                if stop.matches(&token) && (stop == Stop::LinkText || self.can_close(idx)) {
                    return Ok((out, true));
                }
            }

            match token {
                Token::DoubleStar | Token::DoubleUnderscore | Token::Star | Token::Underscore | Token::DoubleTilde => {
                    let underscore = matches!(token, Token::DoubleUnderscore | Token::Underscore);
                    let inner_stop = match token {
                        Token::DoubleStar | Token::DoubleUnderscore => Stop::Strong(underscore),
                        Token::DoubleTilde => Stop::Strikethrough,
                        _ => Stop::Emphasis(underscore),
                    };

                    if self.can_open(idx) && self.has_closer(inner_stop, idx + 1) {
                        self.advance();
                        let (children, closed) = self.parse_until(Some(inner_stop))?;
                        if closed {
                            self.advance();
                            out.push(match inner_stop {
                                Stop::Strong(_) => Inline::Strong { children },
                                Stop::Strikethrough => Inline::Strikethrough { children },
                                _ => Inline::Emphasis { children },
                            });
                        } else {
                            push_text(&mut out, token.literal());
                            out.extend(children);
                        }
                    } else {
                        self.advance();
                        push_text(&mut out, token.literal());
                    }
                }

                Token::Backticks(n) => {
                    let closer = (idx + 1..self.tokens.len()).find(|&i| self.tokens[i].0 == Token::Backticks(n));
                    match closer {
                        Some(close_idx) => {
                            let raw = &self.text[range.end..self.tokens[close_idx].1.start];
                            let raw = raw.replace('\n', " ");
                            let value = if raw.len() > 1 && raw.starts_with(' ') && raw.ends_with(' ') {
                                raw[1..raw.len() - 1].to_string()
                            } else {
                                raw
                            };
                            out.push(Inline::Code { value });
                            self.pos = close_idx + 1;
                        }
                        None => {
                            self.advance();
                            push_text(&mut out, token.literal());
                        }
                    }
                }

                Token::ImageOpen => match self.find_link_target(idx + 1) {
                    Some(target_idx) => {
                        let alt = self.text[range.end..self.tokens[target_idx].1.start].to_string();
                        let src = self.parse_destination(target_idx)?;
                        out.push(Inline::Image { src, alt });
                    }
                    None => {
                        self.advance();
                        push_text(&mut out, token.literal());
                    }
                },

                Token::LBracket => match self.find_link_target(idx + 1) {
                    Some(_) => {
                        self.advance();
                        let (children, closed) = self.parse_until(Some(Stop::LinkText))?;
                        if closed {
                            let href = self.parse_destination(self.pos)?;
                            out.push(Inline::Link { href, children });
                        } else {
                            // `](` swallowed by a code span inside the label
                            push_text(&mut out, token.literal());
                            out.extend(children);
                        }
                    }
                    None => {
                        self.advance();
                        push_text(&mut out, token.literal());
                    }
                },

                Token::LBrace => {
                    let close = scan_expression(self.text, range.start).map_err(|e| e.map_pos(|p| self.source_pos(p)))?;
                    out.push(Inline::Expression {
                        source: self.text[range.start + 1..close - 1].trim().to_string(),
                        span: self.region.span(range.start, close),
                    });
                    self.skip_to(close);
                }

                Token::RBrace => {
                    return Err(ParseError::UnmatchedDelimiter {
                        pos: self.source_pos(range.start),
                        delimiter: '}',
                    });
                }

                Token::WidgetOpen => {
                    let tag = scan_open_tag(self.text, range.start).map_err(|e| e.map_pos(|p| self.source_pos(p)))?;
                    if !tag.self_closing {
                        return Err(ParseError::invalid_syntax(
                            self.source_pos(range.start),
                            format!("inline widget <{}> must be self-closing", tag.name),
                        ));
                    }
                    let end = tag.end;
                    out.push(Inline::Widget(widget_element(self.region, tag, Vec::new(), range.start, end)));
                    self.skip_to(end);
                }

                Token::HardBreak => {
                    self.advance();
                    trim_trailing_spaces(&mut out);
                    out.push(Inline::LineBreak);
                }

                Token::Newline => {
                    self.advance();
                    let hard = matches!(out.last(), Some(Inline::Text { value }) if value.ends_with("  "));
                    trim_trailing_spaces(&mut out);
                    out.push(if hard { Inline::LineBreak } else { Inline::SoftBreak });
                }

                Token::Escape(escaped) => {
                    self.advance();
                    if escaped.chars().all(|c| c.is_ascii_punctuation()) {
                        push_text(&mut out, escaped);
                    } else {
                        push_text(&mut out, &self.text[range.clone()]);
                    }
                }

                Token::Text(_)
                | Token::Punct(_)
                | Token::RBracket
                | Token::RParen
                | Token::LinkTarget => {
                    self.advance();
                    push_text(&mut out, &self.text[range.clone()]);
                }
            }
        }

        Ok((out, false))
    }
}

fn push_text(out: &mut Vec<Inline>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text { value }) = out.last_mut() {
        value.push_str(text);
    } else {
        out.push(Inline::text(text));
    }
}

fn trim_trailing_spaces(out: &mut Vec<Inline>) {
    if let Some(Inline::Text { value }) = out.last_mut() {
        let trimmed = value.trim_end_matches([' ', '\t']).len();
        value.truncate(trimmed);
        if value.is_empty() {
            out.pop();
        }
    }
}

fn trim_edges(out: &mut Vec<Inline>) {
    trim_trailing_spaces(out);
    if let Some(Inline::Text { value }) = out.first_mut() {
        let trimmed = value.trim_start().to_string();
        *value = trimmed;
        if value.is_empty() {
            out.remove(0);
        }
    }
}
