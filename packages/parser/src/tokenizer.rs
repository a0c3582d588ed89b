use logos::Logos;
use std::fmt;
use std::ops::Range;

/// Inline token types for prose content (paragraphs, headings, list items)
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token<'src> {
    #[token("**")]
    DoubleStar,

    #[token("__")]
    DoubleUnderscore,

    #[token("~~")]
    DoubleTilde,

    #[token("*")]
    Star,

    #[token("_")]
    Underscore,

    #[regex(r"`+", |lex| lex.slice().len())]
    Backticks(usize),

    #[token("![")]
    ImageOpen,

    #[token("[")]
    LBracket,

    #[token("](")]
    LinkTarget,

    #[token("]")]
    RBracket,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    // `<` directly followed by an uppercase letter opens a widget tag
    #[regex(r"<[A-Z]")]
    WidgetOpen,

    #[regex(r"\\\r?\n")]
    HardBreak,

    #[regex(r"\\[^\r\n]", |lex| &lex.slice()[1..])]
    Escape(&'src str),

    #[regex(r"\r?\n")]
    Newline,

    #[regex(r"[^*_~`!\[\]()<{}\\\r\n]+", |lex| lex.slice())]
    Text(&'src str),

    // Any single character that starts no other token
    #[regex(r"[!~(<\\\r]", |lex| lex.slice())]
    Punct(&'src str),
}

impl<'src> Token<'src> {
    /// Literal source text this token stands for when it is not markup
    pub fn literal(&self) -> &'src str {
        match self {
            Token::DoubleStar => "**",
            Token::DoubleUnderscore => "__",
            Token::DoubleTilde => "~~",
            Token::Star => "*",
            Token::Underscore => "_",
            Token::Backticks(n) => &"``````````````````"[..(*n).min(18)],
            Token::ImageOpen => "![",
            Token::LBracket => "[",
            Token::LinkTarget => "](",
            Token::RBracket => "]",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::WidgetOpen => "<",
            Token::HardBreak => "\n",
            Token::Escape(s) => s,
            Token::Newline => "\n",
            Token::Text(s) => s,
            Token::Punct(s) => s,
        }
    }
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Backticks(n) => write!(f, "{} backtick(s)", n),
            Token::WidgetOpen => write!(f, "widget tag"),
            Token::HardBreak => write!(f, "hard line break"),
            Token::Escape(s) => write!(f, "escaped '{}'", s),
            Token::Newline => write!(f, "newline"),
            Token::Text(s) => write!(f, "text '{}'", s),
            other => write!(f, "'{}'", other.literal()),
        }
    }
}

/// Tokens inside a widget tag (`<Name prop="x" flag value={1} />`)
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum TagToken<'src> {
    #[token("<")]
    Open,

    #[token("</")]
    OpenClosing,

    #[token("/>")]
    SelfClose,

    #[token(">")]
    Close,

    #[token("=")]
    Equals,

    #[token("{")]
    LBrace,

    #[regex(r"[A-Za-z_][A-Za-z0-9_.:-]*", |lex| lex.slice())]
    Ident(&'src str),

    #[regex(r#""([^"\\]|\\.)*"|'([^'\\]|\\.)*'"#, |lex| lex.slice())]
    Str(&'src str),
}

impl<'src> fmt::Display for TagToken<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagToken::Open => write!(f, "<"),
            TagToken::OpenClosing => write!(f, "</"),
            TagToken::SelfClose => write!(f, "/>"),
            TagToken::Close => write!(f, ">"),
            TagToken::Equals => write!(f, "="),
            TagToken::LBrace => write!(f, "{{"),
            TagToken::Ident(s) => write!(f, "identifier '{}'", s),
            TagToken::Str(s) => write!(f, "string {}", s),
        }
    }
}

/// Tokenize inline prose content.
///
/// Every character is covered by some token, so lexer errors cannot occur for
/// valid UTF-8 input; any that do are dropped like the tag lexer's.
pub fn tokenize(source: &str) -> Vec<(Token<'_>, Range<usize>)> {
    let lexer = Token::lexer(source);
    lexer
        .spanned()
        .filter_map(|(result, span)| result.ok().map(|token| (token, span)))
        .collect()
}

/// Remove the quotes and backslash escapes of a tag string literal
pub fn unquote(literal: &str) -> String {
    let inner = &literal[1..literal.len().saturating_sub(1).max(1)];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emphasis_markers() {
        let tokens = tokenize("**bold** and *em*");

        assert_eq!(tokens[0].0, Token::DoubleStar);
        assert_eq!(tokens[1].0, Token::Text("bold"));
        assert_eq!(tokens[2].0, Token::DoubleStar);
        assert_eq!(tokens[3].0, Token::Text(" and "));
        assert_eq!(tokens[4].0, Token::Star);
    }

    #[test]
    fn test_link_tokens() {
        let tokens = tokenize("[site](https://example.com)");

        assert_eq!(tokens[0].0, Token::LBracket);
        assert_eq!(tokens[1].0, Token::Text("site"));
        assert_eq!(tokens[2].0, Token::LinkTarget);
        assert_eq!(tokens[3].0, Token::Text("https://example.com"));
        assert_eq!(tokens[4].0, Token::RParen);
    }

    #[test]
    fn test_widget_open_requires_uppercase() {
        let tokens = tokenize("a <Chart /> b <em>");

        assert!(tokens.iter().any(|(t, _)| *t == Token::WidgetOpen));
        assert!(tokens.iter().any(|(t, _)| *t == Token::Punct("<")));
    }

    #[test]
    fn test_escapes_and_breaks() {
        let tokens = tokenize("\\*not em\\\nnext");

        assert_eq!(tokens[0].0, Token::Escape("*"));
        assert!(tokens.iter().any(|(t, _)| *t == Token::HardBreak));
    }

    #[test]
    fn test_spans_cover_source() {
        let source = "x ~ y! (z) `code` ~~s~~";
        let tokens = tokenize(source);
        let covered: usize = tokens.iter().map(|(_, r)| r.len()).sum();
        assert_eq!(covered, source.len());
    }

    #[test]
    fn test_tag_tokens() {
        let source = r#"<Callout kind="info" open value={1} />"#;
        let tokens: Vec<_> = TagToken::lexer(source).filter_map(Result::ok).collect();

        assert_eq!(tokens[0], TagToken::Open);
        assert_eq!(tokens[1], TagToken::Ident("Callout"));
        assert_eq!(tokens[2], TagToken::Ident("kind"));
        assert_eq!(tokens[3], TagToken::Equals);
        assert_eq!(tokens[4], TagToken::Str("\"info\""));
        assert_eq!(tokens[5], TagToken::Ident("open"));
        assert_eq!(tokens[8], TagToken::LBrace);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(r#""say \"hi\"""#), "say \"hi\"");
        assert_eq!(unquote("'single'"), "single");
    }
}
