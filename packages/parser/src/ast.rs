use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Byte range into the original source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Root document node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub metadata: Option<Metadata>,
    pub imports: Vec<Import>,
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }
}

/// How the leading metadata declaration was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataFormat {
    /// `---` delimited YAML front matter
    FrontMatter,
    /// `export const meta = { ... }`
    Export,
}

/// Leading metadata declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub format: MetadataFormat,
    pub fields: BTreeMap<String, serde_json::Value>,
    pub span: Span,
}

impl Metadata {
    pub fn title(&self) -> Option<&str> {
        self.fields.get("title").and_then(|v| v.as_str())
    }
}

/// Import-style declaration. Capabilities are ambient, so these are recorded
/// and otherwise ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub statement: String,
    pub span: Span,
}

/// Block-level node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Block {
    Heading {
        level: u8,
        children: Vec<Inline>,
        span: Span,
    },
    Paragraph {
        children: Vec<Inline>,
        span: Span,
    },
    BlockQuote {
        children: Vec<Block>,
        span: Span,
    },
    List {
        ordered: bool,
        /// First number of an ordered list
        start: Option<u64>,
        /// No blank lines between or inside items
        tight: bool,
        items: Vec<ListItem>,
        span: Span,
    },
    CodeBlock {
        info: Option<String>,
        code: String,
        span: Span,
    },
    ThematicBreak {
        span: Span,
    },
    Widget(WidgetElement),
}

impl Block {
    pub fn span(&self) -> Span {
        match self {
            Block::Heading { span, .. }
            | Block::Paragraph { span, .. }
            | Block::BlockQuote { span, .. }
            | Block::List { span, .. }
            | Block::CodeBlock { span, .. }
            | Block::ThematicBreak { span } => *span,
            Block::Widget(widget) => widget.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub children: Vec<Block>,
    pub span: Span,
}

/// Inline node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Inline {
    Text { value: String },
    Strong { children: Vec<Inline> },
    Emphasis { children: Vec<Inline> },
    Strikethrough { children: Vec<Inline> },
    Code { value: String },
    Link { href: String, children: Vec<Inline> },
    Image { src: String, alt: String },
    SoftBreak,
    LineBreak,
    Widget(WidgetElement),
    /// `{ ... }` expression, source without the braces
    Expression { source: String, span: Span },
}

impl Inline {
    pub fn text(value: impl Into<String>) -> Self {
        Inline::Text {
            value: value.into(),
        }
    }
}

/// Reference to a registered widget: `<Name prop="x" />` or `<Name>...</Name>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetElement {
    pub name: String,
    pub props: Vec<Prop>,
    pub children: Vec<Block>,
    pub self_closing: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prop {
    pub name: String,
    pub value: PropValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum PropValue {
    String(String),
    /// Expression source without the braces
    Expression(String),
    /// Bare attribute (`<Video autoplay />`)
    Flag,
}
