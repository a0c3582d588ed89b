//! # Scribe Evaluator
//!
//! Evaluates a parsed document into a [`RenderableTree`].
//!
//! ## Determinism Contract
//!
//! **INVARIANT: Evaluation is fully deterministic.**
//!
//! For any Document + CapabilitySet, `evaluate()` produces an identical tree on
//! every invocation:
//!
//! - Attributes and props are `BTreeMap`s, so no hash iteration order leaks
//! - No counters, clocks, randomness or environment lookups
//! - Widgets are only validated here; they run later in the render boundary
//!
//! ## Trust Boundary
//!
//! Author text is never executed. `{ ... }` expressions in prose and widget
//! props must be JSON literals; anything else fails with
//! [`EvalError::UnsupportedExpression`]. The only widgets reachable are the
//! ones in the [`CapabilitySet`] passed in.
//!
//! ## Failure Policy
//!
//! Any evaluation failure is fatal to the compile. The scheduler keeps the
//! last good tree on screen, so a half-evaluated tree is never shown.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scribe_evaluator::{CapabilitySet, Evaluator};
//! use scribe_parser::parse;
//!
//! let doc = parse("# Hello\n\n<Callout>Hi</Callout>")?;
//! let capabilities = CapabilitySet::builtins();
//! let tree = Evaluator::new(&capabilities).evaluate(&doc)?;
//! ```

use crate::capabilities::CapabilitySet;
use crate::render::{Props, RenderNode, RenderableTree};
use scribe_parser::ast::*;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Unknown widget <{name}> at {span:?}")]
    UnknownCapability { name: String, span: Span },

    #[error("Invalid props for <{name}> at {span:?}: {message}")]
    InvalidProps { name: String, message: String, span: Span },

    #[error("Unsupported expression `{expression}` at {span:?}: only JSON literals are allowed")]
    UnsupportedExpression { expression: String, span: Span },
}

impl EvalError {
    pub fn span(&self) -> Span {
        match self {
            EvalError::UnknownCapability { span, .. }
            | EvalError::InvalidProps { span, .. }
            | EvalError::UnsupportedExpression { span, .. } => *span,
        }
    }
}

/// Evaluate an expression body under the trust boundary
pub fn evaluate_expression(source: &str, span: Span) -> EvalResult<Value> {
    serde_json::from_str(source).map_err(|_| EvalError::UnsupportedExpression {
        expression: source.to_string(),
        span,
    })
}

/// Text shown for an inline expression value
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Evaluator
pub struct Evaluator<'c> {
    capabilities: &'c CapabilitySet,
}

impl<'c> Evaluator<'c> {
    pub fn new(capabilities: &'c CapabilitySet) -> Self {
        Self { capabilities }
    }

    /// Evaluate a document to a renderable tree
    #[instrument(skip(self, doc), fields(blocks = doc.blocks.len(), capabilities = self.capabilities.len()))]
    pub fn evaluate(&self, doc: &Document) -> EvalResult<RenderableTree> {
        debug!("Starting document evaluation");

        let mut tree = RenderableTree::new();
        for block in &doc.blocks {
            tree.add_node(self.evaluate_block(block)?);
        }
        tree.metadata = doc.metadata.clone();

        debug!(nodes = tree.nodes.len(), "Document evaluation complete");
        Ok(tree)
    }

    fn evaluate_blocks(&self, blocks: &[Block]) -> EvalResult<Vec<RenderNode>> {
        blocks.iter().map(|b| self.evaluate_block(b)).collect()
    }

    fn evaluate_block(&self, block: &Block) -> EvalResult<RenderNode> {
        match block {
            Block::Heading { level, children, .. } => {
                Ok(RenderNode::element(format!("h{}", level)).with_children(self.evaluate_inlines(children)?))
            }

            Block::Paragraph { children, .. } => {
                Ok(RenderNode::element("p").with_children(self.evaluate_inlines(children)?))
            }

            Block::BlockQuote { children, .. } => {
                Ok(RenderNode::element("blockquote").with_children(self.evaluate_blocks(children)?))
            }

            Block::List {
                ordered,
                start,
                tight,
                items,
                ..
            } => {
                let mut list = RenderNode::element(if *ordered { "ol" } else { "ul" });
                if let Some(start) = start.filter(|n| *ordered && *n != 1) {
                    list = list.with_attr("start", start.to_string());
                }

                for item in items {
                    let mut li = RenderNode::element("li");
                    for child in &item.children {
                        li = match child {
                            // Tight lists render item text without <p>
                            Block::Paragraph { children, .. } if *tight => {
                                li.with_children(self.evaluate_inlines(children)?)
                            }
                            other => li.with_child(self.evaluate_block(other)?),
                        };
                    }
                    list = list.with_child(li);
                }

                Ok(list)
            }

            Block::CodeBlock { info, code, .. } => {
                let mut code_node = RenderNode::element("code").with_child(RenderNode::text(code.clone()));
                if let Some(lang) = info.as_deref().and_then(|i| i.split_whitespace().next()) {
                    code_node = code_node.with_attr("class", format!("language-{}", lang));
                }
                Ok(RenderNode::element("pre").with_child(code_node))
            }

            Block::ThematicBreak { .. } => Ok(RenderNode::element("hr")),

            Block::Widget(widget) => self.evaluate_widget(widget),
        }
    }

    fn evaluate_inlines(&self, inlines: &[Inline]) -> EvalResult<Vec<RenderNode>> {
        inlines.iter().map(|i| self.evaluate_inline(i)).collect()
    }

    fn evaluate_inline(&self, inline: &Inline) -> EvalResult<RenderNode> {
        match inline {
            Inline::Text { value } => Ok(RenderNode::text(value.clone())),
            Inline::Strong { children } => {
                Ok(RenderNode::element("strong").with_children(self.evaluate_inlines(children)?))
            }
            Inline::Emphasis { children } => {
                Ok(RenderNode::element("em").with_children(self.evaluate_inlines(children)?))
            }
            Inline::Strikethrough { children } => {
                Ok(RenderNode::element("del").with_children(self.evaluate_inlines(children)?))
            }
            Inline::Code { value } => Ok(RenderNode::element("code").with_child(RenderNode::text(value.clone()))),
            Inline::Link { href, children } => Ok(RenderNode::element("a")
                .with_attr("href", href.clone())
                .with_children(self.evaluate_inlines(children)?)),
            Inline::Image { src, alt } => Ok(RenderNode::element("img")
                .with_attr("src", src.clone())
                .with_attr("alt", alt.clone())),
            Inline::SoftBreak => Ok(RenderNode::text("\n")),
            Inline::LineBreak => Ok(RenderNode::element("br")),
            Inline::Widget(widget) => self.evaluate_widget(widget),
            Inline::Expression { source, span } => {
                let value = evaluate_expression(source, *span)?;
                Ok(RenderNode::text(display_value(&value)))
            }
        }
    }

    #[instrument(skip(self, widget), fields(widget = %widget.name, props = widget.props.len()))]
    fn evaluate_widget(&self, widget: &WidgetElement) -> EvalResult<RenderNode> {
        let implementation = self.capabilities.get(&widget.name).ok_or_else(|| {
            warn!("Widget not found in capability set");
            EvalError::UnknownCapability {
                name: widget.name.clone(),
                span: widget.span,
            }
        })?;

        let props = self.evaluate_props(widget)?;
        implementation.validate(&props).map_err(|err| EvalError::InvalidProps {
            name: widget.name.clone(),
            message: err.to_string(),
            span: widget.span,
        })?;

        let children = self.evaluate_blocks(&widget.children)?;

        Ok(RenderNode::Widget {
            name: widget.name.clone(),
            props,
            children,
            span: widget.span,
        })
    }

    fn evaluate_props(&self, widget: &WidgetElement) -> EvalResult<Props> {
        let mut props = Props::new();

        for prop in &widget.props {
            let value = match &prop.value {
                PropValue::String(s) => Value::String(s.clone()),
                PropValue::Expression(source) => evaluate_expression(source, prop.span)?,
                PropValue::Flag => Value::Bool(true),
            };

            if props.insert(prop.name.clone(), value).is_some() {
                return Err(EvalError::InvalidProps {
                    name: widget.name.clone(),
                    message: format!("prop '{}' is given more than once", prop.name),
                    span: prop.span,
                });
            }
        }

        Ok(props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_parser::parse;
    use serde_json::json;

    fn evaluate(source: &str) -> EvalResult<RenderableTree> {
        let doc = parse(source).expect("parse failed");
        Evaluator::new(&CapabilitySet::builtins()).evaluate(&doc)
    }

    #[test]
    fn test_prose_elements() {
        let tree = evaluate("# Title\n\nSome **bold** text.").unwrap();

        assert_eq!(
            tree.nodes[0],
            RenderNode::element("h1").with_child(RenderNode::text("Title"))
        );
        assert_eq!(
            tree.nodes[1],
            RenderNode::element("p")
                .with_child(RenderNode::text("Some "))
                .with_child(RenderNode::element("strong").with_child(RenderNode::text("bold")))
                .with_child(RenderNode::text(" text."))
        );
    }

    #[test]
    fn test_tight_list_unwraps_paragraphs() {
        let tree = evaluate("- a\n- b").unwrap();
        assert_eq!(
            tree.nodes[0],
            RenderNode::element("ul")
                .with_child(RenderNode::element("li").with_child(RenderNode::text("a")))
                .with_child(RenderNode::element("li").with_child(RenderNode::text("b")))
        );
    }

    #[test]
    fn test_ordered_list_start() {
        let tree = evaluate("3. c\n4. d").unwrap();
        let RenderNode::Element { attributes, .. } = &tree.nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(attributes["start"], "3");
    }

    #[test]
    fn test_code_block_language() {
        let tree = evaluate("```rust\nfn main() {}\n```").unwrap();
        assert_eq!(
            tree.nodes[0],
            RenderNode::element("pre").with_child(
                RenderNode::element("code")
                    .with_attr("class", "language-rust")
                    .with_child(RenderNode::text("fn main() {}\n"))
            )
        );
    }

    #[test]
    fn test_expressions_are_literals() {
        let tree = evaluate("Count: {3} {\"x\"} {true}").unwrap();
        let RenderNode::Element { children, .. } = &tree.nodes[0] else {
            panic!("expected element");
        };
        let text: String = children
            .iter()
            .filter_map(|c| match c {
                RenderNode::Text { content } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Count: 3 x true");
    }

    #[test]
    fn test_code_expression_rejected() {
        let err = evaluate("Now: {Date.now()}").unwrap_err();
        assert!(matches!(
            err,
            EvalError::UnsupportedExpression { ref expression, .. } if expression == "Date.now()"
        ));
    }

    #[test]
    fn test_widget_props_evaluated() {
        let tree = evaluate("<Figure src=\"/a.png\" width={320} />").unwrap();
        let RenderNode::Widget { name, props, .. } = &tree.nodes[0] else {
            panic!("expected widget");
        };
        assert_eq!(name, "Figure");
        assert_eq!(props["src"], json!("/a.png"));
        assert_eq!(props["width"], json!(320));
    }

    #[test]
    fn test_unknown_widget() {
        let err = evaluate("<Chart data={[1, 2]} />").unwrap_err();
        assert_eq!(
            err,
            EvalError::UnknownCapability {
                name: "Chart".into(),
                span: Span::new(0, 23),
            }
        );
    }

    #[test]
    fn test_invalid_props() {
        let err = evaluate("<Callout kind=\"loud\">x</Callout>").unwrap_err();
        assert!(matches!(err, EvalError::InvalidProps { ref name, .. } if name == "Callout"));
    }

    #[test]
    fn test_duplicate_prop() {
        let err = evaluate("<Video src=\"a\" src=\"b\" />").unwrap_err();
        assert!(matches!(err, EvalError::InvalidProps { ref message, .. } if message.contains("more than once")));
    }

    #[test]
    fn test_empty_capabilities_reject_widgets() {
        let doc = parse("<Callout>hi</Callout>").unwrap();
        let err = Evaluator::new(&CapabilitySet::empty()).evaluate(&doc).unwrap_err();
        assert!(matches!(err, EvalError::UnknownCapability { .. }));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let source = "---\ntitle: T\n---\n<Video src=\"/v.mp4\" muted autoplay loop />\n\n*a* {[1, {\"b\": 2}]}";
        assert_eq!(evaluate(source).unwrap(), evaluate(source).unwrap());
    }
}
