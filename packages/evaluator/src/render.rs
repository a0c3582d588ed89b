use scribe_parser::ast::{Metadata, Span};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Evaluated widget props, ordered by name
pub type Props = BTreeMap<String, serde_json::Value>;

/// Render tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RenderNode {
    /// HTML element
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        children: Vec<RenderNode>,
    },

    /// Text node
    Text { content: String },

    /// Widget reference, expanded by the render boundary
    Widget {
        name: String,
        props: Props,
        children: Vec<RenderNode>,
        span: Span,
    },

    /// Error node (shows a failure inline instead of blanking the output)
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        span: Option<Span>,
    },
}

impl RenderNode {
    pub fn element(tag: impl Into<String>) -> Self {
        RenderNode::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        RenderNode::Text {
            content: content.into(),
        }
    }

    pub fn error(message: impl Into<String>, span: Option<Span>) -> Self {
        RenderNode::Error {
            message: message.into(),
            span,
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let RenderNode::Element {
            ref mut attributes, ..
        } = self
        {
            attributes.insert(key.into(), value.into());
        }
        self
    }

    pub fn with_child(mut self, child: RenderNode) -> Self {
        if let RenderNode::Element {
            ref mut children, ..
        } = self
        {
            children.push(child);
        }
        self
    }

    pub fn with_children(mut self, new_children: Vec<RenderNode>) -> Self {
        if let RenderNode::Element {
            ref mut children, ..
        } = self
        {
            children.extend(new_children);
        }
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RenderNode::Error { .. })
    }

    /// Depth-first count of nodes matching `pred`, including `self`
    pub fn count(&self, pred: &impl Fn(&RenderNode) -> bool) -> usize {
        let own = usize::from(pred(self));
        let nested: usize = match self {
            RenderNode::Element { children, .. } | RenderNode::Widget { children, .. } => {
                children.iter().map(|c| c.count(pred)).sum()
            }
            _ => 0,
        };
        own + nested
    }
}

/// Compiled artifact tree: evaluated markup with widget references still
/// unexpanded
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderableTree {
    pub nodes: Vec<RenderNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl RenderableTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: RenderNode) {
        self.nodes.push(node);
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.title())
    }

    /// Names of every widget referenced, in document order
    pub fn widget_names(&self) -> Vec<&str> {
        fn walk<'a>(nodes: &'a [RenderNode], out: &mut Vec<&'a str>) {
            for node in nodes {
                match node {
                    RenderNode::Widget { name, children, .. } => {
                        out.push(name);
                        walk(children, out);
                    }
                    RenderNode::Element { children, .. } => walk(children, out),
                    _ => {}
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.nodes, &mut out);
        out
    }
}

/// A widget that failed while rendering, replaced by an error node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderFailure {
    pub widget: String,
    pub message: String,
    pub span: Span,
}

/// Output of the render boundary: only elements, text and error nodes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderedDocument {
    pub nodes: Vec<RenderNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    pub failures: Vec<RenderFailure>,
}

impl RenderedDocument {
    pub fn title(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.title())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let node = RenderNode::element("a")
            .with_attr("href", "/x")
            .with_child(RenderNode::text("go"));

        assert_eq!(
            node,
            RenderNode::Element {
                tag: "a".into(),
                attributes: BTreeMap::from([("href".to_string(), "/x".to_string())]),
                children: vec![RenderNode::text("go")],
            }
        );
    }

    #[test]
    fn test_builders_ignore_non_elements() {
        let node = RenderNode::text("plain").with_attr("class", "x");
        assert_eq!(node, RenderNode::text("plain"));
    }

    #[test]
    fn test_widget_names_in_order() {
        let mut tree = RenderableTree::new();
        tree.add_node(RenderNode::element("p"));
        tree.add_node(RenderNode::Widget {
            name: "Columns".into(),
            props: Props::new(),
            children: vec![RenderNode::Widget {
                name: "Callout".into(),
                props: Props::new(),
                children: vec![],
                span: Span::new(10, 20),
            }],
            span: Span::new(0, 30),
        });

        assert_eq!(tree.widget_names(), vec!["Columns", "Callout"]);
    }

    #[test]
    fn test_count_errors() {
        let node = RenderNode::element("div")
            .with_child(RenderNode::error("bad", None))
            .with_child(RenderNode::element("p").with_child(RenderNode::error("worse", None)));

        assert_eq!(node.count(&RenderNode::is_error), 2);
    }
}
