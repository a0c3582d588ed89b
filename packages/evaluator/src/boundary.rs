//! Render error boundary.
//!
//! Widgets run after a successful compile. A widget that returns an error or
//! panics while rendering is replaced by a single error node; its siblings and
//! the rest of the document still render.

use crate::capabilities::CapabilitySet;
use crate::render::{RenderFailure, RenderNode, RenderableTree, RenderedDocument};
use scribe_parser::ast::Span;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{instrument, warn};

/// Expand every widget in `tree`
#[instrument(skip_all, fields(nodes = tree.nodes.len()))]
pub fn render_tree(tree: &RenderableTree, capabilities: &CapabilitySet) -> RenderedDocument {
    let mut failures = Vec::new();
    let nodes = tree
        .nodes
        .iter()
        .map(|node| render_node(node, capabilities, &mut failures))
        .collect();

    RenderedDocument {
        nodes,
        metadata: tree.metadata.clone(),
        failures,
    }
}

fn render_node(node: &RenderNode, capabilities: &CapabilitySet, failures: &mut Vec<RenderFailure>) -> RenderNode {
    match node {
        RenderNode::Element {
            tag,
            attributes,
            children,
        } => RenderNode::Element {
            tag: tag.clone(),
            attributes: attributes.clone(),
            children: children
                .iter()
                .map(|c| render_node(c, capabilities, failures))
                .collect(),
        },

        RenderNode::Widget {
            name,
            props,
            children,
            span,
        } => {
            let children: Vec<RenderNode> = children
                .iter()
                .map(|c| render_node(c, capabilities, failures))
                .collect();

            let Some(widget) = capabilities.get(name) else {
                return contain(failures, name, format!("unknown widget <{}>", name), *span);
            };

            match catch_unwind(AssertUnwindSafe(|| widget.render(props, children))) {
                Ok(Ok(rendered)) => rendered,
                Ok(Err(err)) => contain(failures, name, err.to_string(), *span),
                Err(payload) => contain(failures, name, panic_message(payload.as_ref()), *span),
            }
        }

        RenderNode::Text { .. } | RenderNode::Error { .. } => node.clone(),
    }
}

fn contain(failures: &mut Vec<RenderFailure>, widget: &str, message: String, span: Span) -> RenderNode {
    warn!(widget, error = %message, "Widget failed to render; contained by error boundary");

    let node = RenderNode::error(format!("<{}> failed to render: {}", widget, message), Some(span));
    failures.push(RenderFailure {
        widget: widget.to_string(),
        message,
        span,
    });
    node
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "widget panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{CapabilityRegistry, Widget, WidgetError};
    use crate::render::Props;

    struct Exploding;

    impl Widget for Exploding {
        fn name(&self) -> &str {
            "Exploding"
        }

        fn describe(&self) -> &str {
            "always panics"
        }

        fn template(&self) -> String {
            "<Exploding />".to_string()
        }

        fn render(&self, _props: &Props, _children: Vec<RenderNode>) -> Result<RenderNode, WidgetError> {
            panic!("boom");
        }
    }

    struct Failing;

    impl Widget for Failing {
        fn name(&self) -> &str {
            "Failing"
        }

        fn describe(&self) -> &str {
            "always errors"
        }

        fn template(&self) -> String {
            "<Failing />".to_string()
        }

        fn render(&self, _props: &Props, _children: Vec<RenderNode>) -> Result<RenderNode, WidgetError> {
            Err(WidgetError::Render("no data".into()))
        }
    }

    fn widget(name: &str, start: usize) -> RenderNode {
        RenderNode::Widget {
            name: name.into(),
            props: Props::new(),
            children: vec![],
            span: Span::new(start, start + 5),
        }
    }

    fn capabilities() -> CapabilitySet {
        let mut registry = CapabilityRegistry::with_builtins();
        registry.register(Exploding).unwrap();
        registry.register(Failing).unwrap();
        registry.resolve()
    }

    #[test]
    fn test_panic_is_contained() {
        let tree = RenderableTree {
            nodes: vec![
                RenderNode::element("p").with_child(RenderNode::text("before")),
                widget("Exploding", 10),
                RenderNode::element("p").with_child(RenderNode::text("after")),
            ],
            metadata: None,
        };

        let rendered = render_tree(&tree, &capabilities());

        assert_eq!(rendered.nodes.len(), 3);
        assert_eq!(rendered.nodes[0], tree.nodes[0]);
        assert!(rendered.nodes[1].is_error());
        assert_eq!(rendered.nodes[2], tree.nodes[2]);
        assert_eq!(rendered.failures.len(), 1);
        assert_eq!(rendered.failures[0].message, "boom");
    }

    #[test]
    fn test_error_result_is_contained() {
        let tree = RenderableTree {
            nodes: vec![widget("Failing", 0)],
            metadata: None,
        };

        let rendered = render_tree(&tree, &capabilities());
        assert_eq!(
            rendered.nodes[0],
            RenderNode::error("<Failing> failed to render: no data", Some(Span::new(0, 5)))
        );
    }

    #[test]
    fn test_nested_failure_keeps_parent() {
        let tree = RenderableTree {
            nodes: vec![RenderNode::Widget {
                name: "Columns".into(),
                props: Props::new(),
                children: vec![RenderNode::text("ok"), widget("Exploding", 20)],
                span: Span::new(0, 40),
            }],
            metadata: None,
        };

        let rendered = render_tree(&tree, &capabilities());
        let RenderNode::Element { tag, children, .. } = &rendered.nodes[0] else {
            panic!("expected columns element");
        };
        assert_eq!(tag, "div");
        assert_eq!(children.len(), 2);
        assert_eq!(rendered.nodes[0].count(&RenderNode::is_error), 1);
    }

    #[test]
    fn test_widget_missing_from_set() {
        let tree = RenderableTree {
            nodes: vec![widget("Callout", 0)],
            metadata: None,
        };
        let rendered = render_tree(&tree, &CapabilitySet::empty());
        assert!(rendered.nodes[0].is_error());
    }
}
