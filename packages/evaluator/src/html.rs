//! Static HTML output for rendered documents

use crate::render::{RenderNode, RenderedDocument};
use std::fmt::Write;

const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "source", "track", "wbr"];

/// Serialize the document body as an HTML fragment
pub fn to_html(doc: &RenderedDocument) -> String {
    let mut out = String::new();
    for node in &doc.nodes {
        write_node(&mut out, node);
        out.push('\n');
    }
    out
}

/// Serialize as a standalone page, titled from the document metadata
pub fn to_html_page(doc: &RenderedDocument) -> String {
    let title = doc.title().unwrap_or("Untitled");
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_text(title),
        to_html(doc)
    )
}

fn write_node(out: &mut String, node: &RenderNode) {
    match node {
        RenderNode::Element {
            tag,
            attributes,
            children,
        } => {
            out.push('<');
            out.push_str(tag);
            for (key, value) in attributes {
                if value.is_empty() {
                    let _ = write!(out, " {}", key);
                } else {
                    let _ = write!(out, " {}=\"{}\"", key, escape_attr(value));
                }
            }
            out.push('>');

            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            for child in children {
                write_node(out, child);
            }
            let _ = write!(out, "</{}>", tag);
        }

        RenderNode::Text { content } => out.push_str(&escape_text(content)),

        RenderNode::Error { message, .. } => {
            let _ = write!(
                out,
                "<div class=\"scribe-error\" role=\"alert\">{}</div>",
                escape_text(message)
            );
        }

        // Widgets are expanded before serialization
        RenderNode::Widget { name, .. } => {
            let _ = write!(
                out,
                "<div class=\"scribe-error\" role=\"alert\">unrendered widget &lt;{}&gt;</div>",
                escape_text(name)
            );
        }
    }
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::render_tree;
    use crate::capabilities::CapabilitySet;
    use crate::evaluator::Evaluator;
    use scribe_parser::parse;

    fn html(source: &str) -> String {
        let capabilities = CapabilitySet::builtins();
        let doc = parse(source).unwrap();
        let tree = Evaluator::new(&capabilities).evaluate(&doc).unwrap();
        to_html(&render_tree(&tree, &capabilities))
    }

    #[test]
    fn test_prose_html() {
        assert_eq!(
            html("# Hi\n\nA [link](/x) and `<code>`."),
            "<h1>Hi</h1>\n<p>A <a href=\"/x\">link</a> and <code>&lt;code&gt;</code>.</p>\n"
        );
    }

    #[test]
    fn test_void_elements() {
        assert_eq!(html("---\n\n![alt](/i.png)"), "<hr>\n<p><img alt=\"alt\" src=\"/i.png\"></p>\n");
    }

    #[test]
    fn test_widget_html() {
        assert_eq!(
            html("<Button href=\"/go\" label=\"Go &amp; see\" />"),
            "<a class=\"button button-primary\" href=\"/go\">Go &amp;amp; see</a>\n"
        );
    }

    #[test]
    fn test_boolean_attributes() {
        assert_eq!(
            html("<Video src=\"/v.mp4\" />"),
            "<video controls src=\"/v.mp4\"></video>\n"
        );
    }

    #[test]
    fn test_attribute_quotes_escaped() {
        assert_eq!(escape_attr("say \"hi\""), "say &quot;hi&quot;");
    }

    #[test]
    fn test_page_title() {
        let capabilities = CapabilitySet::builtins();
        let doc = parse("---\ntitle: A <b> title\n---\nbody").unwrap();
        let tree = Evaluator::new(&capabilities).evaluate(&doc).unwrap();
        let page = to_html_page(&render_tree(&tree, &capabilities));
        assert!(page.contains("<title>A &lt;b&gt; title</title>"));
    }
}
