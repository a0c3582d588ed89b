//! Stock widgets available in every default session

use crate::capabilities::{
    bool_prop, choice_prop, number_prop, required_string, string_prop, Widget, WidgetError,
};
use crate::render::{Props, RenderNode};
use std::sync::Arc;

pub fn all() -> Vec<Arc<dyn Widget>> {
    vec![
        Arc::new(Button),
        Arc::new(Callout),
        Arc::new(Columns),
        Arc::new(Figure),
        Arc::new(Video),
    ]
}

/// Highlighted note box
pub struct Callout;

const CALLOUT_KINDS: &[&str] = &["info", "tip", "warning", "danger"];

impl Widget for Callout {
    fn name(&self) -> &str {
        "Callout"
    }

    fn describe(&self) -> &str {
        "Highlighted note with an optional title"
    }

    fn template(&self) -> String {
        "<Callout kind=\"info\">\n  Your note here.\n</Callout>\n".to_string()
    }

    fn validate(&self, props: &Props) -> Result<(), WidgetError> {
        choice_prop(props, "kind", CALLOUT_KINDS, "info")?;
        string_prop(props, "title")?;
        Ok(())
    }

    fn render(&self, props: &Props, children: Vec<RenderNode>) -> Result<RenderNode, WidgetError> {
        let kind = choice_prop(props, "kind", CALLOUT_KINDS, "info")?;
        let mut node = RenderNode::element("aside")
            .with_attr("class", format!("callout callout-{}", kind))
            .with_attr("role", "note");

        if let Some(title) = string_prop(props, "title")? {
            node = node.with_child(
                RenderNode::element("p")
                    .with_attr("class", "callout-title")
                    .with_child(RenderNode::text(title)),
            );
        }

        Ok(node.with_children(children))
    }
}

/// Image with caption
pub struct Figure;

impl Widget for Figure {
    fn name(&self) -> &str {
        "Figure"
    }

    fn describe(&self) -> &str {
        "Image with a caption"
    }

    fn template(&self) -> String {
        "<Figure src=\"/images/example.png\" caption=\"Caption\" />\n".to_string()
    }

    fn validate(&self, props: &Props) -> Result<(), WidgetError> {
        required_string(props, "src")?;
        string_prop(props, "caption")?;
        number_prop(props, "width")?;
        Ok(())
    }

    fn render(&self, props: &Props, children: Vec<RenderNode>) -> Result<RenderNode, WidgetError> {
        let src = required_string(props, "src")?;
        let caption = string_prop(props, "caption")?;

        let mut img = RenderNode::element("img")
            .with_attr("src", src)
            .with_attr("alt", caption.unwrap_or_default());
        if let Some(width) = number_prop(props, "width")? {
            img = img.with_attr("width", format_number(width));
        }

        let mut figure = RenderNode::element("figure").with_child(img);
        if caption.is_some() || !children.is_empty() {
            let mut figcaption = RenderNode::element("figcaption");
            if let Some(caption) = caption {
                figcaption = figcaption.with_child(RenderNode::text(caption));
            }
            figure = figure.with_child(figcaption.with_children(children));
        }

        Ok(figure)
    }
}

/// Embedded video player
pub struct Video;

impl Widget for Video {
    fn name(&self) -> &str {
        "Video"
    }

    fn describe(&self) -> &str {
        "Embedded video player"
    }

    fn template(&self) -> String {
        "<Video src=\"/videos/example.mp4\" controls />\n".to_string()
    }

    fn validate(&self, props: &Props) -> Result<(), WidgetError> {
        required_string(props, "src")?;
        string_prop(props, "poster")?;
        for flag in ["autoplay", "controls", "loop", "muted"] {
            bool_prop(props, flag, false)?;
        }
        Ok(())
    }

    fn render(&self, props: &Props, _children: Vec<RenderNode>) -> Result<RenderNode, WidgetError> {
        let mut video = RenderNode::element("video").with_attr("src", required_string(props, "src")?);

        if let Some(poster) = string_prop(props, "poster")? {
            video = video.with_attr("poster", poster);
        }
        for (flag, default) in [("autoplay", false), ("controls", true), ("loop", false), ("muted", false)] {
            if bool_prop(props, flag, default)? {
                video = video.with_attr(flag, "");
            }
        }

        Ok(video)
    }
}

/// Side-by-side layout, one column per body block
pub struct Columns;

impl Widget for Columns {
    fn name(&self) -> &str {
        "Columns"
    }

    fn describe(&self) -> &str {
        "Lay out body blocks side by side"
    }

    fn template(&self) -> String {
        "<Columns>\n\nLeft column\n\nRight column\n\n</Columns>\n".to_string()
    }

    fn validate(&self, props: &Props) -> Result<(), WidgetError> {
        if let Some(gap) = number_prop(props, "gap")? {
            if gap < 0.0 {
                return Err(WidgetError::invalid("gap", "must not be negative"));
            }
        }
        Ok(())
    }

    fn render(&self, props: &Props, children: Vec<RenderNode>) -> Result<RenderNode, WidgetError> {
        let mut row = RenderNode::element("div").with_attr("class", "columns");
        if let Some(gap) = number_prop(props, "gap")? {
            row = row.with_attr("style", format!("gap: {}px", format_number(gap)));
        }

        let columns = children
            .into_iter()
            .map(|child| RenderNode::element("div").with_attr("class", "column").with_child(child))
            .collect();

        Ok(row.with_children(columns))
    }
}

/// Link styled as a button
pub struct Button;

const BUTTON_VARIANTS: &[&str] = &["primary", "secondary"];

impl Widget for Button {
    fn name(&self) -> &str {
        "Button"
    }

    fn describe(&self) -> &str {
        "Link styled as a button"
    }

    fn template(&self) -> String {
        "<Button href=\"https://example.com\" label=\"Learn more\" />\n".to_string()
    }

    fn validate(&self, props: &Props) -> Result<(), WidgetError> {
        required_string(props, "href")?;
        required_string(props, "label")?;
        choice_prop(props, "variant", BUTTON_VARIANTS, "primary")?;
        Ok(())
    }

    fn render(&self, props: &Props, _children: Vec<RenderNode>) -> Result<RenderNode, WidgetError> {
        let variant = choice_prop(props, "variant", BUTTON_VARIANTS, "primary")?;

        Ok(RenderNode::element("a")
            .with_attr("class", format!("button button-{}", variant))
            .with_attr("href", required_string(props, "href")?)
            .with_child(RenderNode::text(required_string(props, "label")?)))
    }
}

/// Integral numbers print without a fraction
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: serde_json::Value) -> Props {
        match value {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => Props::new(),
        }
    }

    #[test]
    fn test_callout_kinds() {
        assert!(Callout.validate(&props(json!({ "kind": "tip" }))).is_ok());
        assert_eq!(
            Callout.validate(&props(json!({ "kind": "loud" }))),
            Err(WidgetError::invalid(
                "kind",
                "must be one of info, tip, warning, danger (got \"loud\")"
            ))
        );
    }

    #[test]
    fn test_callout_render() {
        let node = Callout
            .render(&props(json!({ "title": "Note" })), vec![RenderNode::text("body")])
            .unwrap();

        let RenderNode::Element { tag, attributes, children } = node else {
            panic!("expected element");
        };
        assert_eq!(tag, "aside");
        assert_eq!(attributes["class"], "callout callout-info");
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_figure_requires_src() {
        assert_eq!(
            Figure.validate(&Props::new()),
            Err(WidgetError::MissingProp { prop: "src".into() })
        );
    }

    #[test]
    fn test_figure_width() {
        let node = Figure
            .render(&props(json!({ "src": "/a.png", "width": 640 })), vec![])
            .unwrap();
        let RenderNode::Element { children, .. } = node else {
            panic!("expected element");
        };
        assert!(matches!(&children[0], RenderNode::Element { attributes, .. } if attributes["width"] == "640"));
    }

    #[test]
    fn test_video_flags() {
        let node = Video
            .render(&props(json!({ "src": "/v.mp4", "autoplay": true })), vec![])
            .unwrap();
        let RenderNode::Element { attributes, .. } = node else {
            panic!("expected element");
        };
        assert!(attributes.contains_key("autoplay"));
        assert!(attributes.contains_key("controls"));
        assert!(!attributes.contains_key("muted"));
    }

    #[test]
    fn test_columns_wrap_children() {
        let node = Columns
            .render(&Props::new(), vec![RenderNode::text("a"), RenderNode::text("b")])
            .unwrap();
        let RenderNode::Element { children, .. } = node else {
            panic!("expected element");
        };
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_button_requires_label() {
        assert!(Button.validate(&props(json!({ "href": "/x" }))).is_err());
        assert!(Button
            .validate(&props(json!({ "href": "/x", "label": "Go" })))
            .is_ok());
    }

    #[test]
    fn test_templates_name_their_widget() {
        for widget in all() {
            assert!(widget.template().starts_with(&format!("<{}", widget.name())));
        }
    }
}
