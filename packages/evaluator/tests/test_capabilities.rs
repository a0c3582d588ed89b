use scribe_evaluator::{
    render_tree, to_html, CapabilityRegistry, CapabilitySet, Compile, FailureKind, MarkupCompiler, Props, RenderNode,
    Widget, WidgetError,
};

/// Custom widget registered by an embedding application
struct Counter;

impl Widget for Counter {
    fn name(&self) -> &str {
        "Counter"
    }

    fn describe(&self) -> &str {
        "Shows a number"
    }

    fn template(&self) -> String {
        "<Counter value={0} />\n".to_string()
    }

    fn validate(&self, props: &Props) -> Result<(), WidgetError> {
        match props.get("value") {
            Some(v) if v.is_number() => Ok(()),
            Some(_) => Err(WidgetError::invalid("value", "must be a number")),
            None => Err(WidgetError::MissingProp { prop: "value".into() }),
        }
    }

    fn render(&self, props: &Props, _children: Vec<RenderNode>) -> Result<RenderNode, WidgetError> {
        let value = props.get("value").map(|v| v.to_string()).unwrap_or_default();
        Ok(RenderNode::element("output").with_child(RenderNode::text(value)))
    }
}

fn with_counter() -> CapabilitySet {
    let mut registry = CapabilityRegistry::with_builtins();
    registry.register(Counter).expect("Counter should register");
    registry.resolve()
}

#[test]
fn test_custom_widget_renders() {
    let capabilities = with_counter();
    let tree = MarkupCompiler
        .compile("Clicks: <Counter value={7} />", &capabilities)
        .unwrap();

    let html = to_html(&render_tree(&tree, &capabilities));
    assert_eq!(html, "<p>Clicks: <output>7</output></p>\n");
}

#[test]
fn test_same_text_different_sets() {
    let source = "<Counter value={1} />";

    assert!(MarkupCompiler.compile(source, &with_counter()).is_ok());

    let err = MarkupCompiler
        .compile(source, &CapabilitySet::builtins())
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::UnknownCapability);
}

#[test]
fn test_custom_validation_failure() {
    let err = MarkupCompiler
        .compile("<Counter value=\"seven\" />", &with_counter())
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Evaluation);
    assert!(err.message.contains("must be a number"));
}

#[test]
fn test_every_builtin_template_compiles() {
    let capabilities = CapabilitySet::builtins();

    for name in capabilities.names() {
        let template = capabilities.template(name).unwrap();
        let result = MarkupCompiler.compile(&template, &capabilities);
        assert!(result.is_ok(), "template for {} failed: {:?}", name, result.err());
    }
}
