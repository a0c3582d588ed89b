use scribe_parser::{parse, Block, Inline, ParseError, PropValue};

#[test]
fn test_article_with_widgets() {
    let source = r#"# Field notes

Some *observations* from the **trip**.

<Callout kind="warning" dismissible>
  Bring water.

  - at least two litres
  - a spare bottle
</Callout>

<Figure src="/img/ridge.jpg" caption="The ridge" width={640} />

> Quoted line with `code`.
"#;

    let result = parse(source);
    if let Err(e) = &result {
        eprintln!("Parse error: {:?}", e);
    }
    let doc = result.unwrap();

    assert_eq!(doc.blocks.len(), 5);
    assert!(matches!(doc.blocks[0], Block::Heading { level: 1, .. }));

    let Block::Widget(callout) = &doc.blocks[2] else {
        panic!("expected callout widget");
    };
    assert_eq!(callout.name, "Callout");
    assert_eq!(callout.props[0].value, PropValue::String("warning".into()));
    assert_eq!(callout.props[1].value, PropValue::Flag);
    assert!(matches!(callout.children[1], Block::List { .. }));

    let Block::Widget(figure) = &doc.blocks[3] else {
        panic!("expected figure widget");
    };
    assert_eq!(figure.props[2].value, PropValue::Expression("640".into()));

    assert!(matches!(doc.blocks[4], Block::BlockQuote { .. }));
}

#[test]
fn test_nested_widgets() {
    let source = r#"<Columns>
<Callout>
Left
</Callout>
<Callout>
Right
</Callout>
</Columns>
"#;

    let doc = parse(source).unwrap();
    let Block::Widget(columns) = &doc.blocks[0] else {
        panic!("expected columns");
    };
    assert_eq!(columns.children.len(), 2);
}

#[test]
fn test_spans_point_into_source() {
    let source = "Intro\n\n> - item **bold**\n";
    let doc = parse(source).unwrap();

    let Block::BlockQuote { children, span } = &doc.blocks[1] else {
        panic!("expected quote");
    };
    assert_eq!(&source[span.start..span.end], "> - item **bold**");

    let Block::List { items, .. } = &children[0] else {
        panic!("expected list");
    };
    let item = items[0].span;
    assert_eq!(&source[item.start..item.end], "- item **bold**");
}

#[test]
fn test_code_fence_protects_markup() {
    let source = "```\n<Broken {\nimport x from 'y'\n```\n\nafter";
    let doc = parse(source).unwrap();

    assert!(doc.imports.is_empty());
    assert!(matches!(&doc.blocks[0], Block::CodeBlock { code, .. } if code.contains("<Broken {")));
    assert!(matches!(&doc.blocks[1], Block::Paragraph { children, .. } if children[0] == Inline::text("after")));
}

#[test]
fn test_error_locations() {
    let cases = [
        ("text {oops", 1, 6),
        ("fine\n\n<Callout>\nnever closed", 3, 1),
        ("a\nb\n\n<Figure src=\"x />", 4, 13),
    ];

    for (source, line, column) in cases {
        let err = parse(source).unwrap_err();
        let loc = err.location(source);
        assert_eq!((loc.line, loc.column), (line, column), "source: {:?} error: {}", source, err);
    }
}

#[test]
fn test_inline_widget_must_self_close() {
    let err = parse("Status: <Badge>new</Badge>").unwrap_err();
    assert!(matches!(err, ParseError::InvalidSyntax { .. }));
}

#[test]
fn test_self_closing_widget_with_trailing_text_is_a_paragraph() {
    let doc = parse("<Video src=\"a.mp4\" /> trailing").unwrap();
    assert_eq!(doc.blocks.len(), 1);
    match &doc.blocks[0] {
        Block::Paragraph { children, .. } => {
            assert!(matches!(&children[0], Inline::Widget(w) if w.name == "Video"));
            assert_eq!(children[1], Inline::text(" trailing"));
        }
        other => panic!("expected paragraph, got {:?}", other),
    }
}

#[test]
fn test_text_after_closing_tag_fails() {
    let err = parse("<Callout>\nhi\n</Callout> tail").unwrap_err();
    match err {
        ParseError::InvalidSyntax { message, .. } => assert!(message.contains("</Callout>"), "{}", message),
        other => panic!("expected invalid syntax, got {:?}", other),
    }
}

#[test]
fn test_crlf_source() {
    let doc = parse("# Title\r\n\r\nBody\r\n").unwrap();
    assert_eq!(doc.blocks.len(), 2);
    assert!(matches!(&doc.blocks[1], Block::Paragraph { children, .. } if children[0] == Inline::text("Body")));
}
