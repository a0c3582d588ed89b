/// Determinism tests - compiling the same text against the same capability
/// set must produce structurally identical trees
///
/// These tests validate that:
/// - Same input produces identical trees across repeated compiles
/// - Props and attributes do not leak map iteration order
/// - Serialized output is byte-for-byte identical

use scribe_evaluator::{render_tree, CapabilitySet, Compile, MarkupCompiler, RenderableTree};

const ARTICLE: &str = r#"---
title: Determinism
tags: [a, b, c]
---
import { Callout } from './widgets'

# Heading with {"expression"}

<Callout kind="tip" title="Note">
  - one
  - two {[1, 2, {"nested": true}]}
</Callout>

<Video src="/v.mp4" poster="/p.png" autoplay muted loop />

<Columns gap={12}>

Left

Right

</Columns>
"#;

#[test]
fn test_compile_determinism() {
    let capabilities = CapabilitySet::builtins();

    let results: Vec<RenderableTree> = (0..10)
        .map(|_| MarkupCompiler.compile(ARTICLE, &capabilities).expect("Compile failed"))
        .collect();

    for i in 1..results.len() {
        assert_eq!(results[0], results[i], "Compile {} differs from compile 0", i);
    }
}

#[test]
fn test_serialized_output_identical() {
    let capabilities = CapabilitySet::builtins();

    let first = serde_json::to_string(&MarkupCompiler.compile(ARTICLE, &capabilities).unwrap()).unwrap();
    let second = serde_json::to_string(&MarkupCompiler.compile(ARTICLE, &capabilities).unwrap()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_independent_capability_sets_agree() {
    let a = CapabilitySet::builtins();
    let b = CapabilitySet::builtins();

    let tree_a = MarkupCompiler.compile(ARTICLE, &a).unwrap();
    let tree_b = MarkupCompiler.compile(ARTICLE, &b).unwrap();

    assert_eq!(render_tree(&tree_a, &a), render_tree(&tree_b, &b));
}
