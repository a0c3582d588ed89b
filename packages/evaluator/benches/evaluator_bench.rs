use criterion::{black_box, criterion_group, criterion_main, Criterion};
use scribe_evaluator::{render_tree, to_html, CapabilitySet, Compile, MarkupCompiler};

fn compile_article(c: &mut Criterion) {
    let mut source = String::from("---\ntitle: Bench\n---\n\n");
    for i in 0..40 {
        source.push_str(&format!(
            "## Part {i}\n\nText with *emphasis* and {{{i}}}.\n\n<Callout kind=\"info\">\n  Note {i}\n</Callout>\n\n"
        ));
    }
    let capabilities = CapabilitySet::builtins();

    c.bench_function("compile_article", |b| {
        b.iter(|| MarkupCompiler.compile(black_box(&source), &capabilities))
    });
}

fn render_to_html(c: &mut Criterion) {
    let source = "# Title\n\n<Figure src=\"/a.png\" caption=\"A\" />\n\n<Button href=\"/b\" label=\"B\" />\n";
    let capabilities = CapabilitySet::builtins();
    let tree = MarkupCompiler.compile(source, &capabilities).unwrap();

    c.bench_function("render_to_html", |b| {
        b.iter(|| to_html(&render_tree(black_box(&tree), &capabilities)))
    });
}

criterion_group!(benches, compile_article, render_to_html);
criterion_main!(benches);
