use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use scribe_evaluator::{
    render_tree, to_html, to_html_page, CapabilitySet, Compile, FailureInfo, MarkupCompiler,
    RenderedDocument,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct CompileArgs {
    /// Document to compile
    pub file: PathBuf,

    /// Write output here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Emit the rendered tree as JSON instead of HTML
    #[arg(long)]
    pub json: bool,

    /// Wrap the HTML in a standalone page
    #[arg(long, conflicts_with = "json")]
    pub page: bool,
}

pub fn compile(args: CompileArgs, cwd: &str) -> Result<()> {
    let path = PathBuf::from(cwd).join(&args.file);
    let source = fs::read_to_string(&path)
        .map_err(|e| anyhow!("Cannot read {}: {}", path.display(), e))?;

    let capabilities = CapabilitySet::builtins();
    let rendered = compile_source(&source, &capabilities)
        .map_err(|failure| report_failure(&failure, &source, &path))?;

    for failure in &rendered.failures {
        eprintln!(
            "  {} <{}> failed to render: {}",
            "⚠".yellow(),
            failure.widget,
            failure.message
        );
    }

    let output = if args.json {
        serde_json::to_string_pretty(&rendered)?
    } else if args.page {
        to_html_page(&rendered)
    } else {
        to_html(&rendered)
    };

    match &args.out {
        Some(out) => {
            let out = PathBuf::from(cwd).join(out);
            fs::write(&out, output)?;
            eprintln!("  {} {} → {}", "✓".green(), args.file.display(), out.display());
        }
        None => print!("{}", output),
    }

    Ok(())
}

/// Compile and expand widgets in one go
pub fn compile_source(source: &str, capabilities: &CapabilitySet) -> Result<RenderedDocument, FailureInfo> {
    let tree = MarkupCompiler::new().compile(source, capabilities)?;
    Ok(render_tree(&tree, capabilities))
}

/// Print the annotated report and turn the failure into a short error
pub fn report_failure(failure: &FailureInfo, source: &str, path: &Path) -> anyhow::Error {
    eprintln!("{}", failure.report(source, &path.display().to_string()));
    anyhow!("{} failed to compile", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_writes_html() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("doc.md"), "# Title\n\n<Button href=\"/a\" label=\"Go\" />\n").unwrap();

        let args = CompileArgs {
            file: PathBuf::from("doc.md"),
            out: Some(PathBuf::from("doc.html")),
            json: false,
            page: false,
        };
        compile(args, &dir.path().display().to_string()).unwrap();

        let html = fs::read_to_string(dir.path().join("doc.html")).unwrap();
        assert_eq!(
            html,
            "<h1>Title</h1>\n<a class=\"button button-primary\" href=\"/a\">Go</a>\n"
        );
    }

    #[test]
    fn test_compile_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.md"), "<Missing />").unwrap();

        let args = CompileArgs {
            file: PathBuf::from("bad.md"),
            out: None,
            json: false,
            page: false,
        };
        let err = compile(args, &dir.path().display().to_string()).unwrap_err();
        assert!(err.to_string().contains("failed to compile"));
    }

    #[test]
    fn test_json_output() {
        let rendered = compile_source("Hello", &CapabilitySet::builtins()).unwrap();
        let json = serde_json::to_value(&rendered).unwrap();
        assert_eq!(json["nodes"][0]["tag"], "p");
    }
}
