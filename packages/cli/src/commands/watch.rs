use crate::commands::compile::report_failure;
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use scribe_editor::{CompiledArtifact, RecompileScheduler};
use scribe_evaluator::{render_tree, to_html_page, CapabilitySet, MarkupCompiler};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Document to watch
    pub file: PathBuf,

    /// Rewrite this HTML page after every successful compile
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Quiet window before recompiling (overrides config)
    #[arg(long)]
    pub debounce_ms: Option<u64>,
}

pub fn watch(args: WatchArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let debounce = Duration::from_millis(args.debounce_ms.unwrap_or(config.editor.debounce_ms));
    let path = PathBuf::from(cwd).join(&args.file);
    let out = args.out.map(|out| PathBuf::from(cwd).join(out));

    if !path.is_file() {
        return Err(anyhow!("File does not exist: {}", path.display()));
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(path, out, debounce))
}

async fn run(path: PathBuf, out: Option<PathBuf>, debounce: Duration) -> Result<()> {
    let capabilities = CapabilitySet::builtins();
    let scheduler = RecompileScheduler::new(Arc::new(MarkupCompiler::new()), capabilities.clone(), debounce);

    println!("{}", "👀 Scribe watch".bright_blue().bold());
    println!("   Watching: {}", path.display());
    if let Some(out) = &out {
        println!("   Preview:  {}", out.display());
    }
    println!();

    let (tx_notify, mut rx_notify) = tokio::sync::mpsc::channel::<Event>(100);
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx_notify.blocking_send(event);
            }
        },
        NotifyConfig::default(),
    )?;
    watcher.watch(&path, RecursiveMode::NonRecursive)?;

    scheduler.compile_now(fs::read_to_string(&path)?);

    let reporter = tokio::spawn(report_artifacts(
        scheduler.subscribe(),
        path.clone(),
        out,
        capabilities,
    ));

    loop {
        tokio::select! {
            event = rx_notify.recv() => {
                let Some(event) = event else { break };
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    continue;
                }
                match fs::read_to_string(&path) {
                    Ok(text) => {
                        debug!(bytes = text.len(), "File changed");
                        scheduler.notify(text);
                    }
                    // Editors often replace the file; the next event will catch it
                    Err(err) => debug!(error = %err, "Cannot read file yet"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch");
                break;
            }
        }
    }

    scheduler.cancel_pending();
    reporter.abort();
    Ok(())
}

async fn report_artifacts(
    mut artifacts: tokio::sync::watch::Receiver<CompiledArtifact>,
    path: PathBuf,
    out: Option<PathBuf>,
    capabilities: CapabilitySet,
) {
    while artifacts.changed().await.is_ok() {
        let artifact = artifacts.borrow_and_update().clone();
        report(&artifact, &path, out.as_deref(), &capabilities);
    }
}

fn report(artifact: &CompiledArtifact, path: &Path, out: Option<&Path>, capabilities: &CapabilitySet) {
    match (&artifact.error, &artifact.tree) {
        (None, Some(tree)) => {
            let rendered = render_tree(tree, capabilities);
            println!(
                "  {} generation {} compiled ({} blocks)",
                "✓".green(),
                artifact.generation,
                tree.nodes.len()
            );
            for failure in &rendered.failures {
                println!("    {} <{}>: {}", "⚠".yellow(), failure.widget, failure.message);
            }
            if let Some(out) = out {
                if let Err(err) = fs::write(out, to_html_page(&rendered)) {
                    eprintln!("  {} cannot write {}: {}", "✗".red(), out.display(), err);
                }
            }
        }
        (Some(failure), tree) => {
            let source = artifact.source.as_deref().unwrap_or_default();
            let err = report_failure(failure, source, path);
            eprintln!("  {} generation {}: {}", "✗".red(), artifact.generation, err);
            if tree.is_some() {
                eprintln!("    {}", "showing last good preview".dimmed());
            }
        }
        (None, None) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> RecompileScheduler {
        RecompileScheduler::new(
            Arc::new(MarkupCompiler::new()),
            CapabilitySet::builtins(),
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn test_report_writes_page_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("preview.html");
        let scheduler = scheduler();

        let artifact = scheduler.wait_for(scheduler.compile_now("# Hello")).await;
        report(&artifact, &dir.path().join("a.md"), Some(&out), scheduler.capabilities());

        let page = fs::read_to_string(&out).unwrap();
        assert!(page.contains("<h1>Hello</h1>"));
    }

    #[tokio::test]
    async fn test_failure_report_uses_compiled_text() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("preview.html");
        fs::write(&out, "previous").unwrap();
        let scheduler = scheduler();

        let artifact = scheduler.wait_for(scheduler.compile_now("broken }")).await;
        assert_eq!(artifact.source.as_deref(), Some("broken }"));

        // The document is gone by report time; the compiled text is enough
        report(&artifact, &dir.path().join("missing.md"), Some(&out), scheduler.capabilities());
        assert_eq!(fs::read_to_string(&out).unwrap(), "previous");
    }
}
