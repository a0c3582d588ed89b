//! Generation ordering with compiles that finish out of order

use scribe_editor::{CapabilitySet, Compile, FailureInfo, Phase, RecompileScheduler, RenderableTree};
use scribe_evaluator::{MarkupCompiler, RenderNode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Compiles normally, but text starting with "slow" blocks until released
struct GatedCompiler {
    gate: Mutex<Receiver<()>>,
    calls: AtomicUsize,
}

impl GatedCompiler {
    fn new() -> (Arc<Self>, Sender<()>) {
        let (release, gate) = channel();
        let compiler = Arc::new(Self {
            gate: Mutex::new(gate),
            calls: AtomicUsize::new(0),
        });
        (compiler, release)
    }
}

impl Compile for GatedCompiler {
    fn compile(&self, source: &str, capabilities: &CapabilitySet) -> Result<RenderableTree, FailureInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if source.starts_with("slow") {
            let _ = self.gate.lock().unwrap().recv();
        }
        MarkupCompiler::new().compile(source, capabilities)
    }
}

fn first_node(scheduler: &RecompileScheduler) -> RenderNode {
    scheduler.artifact().tree.expect("tree").nodes[0].clone()
}

async fn until<F: Fn() -> bool>(condition: F) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never held");
}

#[tokio::test]
async fn test_late_stale_result_is_discarded() {
    let (compiler, release) = GatedCompiler::new();
    let scheduler = RecompileScheduler::new(compiler, CapabilitySet::builtins(), Duration::from_millis(10));

    let older = scheduler.compile_now("slow older text");
    let newer = scheduler.compile_now("# Newer");
    assert!(newer > older);

    let artifact = timeout(Duration::from_secs(5), scheduler.wait_for(newer))
        .await
        .unwrap();
    assert_eq!(artifact.generation, newer);

    release.send(()).unwrap();
    until(|| scheduler.discarded() == 1).await;

    let artifact = scheduler.artifact();
    assert_eq!(artifact.generation, newer);
    assert_eq!(
        first_node(&scheduler),
        RenderNode::element("h1").with_child(RenderNode::text("Newer"))
    );
    assert_eq!(scheduler.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_edit_during_slow_compile_wins() {
    let (compiler, release) = GatedCompiler::new();
    let scheduler = RecompileScheduler::new(
        compiler.clone(),
        CapabilitySet::builtins(),
        Duration::from_millis(10),
    );

    // The debounced compile of the first edit gets stuck
    scheduler.notify("slow first edit");
    until(|| compiler.calls.load(Ordering::SeqCst) == 1).await;
    assert_eq!(scheduler.phase(), Phase::Compiling);

    // The author keeps typing
    scheduler.notify("second edit");
    until(|| scheduler.artifact().generation == 2).await;
    assert_eq!(
        first_node(&scheduler),
        RenderNode::element("p").with_child(RenderNode::text("second edit"))
    );

    release.send(()).unwrap();
    until(|| scheduler.discarded() == 1).await;
    assert_eq!(scheduler.artifact().generation, 2);
}

#[tokio::test]
async fn test_failures_only_replace_error() {
    let (compiler, _release) = GatedCompiler::new();
    let scheduler = RecompileScheduler::new(compiler, CapabilitySet::builtins(), Duration::from_millis(10));

    let good = scheduler.wait_for(scheduler.compile_now("# Title")).await;
    let failed = scheduler.wait_for(scheduler.compile_now("<Nope />")).await;

    assert_eq!(failed.tree, good.tree);
    assert!(failed.error.is_some());

    let recovered = scheduler.wait_for(scheduler.compile_now("# Title again")).await;
    assert!(recovered.error.is_none());
    assert_ne!(recovered.tree, good.tree);
}
