//! # Recompilation Scheduler
//!
//! Turns a stream of text changes into background compiles and publishes the
//! visible [`CompiledArtifact`].
//!
//! ## State machine
//!
//! ```text
//! Idle ──notify──▶ Scheduled ──quiet window──▶ Compiling ──▶ Idle
//!                    ▲    │                        │
//!                    └────┘ notify resets timer    └─ notify ▶ Scheduled
//! ```
//!
//! ## Ordering
//!
//! Each compile is stamped with a generation token when it starts. A result
//! is applied only when its token is still the newest one started; anything
//! older is discarded on arrival. Compiles are never cancelled, so a slow
//! compile costs time but cannot overwrite a newer edit.
//!
//! ## Failures
//!
//! A failed compile sets `error` and leaves `tree` alone, so the last good
//! render stays visible. Nothing here returns an error to the caller.
//!
//! All methods that start work spawn onto the current Tokio runtime and must
//! be called from inside one.

use scribe_evaluator::{CapabilitySet, Compile, FailureInfo, FailureKind, RenderableTree};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What the preview pane shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledArtifact {
    /// Last successful compile, kept across later failures
    pub tree: Option<Arc<RenderableTree>>,
    /// Failure of the most recent applied compile, if it failed
    pub error: Option<FailureInfo>,
    /// Generation this artifact was last updated from; 0 before any compile
    pub generation: u64,
    /// Text the most recent applied compile read, for locating `error`
    pub source: Option<Arc<str>>,
}

impl CompiledArtifact {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// True once any compile result has been applied
    pub fn is_settled(&self) -> bool {
        self.generation > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Idle,
    Scheduled,
    Compiling,
}

struct State {
    /// Armed debounce timer and its id
    timer: Option<(u64, JoinHandle<()>)>,
    timer_seq: u64,
    /// Highest generation started
    started: u64,
    /// Generation of the last applied result
    applied: u64,
    discarded: u64,
}

struct Inner {
    compiler: Arc<dyn Compile>,
    capabilities: CapabilitySet,
    window: Duration,
    state: Mutex<State>,
    artifact: watch::Sender<CompiledArtifact>,
}

/// Debounced, generation-ordered background compiler
#[derive(Clone)]
pub struct RecompileScheduler {
    inner: Arc<Inner>,
}

impl RecompileScheduler {
    pub fn new(compiler: Arc<dyn Compile>, capabilities: CapabilitySet, window: Duration) -> Self {
        let (artifact, _) = watch::channel(CompiledArtifact::default());
        Self {
            inner: Arc::new(Inner {
                compiler,
                capabilities,
                window,
                state: Mutex::new(State {
                    timer: None,
                    timer_seq: 0,
                    started: 0,
                    applied: 0,
                    discarded: 0,
                }),
                artifact,
            }),
        }
    }

    /// Record a text change: (re)arm the debounce timer for `text`
    pub fn notify(&self, text: impl Into<String>) {
        let text = text.into();
        let mut state = self.inner.lock();
        if let Some((_, timer)) = state.timer.take() {
            timer.abort();
        }

        state.timer_seq += 1;
        let id = state.timer_seq;
        let window = self.inner.window;
        let weak = Arc::downgrade(&self.inner);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            Inner::fire(&weak, id, text);
        });
        state.timer = Some((id, timer));
    }

    /// Skip the quiet window and compile `text` now. Returns its generation.
    pub fn compile_now(&self, text: impl Into<String>) -> u64 {
        if let Some((_, timer)) = self.inner.lock().timer.take() {
            timer.abort();
        }
        Inner::start(&self.inner, text.into())
    }

    /// Drop any armed timer without compiling
    pub fn cancel_pending(&self) {
        if let Some((_, timer)) = self.inner.lock().timer.take() {
            timer.abort();
        }
    }

    /// Current artifact
    pub fn artifact(&self) -> CompiledArtifact {
        self.inner.artifact.borrow().clone()
    }

    /// Receiver that wakes on every applied result
    pub fn subscribe(&self) -> watch::Receiver<CompiledArtifact> {
        self.inner.artifact.subscribe()
    }

    /// Wait until the artifact reflects `generation` or something newer
    pub async fn wait_for(&self, generation: u64) -> CompiledArtifact {
        let mut receiver = self.subscribe();
        let artifact = match receiver.wait_for(|artifact| artifact.generation >= generation).await {
            Ok(artifact) => artifact.clone(),
            Err(_) => self.artifact(),
        };
        artifact
    }

    pub fn phase(&self) -> Phase {
        let state = self.inner.lock();
        if state.timer.is_some() {
            Phase::Scheduled
        } else if state.applied < state.started {
            Phase::Compiling
        } else {
            Phase::Idle
        }
    }

    /// Highest generation started so far
    pub fn latest_generation(&self) -> u64 {
        self.inner.lock().started
    }

    /// Number of results dropped for being stale
    pub fn discarded(&self) -> u64 {
        self.inner.lock().discarded
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.inner.capabilities
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }
}

impl std::fmt::Debug for RecompileScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecompileScheduler")
            .field("window", &self.inner.window)
            .field("phase", &self.phase())
            .field("latest_generation", &self.latest_generation())
            .finish()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire(weak: &Weak<Inner>, id: u64, text: String) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        {
            let mut state = inner.lock();
            match &state.timer {
                Some((current, _)) if *current == id => state.timer = None,
                // Replaced after the sleep finished
                _ => return,
            }
        }
        Inner::start(&inner, text);
    }

    fn start(inner: &Arc<Inner>, text: String) -> u64 {
        let generation = {
            let mut state = inner.lock();
            state.started += 1;
            state.started
        };
        debug!(generation, bytes = text.len(), "Starting compile");

        let inner = Arc::clone(inner);
        let source: Arc<str> = text.into();
        tokio::spawn(async move {
            let compiler = Arc::clone(&inner.compiler);
            let capabilities = inner.capabilities.clone();
            let text = Arc::clone(&source);
            let started = Instant::now();

            let result = tokio::task::spawn_blocking(move || compiler.compile(&text, &capabilities))
                .await
                .unwrap_or_else(|err| {
                    Err(FailureInfo::new(
                        FailureKind::Evaluation,
                        format!("compiler crashed: {}", err),
                    ))
                });

            inner.finish(generation, source, result, started.elapsed());
        });

        generation
    }

    fn finish(
        &self,
        generation: u64,
        source: Arc<str>,
        result: Result<RenderableTree, FailureInfo>,
        elapsed: Duration,
    ) {
        let mut state = self.lock();
        if generation < state.started {
            state.discarded += 1;
            warn!(
                generation,
                latest = state.started,
                "Discarding stale compile result"
            );
            return;
        }
        state.applied = generation;

        self.artifact.send_modify(|artifact| {
            artifact.generation = generation;
            artifact.source = Some(source);
            match result {
                Ok(tree) => {
                    debug!(generation, elapsed_ms = elapsed.as_millis() as u64, "Compile applied");
                    artifact.tree = Some(Arc::new(tree));
                    artifact.error = None;
                }
                Err(failure) => {
                    debug!(generation, error = %failure, "Compile failed; keeping last good render");
                    artifact.error = Some(failure);
                }
            }
        });
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some((_, timer)) = state.timer.take() {
            timer.abort();
        }
    }
}
