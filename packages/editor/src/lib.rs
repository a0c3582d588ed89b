//! # Scribe Editor
//!
//! Live editing engine: source buffer, undo history, toolbar commands and a
//! debounced background compiler feeding the preview.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ session: typing, toolbar commands, undo     │
//! │  - SourceDocument (text + selection)        │
//! │  - HistoryLog (bounded snapshots)           │
//! │  - ContentStore on explicit load/save       │
//! └─────────────────────────────────────────────┘
//!                     ↓ every text change
//! ┌─────────────────────────────────────────────┐
//! │ scheduler: debounce → generation → compile  │
//! │  - stale results discarded on arrival       │
//! │  - failures keep the last good tree         │
//! └─────────────────────────────────────────────┘
//!                     ↓ watch channel
//! ┌─────────────────────────────────────────────┐
//! │ CompiledArtifact { tree, error, source, .. }│
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Text is the source of truth**: trees and previews are derived views
//! 2. **Capabilities are a value**: one immutable set per session, passed in
//! 3. **Newest edit wins**: generation tokens order compile results
//! 4. **Compile failures are data**: they live in the artifact, never in `Err`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scribe_editor::{EditorConfig, EditorSession, Selection, ToolbarCommand};
//! use scribe_evaluator::{CapabilitySet, MarkupCompiler};
//! use std::sync::Arc;
//!
//! let mut session = EditorSession::new_document(
//!     &EditorConfig::default(),
//!     CapabilitySet::builtins(),
//!     Arc::new(MarkupCompiler::new()),
//! )?;
//!
//! session.set_selection(Selection::new(0, 5));
//! session.apply_command(&ToolbarCommand::Bold)?;
//! session.undo();
//!
//! let artifact = session.refresh().await;
//! ```

mod commands;
mod config;
mod debounce;
mod document;
mod errors;
mod history;
mod scheduler;
mod session;
mod store;

pub use commands::{
    insert_at_cursor, insert_line_prefix, insert_widget_template, uploaded_image_snippet,
    wrap_selection, CommandError, Edit, ToolbarCommand,
};
pub use config::{EditorConfig, DEFAULT_TEMPLATE};
pub use debounce::Debounce;
pub use document::{Selection, SourceDocument};
pub use errors::{EditorError, StoreError, UploadError};
pub use history::{HistoryLog, Snapshot, DEFAULT_CAPACITY};
pub use scheduler::{CompiledArtifact, Phase, RecompileScheduler};
pub use session::{CommandOutcome, EditorSession, Notice};
pub use store::{
    ContentStore, DocumentRef, FsContentStore, ImageUploader, MemoryContentStore, UploadedImage,
};

// Re-export common types for convenience
pub use scribe_evaluator::{CapabilitySet, Compile, FailureInfo, FailureKind, RenderableTree};
