//! Editing session: one document, its history and its live preview

use crate::commands::{insert_at_cursor, uploaded_image_snippet, Edit, ToolbarCommand};
use crate::config::EditorConfig;
use crate::debounce::Debounce;
use crate::document::{Selection, SourceDocument};
use crate::errors::{EditorError, StoreError, UploadError};
use crate::history::{HistoryLog, Snapshot};
use crate::scheduler::{CompiledArtifact, RecompileScheduler};
use crate::store::{ContentStore, DocumentRef, ImageUploader, UploadedImage};
use scribe_evaluator::{CapabilitySet, Compile};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Message for the author that stays until dismissed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub message: String,
}

/// What the host should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Selection to show
    pub selection: Selection,
    /// Give the text area focus back
    pub restore_focus: bool,
    /// A history entry was added
    pub recorded: bool,
}

/// Owns the source document, its history and the recompile scheduler.
///
/// Must be created and driven inside a Tokio runtime.
pub struct EditorSession {
    target: Option<DocumentRef>,
    document: SourceDocument,
    history: HistoryLog,
    typing: Debounce,
    capabilities: CapabilitySet,
    scheduler: RecompileScheduler,
    notices: Vec<Notice>,
    next_notice: u64,
}

impl EditorSession {
    /// Start an unsaved document seeded from the configured template
    pub fn new_document(
        config: &EditorConfig,
        capabilities: CapabilitySet,
        compiler: Arc<dyn Compile>,
    ) -> Result<Self, EditorError> {
        config.validate()?;
        let document = SourceDocument::unsaved(config.new_document_template.clone());
        info!("Started new document");
        Ok(Self::build(None, document, config, capabilities, compiler))
    }

    /// Load `target` from `store`
    pub fn open(
        store: &dyn ContentStore,
        target: DocumentRef,
        config: &EditorConfig,
        capabilities: CapabilitySet,
        compiler: Arc<dyn Compile>,
    ) -> Result<Self, EditorError> {
        config.validate()?;
        let text = store.get(&target)?;
        info!(document = %target, bytes = text.len(), "Opened document");
        Ok(Self::build(
            Some(target),
            SourceDocument::new(text),
            config,
            capabilities,
            compiler,
        ))
    }

    fn build(
        target: Option<DocumentRef>,
        document: SourceDocument,
        config: &EditorConfig,
        capabilities: CapabilitySet,
        compiler: Arc<dyn Compile>,
    ) -> Self {
        let history = HistoryLog::with_capacity(
            Snapshot::new(document.text(), document.selection()),
            config.history_limit,
        );
        let scheduler = RecompileScheduler::new(compiler, capabilities.clone(), config.debounce());
        // First preview without waiting out the quiet window
        scheduler.compile_now(document.text());

        Self {
            target,
            document,
            history,
            typing: Debounce::new(config.typing_coalesce()),
            capabilities,
            scheduler,
            notices: Vec::new(),
            next_notice: 1,
        }
    }

    pub fn text(&self) -> &str {
        self.document.text()
    }

    pub fn selection(&self) -> Selection {
        self.document.selection()
    }

    pub fn document(&self) -> &SourceDocument {
        &self.document
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn target(&self) -> Option<&DocumentRef> {
        self.target.as_ref()
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn scheduler(&self) -> &RecompileScheduler {
        &self.scheduler
    }

    pub fn is_dirty(&self) -> bool {
        self.document.is_dirty()
    }

    /// Commands for the toolbar, including one per registered widget
    pub fn toolbar(&self) -> Vec<ToolbarCommand> {
        ToolbarCommand::toolbar(&self.capabilities)
    }

    // ------------------------------------------------------------------
    // Typing
    // ------------------------------------------------------------------

    /// Free typing: replace the buffer. History is recorded once typing
    /// pauses for the coalescing window (see [`flush_typing`](Self::flush_typing)).
    pub fn input(&mut self, text: impl Into<String>, selection: Selection, now: Instant) {
        // A burst whose window already closed is its own entry
        self.flush_typing(now);
        if self.document.replace(text, selection) {
            self.typing.touch(now);
            self.scheduler.notify(self.document.text());
        }
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.document.select(selection);
    }

    /// Record the typed text if the author has paused long enough
    pub fn flush_typing(&mut self, now: Instant) -> bool {
        if self.typing.take_if_due(now) {
            self.record()
        } else {
            false
        }
    }

    /// When the pending typing entry will close, if any
    pub fn typing_deadline(&self) -> Option<Instant> {
        self.typing.deadline()
    }

    fn commit_typing(&mut self) {
        if self.typing.take() {
            self.record();
        }
    }

    fn has_uncommitted_typing(&self) -> bool {
        self.typing.is_pending() && self.document.text() != self.history.current().text
    }

    fn record(&mut self) -> bool {
        self.history
            .record(Snapshot::new(self.document.text(), self.document.selection()))
    }

    // ------------------------------------------------------------------
    // Commands and history
    // ------------------------------------------------------------------

    pub fn apply_command(&mut self, command: &ToolbarCommand) -> Result<CommandOutcome, EditorError> {
        self.commit_typing();
        let edit = command.apply(self.document.text(), self.document.selection(), &self.capabilities)?;
        debug!(command = %command.label(), "Applying toolbar command");
        Ok(self.commit_edit(edit))
    }

    fn commit_edit(&mut self, edit: Edit) -> CommandOutcome {
        let changed = self.document.replace(edit.text, edit.selection);
        let recorded = self.record();
        if changed {
            self.scheduler.notify(self.document.text());
        }
        CommandOutcome {
            selection: self.document.selection(),
            restore_focus: true,
            recorded,
        }
    }

    /// Step back one entry. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.commit_typing();
        match self.history.undo().cloned() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    /// Step forward one entry. Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        self.commit_typing();
        match self.history.redo().cloned() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo() || self.has_uncommitted_typing()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo() && !self.has_uncommitted_typing()
    }

    fn restore(&mut self, snapshot: Snapshot) {
        if self.document.replace(snapshot.text, snapshot.selection) {
            self.scheduler.notify(self.document.text());
        }
    }

    // ------------------------------------------------------------------
    // Preview
    // ------------------------------------------------------------------

    pub fn artifact(&self) -> CompiledArtifact {
        self.scheduler.artifact()
    }

    pub fn subscribe(&self) -> watch::Receiver<CompiledArtifact> {
        self.scheduler.subscribe()
    }

    /// Compile the current text without waiting and return the result
    pub async fn refresh(&self) -> CompiledArtifact {
        let generation = self.scheduler.compile_now(self.document.text());
        self.scheduler.wait_for(generation).await
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write the buffer to its store location, creating it if needed
    pub fn save(&mut self, store: &dyn ContentStore) -> Result<(), EditorError> {
        let target = self.target.as_ref().ok_or(EditorError::NoSaveTarget)?;
        match store.put(target, self.document.text()) {
            Err(StoreError::NotFound { .. }) => store.create(target, self.document.text())?,
            result => result?,
        }
        self.document.mark_saved();
        info!(document = %target, "Saved document");
        Ok(())
    }

    /// Create the document at a new location and make it the save target
    pub fn save_as(&mut self, store: &dyn ContentStore, target: DocumentRef) -> Result<(), EditorError> {
        store.create(&target, self.document.text())?;
        info!(document = %target, "Saved document under new name");
        self.target = Some(target);
        self.document.mark_saved();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Uploads and notices
    // ------------------------------------------------------------------

    /// Upload an image and insert a figure for it at the cursor
    pub async fn upload_image(
        &mut self,
        uploader: &dyn ImageUploader,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Option<CommandOutcome> {
        let result = uploader.upload(file_name, bytes).await;
        self.insert_uploaded_image(result)
    }

    /// Feed an upload result into the document. Failures become a notice
    /// and leave the text alone.
    pub fn insert_uploaded_image(
        &mut self,
        result: Result<UploadedImage, UploadError>,
    ) -> Option<CommandOutcome> {
        match result {
            Ok(image) => {
                self.commit_typing();
                let edit = insert_at_cursor(
                    self.document.text(),
                    self.document.selection(),
                    &uploaded_image_snippet(&image.url),
                );
                Some(self.commit_edit(edit))
            }
            Err(err) => {
                warn!(error = %err, "Image upload failed");
                self.push_notice(err.to_string());
                None
            }
        }
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn dismiss_notice(&mut self, id: u64) -> bool {
        let before = self.notices.len();
        self.notices.retain(|notice| notice.id != id);
        self.notices.len() != before
    }

    fn push_notice(&mut self, message: String) {
        let id = self.next_notice;
        self.next_notice += 1;
        self.notices.push(Notice { id, message });
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("target", &self.target)
            .field("dirty", &self.is_dirty())
            .field("history_len", &self.history.len())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
