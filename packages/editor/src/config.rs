//! Editor tuning knobs

use crate::errors::EditorError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TEMPLATE: &str = "---\ntitle: Untitled\n---\n\n# Untitled\n\nStart writing here.\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Quiet window before a recompile
    pub debounce_ms: u64,

    /// Typing pause that closes a history entry
    pub typing_coalesce_ms: u64,

    /// Maximum history entries
    pub history_limit: usize,

    /// Seed text for new documents
    pub new_document_template: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            typing_coalesce_ms: 1000,
            history_limit: 50,
            new_document_template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl EditorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn typing_coalesce(&self) -> Duration {
        Duration::from_millis(self.typing_coalesce_ms)
    }

    pub fn validate(&self) -> Result<(), EditorError> {
        if self.history_limit == 0 {
            return Err(EditorError::InvalidConfig("historyLimit must be at least 1".into()));
        }
        Ok(())
    }
}
