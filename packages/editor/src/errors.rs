//! Error types for the editor

use crate::commands::CommandError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Document has no save location")]
    NoSaveTarget,

    #[error("Invalid editor config: {0}")]
    InvalidConfig(String),
}

/// Failures of the content store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{category}/{name} does not exist")]
    NotFound { category: String, name: String },

    #[error("{category}/{name} already exists")]
    AlreadyExists { category: String, name: String },

    #[error("Invalid content name '{0}'")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reported by an image uploader
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Upload rejected: {0}")]
    Rejected(String),

    #[error("Upload failed: {0}")]
    Transport(String),
}
