//! Content persistence and image upload collaborators.
//!
//! Documents are addressed by `(category, name)`. The editor only touches a
//! store on explicit load and save, never while compiling.

use crate::errors::{StoreError, UploadError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Where a document lives in a [`ContentStore`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentRef {
    pub category: String,
    pub name: String,
}

impl DocumentRef {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

/// Content storage abstraction for persistence and testing
pub trait ContentStore: Send + Sync {
    /// Read a document
    fn get(&self, doc: &DocumentRef) -> Result<String, StoreError>;

    /// Overwrite an existing document
    fn put(&self, doc: &DocumentRef, text: &str) -> Result<(), StoreError>;

    /// Create a document that must not exist yet
    fn create(&self, doc: &DocumentRef, text: &str) -> Result<(), StoreError>;

    /// Remove a document
    fn delete(&self, doc: &DocumentRef) -> Result<(), StoreError>;

    /// Names in a category, sorted
    fn list(&self, category: &str) -> Result<Vec<String>, StoreError>;
}

fn check_segment(segment: &str) -> Result<(), StoreError> {
    let bad = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\'])
        || segment.starts_with('.');
    if bad {
        Err(StoreError::InvalidName(segment.to_string()))
    } else {
        Ok(())
    }
}

fn check(doc: &DocumentRef) -> Result<(), StoreError> {
    check_segment(&doc.category)?;
    check_segment(&doc.name)
}

fn not_found(doc: &DocumentRef) -> StoreError {
    StoreError::NotFound {
        category: doc.category.clone(),
        name: doc.name.clone(),
    }
}

/// One directory per category under `root`
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, doc: &DocumentRef) -> Result<PathBuf, StoreError> {
        check(doc)?;
        Ok(self.root.join(&doc.category).join(&doc.name))
    }
}

impl ContentStore for FsContentStore {
    fn get(&self, doc: &DocumentRef) -> Result<String, StoreError> {
        let path = self.path(doc)?;
        fs::read_to_string(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => not_found(doc),
            _ => StoreError::Io(err),
        })
    }

    fn put(&self, doc: &DocumentRef, text: &str) -> Result<(), StoreError> {
        let path = self.path(doc)?;
        if !path.is_file() {
            return Err(not_found(doc));
        }
        fs::write(&path, text)?;
        Ok(())
    }

    fn create(&self, doc: &DocumentRef, text: &str) -> Result<(), StoreError> {
        let path = self.path(doc)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|err| match err.kind() {
                ErrorKind::AlreadyExists => StoreError::AlreadyExists {
                    category: doc.category.clone(),
                    name: doc.name.clone(),
                },
                _ => StoreError::Io(err),
            })?;
        std::io::Write::write_all(&mut file, text.as_bytes())?;
        Ok(())
    }

    fn delete(&self, doc: &DocumentRef) -> Result<(), StoreError> {
        let path = self.path(doc)?;
        fs::remove_file(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => not_found(doc),
            _ => StoreError::Io(err),
        })
    }

    fn list(&self, category: &str) -> Result<Vec<String>, StoreError> {
        check_segment(category)?;
        let dir = self.root.join(category);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// In-memory store for tests and previews
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    entries: Mutex<BTreeMap<DocumentRef, String>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, doc: DocumentRef, text: impl Into<String>) -> Self {
        self.lock().insert(doc, text.into());
        self
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<DocumentRef, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ContentStore for MemoryContentStore {
    fn get(&self, doc: &DocumentRef) -> Result<String, StoreError> {
        check(doc)?;
        self.lock().get(doc).cloned().ok_or_else(|| not_found(doc))
    }

    fn put(&self, doc: &DocumentRef, text: &str) -> Result<(), StoreError> {
        check(doc)?;
        match self.lock().get_mut(doc) {
            Some(existing) => {
                *existing = text.to_string();
                Ok(())
            }
            None => Err(not_found(doc)),
        }
    }

    fn create(&self, doc: &DocumentRef, text: &str) -> Result<(), StoreError> {
        check(doc)?;
        let mut entries = self.lock();
        if entries.contains_key(doc) {
            return Err(StoreError::AlreadyExists {
                category: doc.category.clone(),
                name: doc.name.clone(),
            });
        }
        entries.insert(doc.clone(), text.to_string());
        Ok(())
    }

    fn delete(&self, doc: &DocumentRef) -> Result<(), StoreError> {
        check(doc)?;
        self.lock().remove(doc).map(|_| ()).ok_or_else(|| not_found(doc))
    }

    fn list(&self, category: &str) -> Result<Vec<String>, StoreError> {
        check_segment(category)?;
        Ok(self
            .lock()
            .keys()
            .filter(|doc| doc.category == category)
            .map(|doc| doc.name.clone())
            .collect())
    }
}

/// Public location of an uploaded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub url: String,
}

/// Image upload service
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadedImage, UploadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str) -> DocumentRef {
        DocumentRef::new("posts", name)
    }

    fn exercise(store: &dyn ContentStore) {
        store.create(&doc("intro.md"), "# Intro").unwrap();
        assert_eq!(store.get(&doc("intro.md")).unwrap(), "# Intro");

        assert!(matches!(
            store.create(&doc("intro.md"), "again"),
            Err(StoreError::AlreadyExists { .. })
        ));

        store.put(&doc("intro.md"), "# Intro v2").unwrap();
        assert_eq!(store.get(&doc("intro.md")).unwrap(), "# Intro v2");

        store.create(&doc("about.md"), "").unwrap();
        assert_eq!(store.list("posts").unwrap(), vec!["about.md", "intro.md"]);
        assert!(store.list("drafts").unwrap().is_empty());

        store.delete(&doc("intro.md")).unwrap();
        assert!(matches!(store.get(&doc("intro.md")), Err(StoreError::NotFound { .. })));
        assert!(matches!(store.delete(&doc("intro.md")), Err(StoreError::NotFound { .. })));
        assert!(matches!(store.put(&doc("intro.md"), "x"), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryContentStore::new());
    }

    #[test]
    fn test_fs_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::new(dir.path());
        exercise(&store);
        assert!(dir.path().join("posts").join("about.md").is_file());
    }

    #[test]
    fn test_names_cannot_escape_root() {
        let store = MemoryContentStore::new();
        for name in ["", "..", "../etc", "a/b", ".hidden"] {
            assert!(matches!(
                store.get(&doc(name)),
                Err(StoreError::InvalidName(_))
            ));
        }
    }
}
