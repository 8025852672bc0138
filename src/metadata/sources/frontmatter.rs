//! metadata::sources::frontmatter
//!
//! Metadata stored in each document's frontmatter block.
//!
//! The source caches document trees and delegates reading, writing, and
//! change detection to a [`DocumentBackend`]. [`FileDocuments`] is the
//! file system backend; [`InMemoryDocuments`] keeps documents in a shared
//! map and is what hosts (and tests) use to simulate edits.
//!
//! [`FileDocuments`]: super::file_documents::FileDocuments

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::core::types::StorageType;
use crate::metadata::source::{ExternalEvent, SourceCache, SourceError, StorageSource};

/// Where frontmatter documents live.
pub trait DocumentBackend {
    /// The frontmatter tree of a document. `None` if it does not exist.
    fn read(&mut self, storage_path: &str) -> Result<Option<Value>, SourceError>;

    /// Replace a document's frontmatter.
    fn write(&mut self, storage_path: &str, data: &Value) -> Result<(), SourceError>;

    fn exists(&self, storage_path: &str) -> bool;

    /// Documents changed or removed by someone else since the last poll.
    fn poll(&mut self) -> Vec<ExternalEvent> {
        Vec::new()
    }
}

/// The frontmatter storage source.
#[derive(Debug)]
pub struct FrontmatterSource<B> {
    cache: SourceCache,
    backend: B,
}

impl<B: DocumentBackend> FrontmatterSource<B> {
    pub fn new(backend: B) -> Self {
        Self {
            cache: SourceCache::new(),
            backend,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: DocumentBackend> StorageSource for FrontmatterSource<B> {
    fn storage_type(&self) -> StorageType {
        StorageType::Frontmatter
    }

    fn cache(&self) -> &SourceCache {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut SourceCache {
        &mut self.cache
    }

    fn load(&mut self, storage_path: &str) -> Result<Option<Value>, SourceError> {
        self.backend.read(storage_path)
    }

    fn persist(&mut self, storage_path: &str, data: &Value) -> Result<(), SourceError> {
        self.backend.write(storage_path, data)
    }

    fn exists(&self, storage_path: &str) -> bool {
        self.backend.exists(storage_path)
    }

    fn poll_external(&mut self) -> Vec<ExternalEvent> {
        self.backend.poll()
    }
}

#[derive(Debug, Default)]
struct Documents {
    trees: HashMap<String, Value>,
    events: Vec<ExternalEvent>,
    writes: usize,
}

/// Documents held in memory.
///
/// Clones share the same documents, so a test can keep a handle while the
/// source owns another. [`insert`](Self::insert) and
/// [`remove`](Self::remove) act as edits made outside the engine and are
/// reported on the next poll; writes through the backend are not.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocuments {
    inner: Rc<RefCell<Documents>>,
}

impl InMemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a document, as an external edit.
    pub fn insert(&self, storage_path: impl Into<String>, data: Value) {
        let storage_path = storage_path.into();
        let mut inner = self.inner.borrow_mut();
        inner.trees.insert(storage_path.clone(), data.clone());
        inner.events.push(ExternalEvent::Modified { storage_path, data });
    }

    /// Delete a document, as an external edit.
    pub fn remove(&self, storage_path: &str) {
        let mut inner = self.inner.borrow_mut();
        if inner.trees.remove(storage_path).is_some() {
            inner.events.push(ExternalEvent::Removed {
                storage_path: storage_path.to_string(),
            });
        }
    }

    pub fn get(&self, storage_path: &str) -> Option<Value> {
        self.inner.borrow().trees.get(storage_path).cloned()
    }

    /// Number of writes made through the backend.
    pub fn writes(&self) -> usize {
        self.inner.borrow().writes
    }
}

impl DocumentBackend for InMemoryDocuments {
    fn read(&mut self, storage_path: &str) -> Result<Option<Value>, SourceError> {
        Ok(self.get(storage_path))
    }

    fn write(&mut self, storage_path: &str, data: &Value) -> Result<(), SourceError> {
        let mut inner = self.inner.borrow_mut();
        if !inner.trees.contains_key(storage_path) {
            return Err(SourceError::DocumentNotFound(storage_path.to_string()));
        }
        inner.trees.insert(storage_path.to_string(), data.clone());
        inner.writes += 1;
        Ok(())
    }

    fn exists(&self, storage_path: &str) -> bool {
        self.inner.borrow().trees.contains_key(storage_path)
    }

    fn poll(&mut self) -> Vec<ExternalEvent> {
        std::mem::take(&mut self.inner.borrow_mut().events)
    }
}
