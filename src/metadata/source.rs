//! metadata::source
//!
//! The storage source abstraction and its shared cache.
//!
//! # Cache
//!
//! Every source keeps a [`SourceCache`]: one [`CacheEntry`] per storage path
//! holding the current tree, the changes not yet broadcast, and the write
//! state. The manager is the only caller that mutates entries.
//!
//! # Consistency
//!
//! - A write is applied to the cached tree immediately, so a read right
//!   after it sees the new value.
//! - The write is recorded as a pending change and broadcast on the next
//!   cycle, excluding the subscription that made it.
//! - The tree is persisted to the backend once it has gone
//!   `flush_delay_cycles` cycles without a new write.
//! - An external change whose tree equals the cached tree is the echo of
//!   our own flush and is ignored.

use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::prop::{NavigationError, PropPath};
use crate::core::types::{StorageType, SubscriptionId};

/// Errors from storage sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A write or read navigated through the wrong container kind.
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error("document '{0}' does not exist")]
    DocumentNotFound(String),

    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A document's metadata block could not be read or written.
    #[error("invalid metadata in '{path}': {message}")]
    Format { path: String, message: String },
}

/// A change reported by a backend between cycles.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalEvent {
    Modified { storage_path: String, data: Value },
    Removed { storage_path: String },
}

/// One path written since the last cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub path: PropPath,
    /// The subscription that wrote it, if any.
    pub writer: Option<SubscriptionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    /// The whole tree was replaced from outside.
    Whole,
    Paths(Vec<ChangeRecord>),
    /// The document is gone.
    Removed,
}

/// Everything that happened to one storage path since the last cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceChange {
    pub storage_path: String,
    pub kind: ChangeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: Value,
    /// Whether the backend has the document.
    pub exists: bool,
    /// Written since the last persist.
    pub dirty: bool,
    pub cycles_since_write: u32,
    pub changes: Vec<ChangeRecord>,
    pub replaced: bool,
    pub removed: bool,
    pub subscribers: usize,
    pub idle_cycles: u32,
}

impl CacheEntry {
    pub fn new(data: Option<Value>) -> Self {
        Self {
            exists: data.is_some(),
            data: data.unwrap_or(Value::Null),
            dirty: false,
            cycles_since_write: 0,
            changes: Vec::new(),
            replaced: false,
            removed: false,
            subscribers: 0,
            idle_cycles: 0,
        }
    }

    fn has_pending_changes(&self) -> bool {
        self.replaced || self.removed || !self.changes.is_empty()
    }
}

/// Per storage path cache shared by every source.
#[derive(Debug, Clone, Default)]
pub struct SourceCache {
    entries: HashMap<String, CacheEntry>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, storage_path: &str) -> Option<&CacheEntry> {
        self.entries.get(storage_path)
    }

    pub fn get_mut(&mut self, storage_path: &str) -> Option<&mut CacheEntry> {
        self.entries.get_mut(storage_path)
    }

    pub fn contains(&self, storage_path: &str) -> bool {
        self.entries.contains_key(storage_path)
    }

    pub fn insert(&mut self, storage_path: impl Into<String>, entry: CacheEntry) {
        self.entries.insert(storage_path.into(), entry);
    }

    pub fn remove(&mut self, storage_path: &str) -> Option<CacheEntry> {
        self.entries.remove(storage_path)
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.entries.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A pluggable metadata backend.
///
/// Implementors provide storage access (`load`, `persist`, `exists`) and
/// the cache; reads, writes, change tracking, flushing, and eviction are
/// provided on top of them.
pub trait StorageSource {
    fn storage_type(&self) -> StorageType;

    fn cache(&self) -> &SourceCache;

    fn cache_mut(&mut self) -> &mut SourceCache;

    /// Read a document tree from the backend. `None` if it does not exist.
    fn load(&mut self, storage_path: &str) -> Result<Option<Value>, SourceError>;

    /// Write a document tree to the backend.
    fn persist(&mut self, storage_path: &str, data: &Value) -> Result<(), SourceError>;

    fn exists(&self, storage_path: &str) -> bool;

    /// Changes made to the backend by someone else since the last poll.
    fn poll_external(&mut self) -> Vec<ExternalEvent> {
        Vec::new()
    }

    /// Whether unobserved entries may be dropped from the cache.
    fn evictable(&self) -> bool {
        true
    }

    /// The cache entry for a path, loading it on first use.
    fn entry(&mut self, storage_path: &str) -> Result<&mut CacheEntry, SourceError> {
        if !self.cache().contains(storage_path) {
            let data = self.load(storage_path)?;
            debug!(
                storage_type = %self.storage_type(),
                storage_path,
                exists = data.is_some(),
                "loaded document into cache"
            );
            self.cache_mut().insert(storage_path, CacheEntry::new(data));
        }
        self.cache_mut()
            .get_mut(storage_path)
            .ok_or_else(|| SourceError::DocumentNotFound(storage_path.to_string()))
    }

    /// A snapshot of the whole tree at a path.
    fn get(&mut self, storage_path: &str) -> Result<Value, SourceError> {
        Ok(self.entry(storage_path)?.data.clone())
    }

    /// Set one value, with no writing subscription.
    fn set(&mut self, storage_path: &str, prop: &PropPath, value: Value) -> Result<bool, SourceError> {
        self.write(storage_path, prop, value, None)
    }

    /// Apply a write to the cache and queue it for broadcast and persist.
    ///
    /// Returns `false` (and records nothing) if the value is unchanged.
    fn write(
        &mut self,
        storage_path: &str,
        prop: &PropPath,
        value: Value,
        writer: Option<SubscriptionId>,
    ) -> Result<bool, SourceError> {
        let entry = self.entry(storage_path)?;
        if prop.get_or_null(&entry.data)? == value {
            return Ok(false);
        }
        if prop.is_empty() {
            entry.data = value;
        } else {
            if entry.data.is_null() {
                entry.data = Value::Object(Map::new());
            }
            prop.create(&mut entry.data)?;
            prop.set(&mut entry.data, value)?;
        }
        entry.dirty = true;
        entry.cycles_since_write = 0;
        entry.changes.push(ChangeRecord {
            path: prop.clone(),
            writer,
        });
        Ok(true)
    }

    /// Replace a cached tree with one changed outside the engine.
    ///
    /// Unflushed writes to the same path are discarded, and a removal
    /// queued in the same cycle is cancelled. Returns whether anything
    /// changed.
    fn on_external_change(&mut self, storage_path: &str, data: Value) -> bool {
        let storage_type = self.storage_type();
        let Some(entry) = self.cache_mut().get_mut(storage_path) else {
            return false;
        };
        let recreated = std::mem::take(&mut entry.removed);
        entry.exists = true;
        if entry.data == data {
            if recreated {
                debug!(%storage_type, storage_path, "document recreated unchanged");
            } else {
                debug!(%storage_type, storage_path, "ignoring external change equal to cache");
            }
            return false;
        }
        if entry.dirty {
            warn!(%storage_type, storage_path, "external change overrides unflushed writes");
        }
        entry.data = data;
        entry.dirty = false;
        entry.changes.clear();
        entry.replaced = true;
        true
    }

    fn on_removed(&mut self, storage_path: &str) -> bool {
        match self.cache_mut().get_mut(storage_path) {
            Some(entry) => {
                entry.removed = true;
                entry.exists = false;
                entry.dirty = false;
                true
            }
            None => false,
        }
    }

    /// Drain pending changes, one per storage path.
    fn take_changes(&mut self) -> Vec<SourceChange> {
        let mut changes = Vec::new();
        for path in self.cache().paths() {
            let Some(entry) = self.cache_mut().get_mut(&path) else {
                continue;
            };
            if !entry.has_pending_changes() {
                continue;
            }
            let kind = if entry.removed {
                ChangeKind::Removed
            } else if entry.replaced {
                ChangeKind::Whole
            } else {
                ChangeKind::Paths(std::mem::take(&mut entry.changes))
            };
            entry.replaced = false;
            entry.changes.clear();
            changes.push(SourceChange {
                storage_path: path,
                kind,
            });
        }
        changes
    }

    /// Persist every dirty entry that has waited `delay` cycles.
    ///
    /// Returns the paths persisted and the failures.
    fn flush_due(&mut self, delay: u32) -> (Vec<String>, Vec<(String, SourceError)>) {
        let mut due = Vec::new();
        for path in self.cache().paths() {
            if let Some(entry) = self.cache_mut().get_mut(&path) {
                if entry.dirty {
                    entry.cycles_since_write += 1;
                    if entry.cycles_since_write >= delay {
                        due.push(path);
                    }
                }
            }
        }
        self.persist_paths(due)
    }

    /// Persist every dirty entry now.
    fn flush_all(&mut self) -> (Vec<String>, Vec<(String, SourceError)>) {
        let dirty = self
            .cache()
            .paths()
            .into_iter()
            .filter(|p| self.cache().get(p).is_some_and(|e| e.dirty))
            .collect();
        self.persist_paths(dirty)
    }

    fn persist_paths(&mut self, paths: Vec<String>) -> (Vec<String>, Vec<(String, SourceError)>) {
        let mut flushed = Vec::new();
        let mut failed = Vec::new();
        for path in paths {
            let Some(data) = self.cache().get(&path).map(|e| e.data.clone()) else {
                continue;
            };
            let result = self.persist(&path, &data);
            if let Some(entry) = self.cache_mut().get_mut(&path) {
                entry.dirty = false;
                entry.cycles_since_write = 0;
                if result.is_ok() {
                    entry.exists = true;
                }
            }
            match result {
                Ok(()) => flushed.push(path),
                Err(e) => failed.push((path, e)),
            }
        }
        (flushed, failed)
    }

    fn add_subscriber(&mut self, storage_path: &str) -> Result<(), SourceError> {
        let entry = self.entry(storage_path)?;
        entry.subscribers += 1;
        entry.idle_cycles = 0;
        Ok(())
    }

    fn remove_subscriber(&mut self, storage_path: &str) {
        if let Some(entry) = self.cache_mut().get_mut(storage_path) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
        }
    }

    /// Drop entries nobody has observed for `max_idle` cycles.
    ///
    /// Entries with unflushed writes or undelivered changes stay.
    fn evict_idle(&mut self, max_idle: u32) -> Vec<String> {
        if !self.evictable() {
            return Vec::new();
        }
        let mut evicted = Vec::new();
        for path in self.cache().paths() {
            let Some(entry) = self.cache_mut().get_mut(&path) else {
                continue;
            };
            if entry.subscribers > 0 || entry.dirty || entry.has_pending_changes() {
                entry.idle_cycles = 0;
                continue;
            }
            entry.idle_cycles += 1;
            if entry.idle_cycles >= max_idle {
                self.cache_mut().remove(&path);
                evicted.push(path);
            }
        }
        evicted
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// A source over a plain map, counting persists.
    #[derive(Default)]
    pub(crate) struct MapSource {
        pub cache: SourceCache,
        pub backend: HashMap<String, Value>,
        pub persists: usize,
    }

    impl StorageSource for MapSource {
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
            Ok(self.backend.get(storage_path).cloned())
        }
        fn persist(&mut self, storage_path: &str, data: &Value) -> Result<(), SourceError> {
            self.persists += 1;
            self.backend.insert(storage_path.to_string(), data.clone());
            Ok(())
        }
        fn exists(&self, storage_path: &str) -> bool {
            self.backend.contains_key(storage_path)
        }
    }

    fn path(segments: &[&str]) -> PropPath {
        PropPath::from_segments(segments)
    }

    mod writes {
        use super::*;

        #[test]
        fn read_your_own_write() {
            let mut source = MapSource::default();
            source.set("a.md", &path(&["x", "0"]), json!(1)).unwrap();
            assert_eq!(source.get("a.md").unwrap(), json!({"x": [1]}));
            assert_eq!(source.persists, 0);
        }

        #[test]
        fn unchanged_write_is_skipped() {
            let mut source = MapSource::default();
            source.backend.insert("a.md".into(), json!({"x": 1}));
            assert!(!source.set("a.md", &path(&["x"]), json!(1)).unwrap());
            assert!(source.take_changes().is_empty());
        }

        #[test]
        fn mismatch_is_error() {
            let mut source = MapSource::default();
            source.backend.insert("a.md".into(), json!({"x": "text"}));
            let err = source.set("a.md", &path(&["x", "y"]), json!(1)).unwrap_err();
            assert!(matches!(err, SourceError::Navigation(_)));
        }

        #[test]
        fn changes_record_writer() {
            let mut source = MapSource::default();
            let id = SubscriptionId::new();
            source.write("a.md", &path(&["x"]), json!(1), Some(id)).unwrap();
            let changes = source.take_changes();
            assert_eq!(changes.len(), 1);
            match &changes[0].kind {
                ChangeKind::Paths(records) => assert_eq!(records[0].writer, Some(id)),
                other => panic!("unexpected change {other:?}"),
            }
            assert!(source.take_changes().is_empty());
        }
    }

    mod flushing {
        use super::*;

        #[test]
        fn coalesces_until_delay() {
            let mut source = MapSource::default();
            source.set("a.md", &path(&["x"]), json!(1)).unwrap();
            source.set("a.md", &path(&["x"]), json!(2)).unwrap();

            let (flushed, _) = source.flush_due(2);
            assert!(flushed.is_empty());
            let (flushed, _) = source.flush_due(2);
            assert_eq!(flushed, vec!["a.md".to_string()]);
            assert_eq!(source.persists, 1);
            assert_eq!(source.backend["a.md"], json!({"x": 2}));
        }

        #[test]
        fn flush_all_ignores_delay() {
            let mut source = MapSource::default();
            source.set("a.md", &path(&["x"]), json!(1)).unwrap();
            source.flush_all();
            assert_eq!(source.persists, 1);
        }
    }

    mod external {
        use super::*;

        #[test]
        fn echo_is_ignored() {
            let mut source = MapSource::default();
            source.set("a.md", &path(&["x"]), json!(1)).unwrap();
            source.take_changes();
            assert!(!source.on_external_change("a.md", json!({"x": 1})));
            assert!(source.take_changes().is_empty());
        }

        #[test]
        fn replacement_is_whole_change() {
            let mut source = MapSource::default();
            source.get("a.md").unwrap();
            assert!(source.on_external_change("a.md", json!({"y": 2})));
            let changes = source.take_changes();
            assert_eq!(changes[0].kind, ChangeKind::Whole);
        }

        #[test]
        fn uncached_change_is_ignored() {
            let mut source = MapSource::default();
            assert!(!source.on_external_change("b.md", json!({})));
        }

        #[test]
        fn removal() {
            let mut source = MapSource::default();
            source.get("a.md").unwrap();
            assert!(source.on_removed("a.md"));
            assert_eq!(source.take_changes()[0].kind, ChangeKind::Removed);
        }

        #[test]
        fn recreation_cancels_removal() {
            let mut source = MapSource::default();
            source.backend.insert("a.md".into(), json!({"x": 1}));
            source.get("a.md").unwrap();
            source.on_removed("a.md");
            assert!(source.on_external_change("a.md", json!({"x": 2})));
            assert_eq!(source.take_changes()[0].kind, ChangeKind::Whole);
            assert!(source.cache().get("a.md").unwrap().exists);
        }

        #[test]
        fn unchanged_recreation_is_no_change() {
            let mut source = MapSource::default();
            source.backend.insert("a.md".into(), json!({"x": 1}));
            source.get("a.md").unwrap();
            source.on_removed("a.md");
            assert!(!source.on_external_change("a.md", json!({"x": 1})));
            assert!(source.take_changes().is_empty());
        }
    }

    mod eviction {
        use super::*;

        #[test]
        fn idle_entries_evicted() {
            let mut source = MapSource::default();
            source.get("a.md").unwrap();
            assert!(source.evict_idle(2).is_empty());
            assert_eq!(source.evict_idle(2), vec!["a.md".to_string()]);
            assert!(source.cache().is_empty());
        }

        #[test]
        fn observed_entries_stay() {
            let mut source = MapSource::default();
            source.add_subscriber("a.md").unwrap();
            for _ in 0..5 {
                source.evict_idle(1);
            }
            assert!(source.cache().contains("a.md"));
            source.remove_subscriber("a.md");
            assert_eq!(source.evict_idle(1).len(), 1);
        }

        #[test]
        fn dirty_entries_stay() {
            let mut source = MapSource::default();
            source.set("a.md", &path(&["x"]), json!(1)).unwrap();
            source.take_changes();
            source.evict_idle(1);
            assert!(source.cache().contains("a.md"));
        }
    }
}
