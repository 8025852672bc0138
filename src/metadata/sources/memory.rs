//! metadata::sources::memory
//!
//! Transient per-document scratch state.
//!
//! Every storage path exists and starts as an empty object. Nothing is
//! persisted: the cache is the store, so an evicted entry starts over.

use serde_json::{Map, Value};

use crate::core::types::StorageType;
use crate::metadata::source::{SourceCache, SourceError, StorageSource};

#[derive(Debug, Default)]
pub struct MemorySource {
    cache: SourceCache,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageSource for MemorySource {
    fn storage_type(&self) -> StorageType {
        StorageType::Memory
    }

    fn cache(&self) -> &SourceCache {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut SourceCache {
        &mut self.cache
    }

    fn load(&mut self, _storage_path: &str) -> Result<Option<Value>, SourceError> {
        Ok(Some(Value::Object(Map::new())))
    }

    fn persist(&mut self, _storage_path: &str, _data: &Value) -> Result<(), SourceError> {
        Ok(())
    }

    fn exists(&self, _storage_path: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prop::PropPath;
    use serde_json::json;

    #[test]
    fn starts_empty() {
        let mut source = MemorySource::new();
        assert_eq!(source.get("a.md").unwrap(), json!({}));
    }

    #[test]
    fn paths_are_independent() {
        let mut source = MemorySource::new();
        let prop = PropPath::from_segments(&["n"]);
        source.set("a.md", &prop, json!(1)).unwrap();
        assert_eq!(source.get("b.md").unwrap(), json!({}));
    }

    #[test]
    fn eviction_forgets() {
        let mut source = MemorySource::new();
        source.set("a.md", &PropPath::from_segments(&["n"]), json!(1)).unwrap();
        source.take_changes();
        source.flush_all();
        source.evict_idle(1);
        assert_eq!(source.get("a.md").unwrap(), json!({}));
    }
}
