//! metadata::sources::global
//!
//! Process-wide shared state, reachable from every document.
//!
//! There is a single tree at [`GLOBAL_STORAGE_PATH`]. It is never evicted.

use serde_json::{Map, Value};

use crate::core::types::{StorageType, GLOBAL_STORAGE_PATH};
use crate::metadata::source::{SourceCache, SourceError, StorageSource};

#[derive(Debug, Default)]
pub struct GlobalSource {
    cache: SourceCache,
}

impl GlobalSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageSource for GlobalSource {
    fn storage_type(&self) -> StorageType {
        StorageType::GlobalMemory
    }

    fn cache(&self) -> &SourceCache {
        &self.cache
    }

    fn cache_mut(&mut self) -> &mut SourceCache {
        &mut self.cache
    }

    fn load(&mut self, storage_path: &str) -> Result<Option<Value>, SourceError> {
        if storage_path != GLOBAL_STORAGE_PATH {
            return Err(SourceError::DocumentNotFound(storage_path.to_string()));
        }
        Ok(Some(Value::Object(Map::new())))
    }

    fn persist(&mut self, _storage_path: &str, _data: &Value) -> Result<(), SourceError> {
        Ok(())
    }

    fn exists(&self, storage_path: &str) -> bool {
        storage_path == GLOBAL_STORAGE_PATH
    }

    fn evictable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prop::PropPath;
    use serde_json::json;

    #[test]
    fn never_evicted() {
        let mut source = GlobalSource::new();
        source
            .set(GLOBAL_STORAGE_PATH, &PropPath::from_segments(&["theme"]), json!("dark"))
            .unwrap();
        source.take_changes();
        source.flush_all();
        for _ in 0..10 {
            assert!(source.evict_idle(1).is_empty());
        }
        assert_eq!(source.get(GLOBAL_STORAGE_PATH).unwrap(), json!({"theme": "dark"}));
    }

    #[test]
    fn other_paths_rejected() {
        let mut source = GlobalSource::new();
        assert!(source.get("a.md").is_err());
        assert!(!source.exists("a.md"));
    }
}
