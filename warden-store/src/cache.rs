//! In-memory cache stores.
//!
//! `MemoryCache` is a plain key-value map and offers no tags, so a clipboard
//! over it invalidates key by key. `TaggedMemoryCache` hands out tag-scoped
//! views that can be flushed in one call.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use warden_engine::{CacheError, CacheStore, TaggedStore};

/// A process-local cache without tag support.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn forever(&self, key: &str, value: Value) -> Result<(), CacheError> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.write().remove(key).is_some())
    }
}

type Namespaces = Arc<RwLock<HashMap<String, HashMap<String, Value>>>>;

/// A process-local cache with tag support.
///
/// Each tag is its own namespace: equal keys under different tags are
/// different entries, and flushing a tag leaves every other tag alone.
/// Entries written without a tag live in the empty namespace.
#[derive(Debug, Clone, Default)]
pub struct TaggedMemoryCache {
    namespaces: Namespaces,
}

impl TaggedMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is stored under `tag`.
    pub fn contains(&self, tag: &str, key: &str) -> bool {
        self.namespaces
            .read()
            .get(tag)
            .is_some_and(|entries| entries.contains_key(key))
    }

    /// Number of entries stored under `tag`.
    pub fn len(&self, tag: &str) -> usize {
        self.namespaces.read().get(tag).map_or(0, HashMap::len)
    }
}

impl CacheStore for TaggedMemoryCache {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        Ok(namespace_get(&self.namespaces, "", key))
    }

    fn forever(&self, key: &str, value: Value) -> Result<(), CacheError> {
        namespace_put(&self.namespaces, "", key, value);
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<bool, CacheError> {
        Ok(namespace_forget(&self.namespaces, "", key))
    }

    fn tagged(&self, tag: &str) -> Option<Arc<dyn TaggedStore>> {
        Some(Arc::new(TagView {
            namespaces: self.namespaces.clone(),
            tag: tag.to_string(),
        }))
    }
}

/// One tag's view of a [`TaggedMemoryCache`].
struct TagView {
    namespaces: Namespaces,
    tag: String,
}

impl CacheStore for TagView {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        Ok(namespace_get(&self.namespaces, &self.tag, key))
    }

    fn forever(&self, key: &str, value: Value) -> Result<(), CacheError> {
        namespace_put(&self.namespaces, &self.tag, key, value);
        Ok(())
    }

    fn forget(&self, key: &str) -> Result<bool, CacheError> {
        Ok(namespace_forget(&self.namespaces, &self.tag, key))
    }
}

impl TaggedStore for TagView {
    fn flush(&self) -> Result<(), CacheError> {
        self.namespaces.write().remove(&self.tag);
        Ok(())
    }
}

fn namespace_get(namespaces: &Namespaces, tag: &str, key: &str) -> Option<Value> {
    namespaces.read().get(tag).and_then(|entries| entries.get(key).cloned())
}

fn namespace_put(namespaces: &Namespaces, tag: &str, key: &str, value: Value) {
    namespaces
        .write()
        .entry(tag.to_string())
        .or_default()
        .insert(key.to_string(), value);
}

fn namespace_forget(namespaces: &Namespaces, tag: &str, key: &str) -> bool {
    namespaces
        .write()
        .get_mut(tag)
        .is_some_and(|entries| entries.remove(key).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_cache_has_no_tags() {
        let cache = MemoryCache::new();
        assert!(cache.tagged("warden").is_none());

        cache.forever("a", json!([1])).unwrap();
        assert_eq!(cache.get("a").unwrap(), Some(json!([1])));
        assert!(cache.forget("a").unwrap());
        assert!(!cache.forget("a").unwrap());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_tags_are_separate_namespaces() {
        let cache = TaggedMemoryCache::new();
        let acme = cache.tagged("warden-acme").unwrap();
        let globex = cache.tagged("warden-globex").unwrap();

        acme.forever("key", json!("acme")).unwrap();
        globex.forever("key", json!("globex")).unwrap();

        assert_eq!(acme.get("key").unwrap(), Some(json!("acme")));
        assert_eq!(globex.get("key").unwrap(), Some(json!("globex")));
        assert_eq!(cache.get("key").unwrap(), None);
    }

    #[test]
    fn test_flush_only_clears_its_tag() {
        let cache = TaggedMemoryCache::new();
        let acme = cache.tagged("warden-acme").unwrap();
        let globex = cache.tagged("warden-globex").unwrap();

        acme.forever("one", json!(1)).unwrap();
        acme.forever("two", json!(2)).unwrap();
        globex.forever("one", json!(1)).unwrap();

        acme.flush().unwrap();

        assert_eq!(cache.len("warden-acme"), 0);
        assert_eq!(cache.len("warden-globex"), 1);
        assert!(cache.contains("warden-globex", "one"));
    }
}
