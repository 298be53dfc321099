//! Query result caching.
//!
//! [`QueryCache`] is the collaborator interface consulted by
//! [`crate::Query::execute`] for cacheable SELECTs. [`MemoryCache`] is the
//! in-process implementation: a mutex-guarded map with deadline-based
//! expiry. Looking up a key removes an expired entry as a side effect.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::row::Row;

/// External cache collaborator for materialized result sets.
pub trait QueryCache: Send + Sync {
    /// Fetch the rows stored under `key`, if present and fresh.
    fn get(&self, key: &str) -> Option<Vec<Row>>;

    /// Store `rows` under `key` for `lifetime`.
    fn set(&self, key: &str, rows: Vec<Row>, lifetime: Duration);
}

#[derive(Debug)]
struct CacheSlot {
    rows: Vec<Row>,
    expires_at: Instant,
}

/// In-process [`QueryCache`] implementation.
#[derive(Debug, Default)]
pub struct MemoryCache {
    inner: Mutex<HashMap<String, CacheSlot>>,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }
}

impl QueryCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Vec<Row>> {
        let mut inner = self.inner.lock().unwrap();
        match inner.get(key) {
            Some(slot) if slot.expires_at > Instant::now() => Some(slot.rows.clone()),
            Some(_) => {
                // Stale entry: the lookup itself evicts it.
                inner.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, rows: Vec<Row>, lifetime: Duration) {
        let slot = CacheSlot {
            rows,
            expires_at: Instant::now() + lifetime,
        };
        self.inner.lock().unwrap().insert(key.to_string(), slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::sync::Arc;

    fn row() -> Row {
        let columns: Arc<[String]> = vec!["n".to_string()].into();
        Row::new(columns, vec![Value::Int(1)])
    }

    #[test]
    fn round_trip() {
        let cache = MemoryCache::new();
        cache.set("k", vec![row()], Duration::from_secs(60));
        let rows = cache.get("k").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn miss_on_unknown_key() {
        let cache = MemoryCache::new();
        assert!(cache.get("nope").is_none());
    }

    #[test]
    fn expired_entry_is_evicted_by_lookup() {
        let cache = MemoryCache::new();
        cache.set("k", vec![row()], Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get("k").is_none());
        assert_eq!(cache.len(), 0);
    }
}
