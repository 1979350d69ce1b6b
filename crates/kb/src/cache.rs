use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::EntityId;

/// Bounded in-process memo in front of the cache file. Shared by all workers.
#[derive(Clone)]
pub struct MemoryCache {
    parent_types: Arc<DashMap<String, Vec<EntityId>>>,
    candidates: Arc<DashMap<String, Vec<EntityId>>>,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            parent_types: Arc::new(DashMap::new()),
            candidates: Arc::new(DashMap::new()),
            max_entries,
        }
    }

    pub fn set_parent_types(&self, entity: &str, parents: Vec<EntityId>) {
        self.insert_bounded(&self.parent_types, entity, parents);
    }

    pub fn get_parent_types(&self, entity: &str) -> Option<Vec<EntityId>> {
        self.parent_types.get(entity).map(|r| r.value().clone())
    }

    pub fn set_candidates(&self, text: &str, candidates: Vec<EntityId>) {
        self.insert_bounded(&self.candidates, text, candidates);
    }

    pub fn get_candidates(&self, text: &str) -> Option<Vec<EntityId>> {
        self.candidates.get(text).map(|r| r.value().clone())
    }

    fn insert_bounded(&self, map: &DashMap<String, Vec<EntityId>>, key: &str, value: Vec<EntityId>) {
        if self.max_entries == 0 {
            return;
        }
        if map.len() >= self.max_entries {
            // Simple eviction: clear 25% when full
            let to_remove: Vec<_> = map
                .iter()
                .take((self.max_entries / 4).max(1))
                .map(|r| r.key().clone())
                .collect();
            for key in to_remove {
                map.remove(&key);
            }
            let stats = self.stats();
            debug!(
                parent_types = stats.parent_types_cached,
                candidates = stats.candidates_cached,
                "Memory cache full, evicted entries"
            );
        }
        map.insert(key.to_string(), value);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            parent_types_cached: self.parent_types.len(),
            candidates_cached: self.candidates.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheStats {
    pub parent_types_cached: usize,
    pub candidates_cached: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eviction_keeps_bound() {
        let cache = MemoryCache::new(4);
        for i in 0..10 {
            cache.set_parent_types(&format!("Q{}", i), vec!["Q5".to_string()]);
        }
        assert!(cache.stats().parent_types_cached <= 4);
        assert_eq!(cache.stats().candidates_cached, 0);
        assert_eq!(cache.get_parent_types("Q9"), Some(vec!["Q5".to_string()]));
    }

    #[test]
    fn test_disabled_cache() {
        let cache = MemoryCache::new(0);
        cache.set_candidates("Kraków", vec!["Q31487".to_string()]);
        assert_eq!(cache.get_candidates("Kraków"), None);
        assert_eq!(cache.stats().candidates_cached, 0);
    }
}
