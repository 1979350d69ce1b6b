use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::cache::MemoryCache;
use crate::error::KbError;
use crate::store::CacheStore;
use crate::{EntityId, KnowledgeBaseApi, is_queryable};

/// Cache-file backend: memo, then the redb file, then the remote backend.
/// Remote answers (empty ones included) are written back to both layers.
pub struct CachedKnowledgeBase {
    remote: Arc<dyn KnowledgeBaseApi>,
    store: CacheStore,
    memory: MemoryCache,
}

impl CachedKnowledgeBase {
    pub fn new(remote: Arc<dyn KnowledgeBaseApi>, store: CacheStore, memory_entries: usize) -> Self {
        Self {
            remote,
            store,
            memory: MemoryCache::new(memory_entries),
        }
    }
}

#[async_trait]
impl KnowledgeBaseApi for CachedKnowledgeBase {
    async fn parent_types(&self, entity: &str) -> Result<Vec<EntityId>, KbError> {
        if let Some(parents) = self.memory.get_parent_types(entity) {
            return Ok(parents);
        }

        if let Some(parents) = self.store.parent_types(entity).await? {
            self.memory.set_parent_types(entity, parents.clone());
            return Ok(parents);
        }

        let parents = self.remote.parent_types(entity).await?;
        if !self.store.put_parent_types(entity, &parents).await? {
            debug!(entity, "Parent types already cached by another worker");
        }
        self.memory.set_parent_types(entity, parents.clone());
        Ok(parents)
    }

    async fn candidate_entities(&self, text: &str) -> Result<Vec<EntityId>, KbError> {
        if !is_queryable(text) {
            return Ok(Vec::new());
        }

        if let Some(candidates) = self.memory.get_candidates(text) {
            return Ok(candidates);
        }

        if let Some(candidates) = self.store.candidates(text).await? {
            self.memory.set_candidates(text, candidates.clone());
            return Ok(candidates);
        }

        let candidates = self.remote.candidate_entities(text).await?;
        if !self.store.put_candidates(text, &candidates).await? {
            debug!(text, "Candidates already cached by another worker");
        }
        self.memory.set_candidates(text, candidates.clone());
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryKnowledgeBase;

    fn open(dir: &tempfile::TempDir, remote: Arc<InMemoryKnowledgeBase>) -> (CachedKnowledgeBase, CacheStore) {
        let store = CacheStore::open(&dir.path().join("kb.redb")).unwrap();
        (CachedKnowledgeBase::new(remote, store.clone(), 100), store)
    }

    #[tokio::test]
    async fn test_remote_hit_once() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(
            InMemoryKnowledgeBase::new()
                .with_parents("Q2616791", &["Q515"])
                .with_candidates("Nowy Targ", &["Q2616791"]),
        );
        let (kb, store) = open(&dir, remote.clone());

        for _ in 0..3 {
            assert_eq!(kb.parent_types("Q2616791").await.unwrap(), vec!["Q515".to_string()]);
            assert_eq!(
                kb.candidate_entities("Nowy Targ").await.unwrap(),
                vec!["Q2616791".to_string()]
            );
        }

        assert_eq!(remote.parent_calls(), 1);
        assert_eq!(remote.candidate_calls(), 1);
        let stats = store.stats().unwrap();
        assert_eq!(stats.entities, 1);
        assert_eq!(stats.tokens, 1);
    }

    #[tokio::test]
    async fn test_file_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(InMemoryKnowledgeBase::new().with_parents("Q5", &["Q215627"]));
        {
            let (kb, _store) = open(&dir, remote.clone());
            kb.parent_types("Q5").await.unwrap();
            // empty answer is cached as well
            kb.candidate_entities("xyzzy").await.unwrap();
        }

        let (kb, _store) = open(&dir, remote.clone());
        assert_eq!(kb.parent_types("Q5").await.unwrap(), vec!["Q215627".to_string()]);
        assert!(kb.candidate_entities("xyzzy").await.unwrap().is_empty());
        assert_eq!(remote.parent_calls(), 1);
        assert_eq!(remote.candidate_calls(), 1);
    }

    #[tokio::test]
    async fn test_remote_failure_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(InMemoryKnowledgeBase::new().failing_entity("Q1"));
        let (kb, store) = open(&dir, remote.clone());

        assert!(kb.parent_types("Q1").await.is_err());
        assert!(kb.parent_types("Q1").await.is_err());
        assert_eq!(remote.parent_calls(), 2);
        assert_eq!(store.stats().unwrap().entities, 0);
    }

    #[tokio::test]
    async fn test_unqueryable_text_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(InMemoryKnowledgeBase::new());
        let (kb, _store) = open(&dir, remote.clone());

        assert!(kb.candidate_entities("\"").await.unwrap().is_empty());
        assert_eq!(remote.candidate_calls(), 0);
    }
}
