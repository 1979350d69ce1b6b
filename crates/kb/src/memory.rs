use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::KbError;
use crate::{EntityId, KnowledgeBaseApi};

/// Deterministic knowledge base over fixed tables, with call counters.
///
/// Unknown keys answer with an empty list. Used as the backend in tests and
/// for offline runs over a prepared fixture.
#[derive(Default)]
pub struct InMemoryKnowledgeBase {
    parents: HashMap<String, Vec<EntityId>>,
    candidates: HashMap<String, Vec<EntityId>>,
    failing_entities: HashSet<String>,
    failing_texts: HashSet<String>,
    unavailable: bool,
    parent_calls: AtomicUsize,
    candidate_calls: AtomicUsize,
    probed: Mutex<Vec<String>>,
}

impl InMemoryKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parents(mut self, entity: &str, parents: &[&str]) -> Self {
        self.parents
            .insert(entity.to_string(), parents.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn with_candidates(mut self, text: &str, candidates: &[&str]) -> Self {
        self.candidates
            .insert(text.to_string(), candidates.iter().map(|c| c.to_string()).collect());
        self
    }

    /// `parent_types(entity)` fails with a recoverable lookup error.
    pub fn failing_entity(mut self, entity: &str) -> Self {
        self.failing_entities.insert(entity.to_string());
        self
    }

    /// `candidate_entities(text)` fails with a recoverable lookup error.
    pub fn failing_text(mut self, text: &str) -> Self {
        self.failing_texts.insert(text.to_string());
        self
    }

    /// Every lookup fails with `CacheUnavailable`.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn parent_calls(&self) -> usize {
        self.parent_calls.load(Ordering::Relaxed)
    }

    pub fn candidate_calls(&self) -> usize {
        self.candidate_calls.load(Ordering::Relaxed)
    }

    /// Texts passed to `candidate_entities`, in call order.
    pub fn probed_texts(&self) -> Vec<String> {
        self.probed.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl KnowledgeBaseApi for InMemoryKnowledgeBase {
    async fn parent_types(&self, entity: &str) -> Result<Vec<EntityId>, KbError> {
        self.parent_calls.fetch_add(1, Ordering::Relaxed);
        if self.unavailable {
            return Err(KbError::CacheUnavailable("in-memory backend closed".to_string()));
        }
        if self.failing_entities.contains(entity) {
            return Err(KbError::Lookup(format!("parent types of {}", entity)));
        }
        Ok(self.parents.get(entity).cloned().unwrap_or_default())
    }

    async fn candidate_entities(&self, text: &str) -> Result<Vec<EntityId>, KbError> {
        self.candidate_calls.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut probed) = self.probed.lock() {
            probed.push(text.to_string());
        }
        if self.unavailable {
            return Err(KbError::CacheUnavailable("in-memory backend closed".to_string()));
        }
        if self.failing_texts.contains(text) {
            return Err(KbError::Lookup(format!("candidates for {}", text)));
        }
        Ok(self.candidates.get(text).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_lookups_and_counters() {
        let kb = InMemoryKnowledgeBase::new()
            .with_parents("Q2616791", &["Q515"])
            .with_candidates("Nowy Targ", &["Q2616791"])
            .failing_text("Targ");

        assert_eq!(kb.parent_types("Q2616791").await.unwrap(), vec!["Q515".to_string()]);
        assert!(kb.parent_types("Q404").await.unwrap().is_empty());
        assert_eq!(kb.candidate_entities("Nowy Targ").await.unwrap().len(), 1);

        let err = kb.candidate_entities("Targ").await.unwrap_err();
        assert!(!err.is_fatal());

        assert_eq!(kb.parent_calls(), 2);
        assert_eq!(kb.candidate_calls(), 2);
        assert_eq!(kb.probed_texts(), vec!["Nowy Targ".to_string(), "Targ".to_string()]);
    }

    #[tokio::test]
    async fn test_unavailable_is_fatal() {
        let kb = InMemoryKnowledgeBase::new().unavailable();
        assert!(kb.parent_types("Q5").await.unwrap_err().is_fatal());
        assert!(kb.candidate_entities("x").await.unwrap_err().is_fatal());
    }
}
