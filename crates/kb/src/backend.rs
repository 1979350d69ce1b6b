use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::cached::CachedKnowledgeBase;
use crate::retry::RetryPolicy;
use crate::store::CacheStore;
use crate::wikidata::{WikidataClient, WikidataSettings};
use crate::KnowledgeBaseApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KbBackend {
    /// Every lookup goes to Wikidata.
    Web,
    /// Lookups are answered from the cache file, falling back to Wikidata.
    CacheFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseSettings {
    pub backend: KbBackend,
    pub cache_path: PathBuf,
    pub memory_cache_entries: usize,
    #[serde(flatten)]
    pub wikidata: WikidataSettings,
}

impl Default for KnowledgeBaseSettings {
    fn default() -> Self {
        Self {
            backend: KbBackend::CacheFile,
            cache_path: PathBuf::from("data/entity_linking.redb"),
            memory_cache_entries: 100_000,
            wikidata: WikidataSettings::default(),
        }
    }
}

/// Build the configured knowledge base once; callers share the handle.
pub fn open_knowledge_base(
    settings: &KnowledgeBaseSettings,
    retry: RetryPolicy,
) -> Result<Arc<dyn KnowledgeBaseApi>> {
    let remote = WikidataClient::new(settings.wikidata.clone(), retry)
        .context("Failed to build Wikidata client")?;

    match settings.backend {
        KbBackend::Web => {
            info!(language = %settings.wikidata.language, "Using Wikidata web backend");
            Ok(Arc::new(remote))
        }
        KbBackend::CacheFile => {
            let store = CacheStore::open(&settings.cache_path).context(format!(
                "Failed to open cache file {}",
                settings.cache_path.display()
            ))?;
            let stats = store.stats().context("Failed to read cache file")?;
            info!(
                path = %settings.cache_path.display(),
                entities = stats.entities,
                tokens = stats.tokens,
                "Using cache-file backend"
            );
            Ok(Arc::new(CachedKnowledgeBase::new(
                Arc::new(remote),
                store,
                settings.memory_cache_entries,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_json() {
        let settings: KnowledgeBaseSettings = serde_json::from_str(
            r#"{"backend": "web", "language": "en", "results_limit": 3}"#,
        )
        .unwrap();
        assert_eq!(settings.backend, KbBackend::Web);
        assert_eq!(settings.wikidata.language, "en");
        assert_eq!(settings.wikidata.results_limit, 3);
        assert_eq!(settings.memory_cache_entries, 100_000);
    }

    #[test]
    fn test_open_cache_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let settings = KnowledgeBaseSettings {
            cache_path: dir.path().join("kb.redb"),
            ..Default::default()
        };
        assert!(open_knowledge_base(&settings, RetryPolicy::new(0, 1, 1)).is_ok());
        assert!(settings.cache_path.exists());
    }
}
