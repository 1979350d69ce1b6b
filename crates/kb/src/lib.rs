pub mod backend;
pub mod cache;
pub mod cached;
pub mod error;
mod http;
pub mod memory;
pub mod retry;
pub mod store;
pub mod wikidata;
pub mod wikipedia;

use async_trait::async_trait;

pub use backend::{KbBackend, KnowledgeBaseSettings, open_knowledge_base};
pub use cache::{CacheStats, MemoryCache};
pub use cached::CachedKnowledgeBase;
pub use error::KbError;
pub use memory::InMemoryKnowledgeBase;
pub use retry::{RetryConfig, RetryPolicy};
pub use store::{CacheStore, StoreStats};
pub use wikidata::{WikidataClient, WikidataSettings};
pub use wikipedia::{ArticleSource, WikipediaClient};

/// Wikidata-style identifier, e.g. `Q5`.
pub type EntityId = String;

/// The two lookups the linker needs from a knowledge base.
///
/// Implementations are shared across worker tasks and must tolerate
/// concurrent calls.
#[async_trait]
pub trait KnowledgeBaseApi: Send + Sync {
    /// Direct instance-of / subclass-of / facet-of targets of `entity`.
    /// Unknown or invalid identifiers yield an empty list.
    async fn parent_types(&self, entity: &str) -> Result<Vec<EntityId>, KbError>;

    /// Entities whose label matches `text`, in the backend's relevance order.
    async fn candidate_entities(&self, text: &str) -> Result<Vec<EntityId>, KbError>;
}

/// Text that can be embedded in a search query as a string literal.
pub fn is_queryable(text: &str) -> bool {
    !text.trim().is_empty() && !text.contains('\\') && !text.contains('"')
}
