//! Memory module - embedding generation, caching, and the vector-store façade
//!
//! The façade forwards add/query/get/delete/count/reset calls to one of two
//! interchangeable persistent vector stores (PostgreSQL + pgvector, or
//! Qdrant), attaching the embedding provider selected by configuration.

pub mod cache;
pub mod embedding;
pub mod record;
pub mod retrieval;

pub use cache::EmbeddingCache;
pub use embedding::{create_embedder, CachedEmbedder, Embedder, LocalEmbedder, OpenAiEmbedder};
pub use record::{resolve_ids, MemoryRecord, NewRecord, ScoredRecord};
pub use retrieval::{format_recall, Recall};

use crate::config::{Config, VectorBackendType};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// CRUD façade over a persistent vector store.
///
/// All operations take an optional collection/table name and fall back to
/// the store's configured default. No retry, backpressure, or consistency
/// guarantees are added here; errors from the underlying client pass
/// through unchanged.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Store records, embedding their text. Generates UUIDs when `ids` is
    /// not supplied; returns the id list in insertion order.
    async fn add(
        &self,
        records: Vec<NewRecord>,
        collection: Option<&str>,
        ids: Option<Vec<String>>,
    ) -> Result<Vec<String>>;

    /// Top-N nearest neighbors per query text, most similar first.
    async fn query(
        &self,
        query_texts: &[String],
        collection: Option<&str>,
        n_results: usize,
    ) -> Result<Vec<Vec<ScoredRecord>>>;

    /// Get a record by id, or all records when no id is given.
    async fn get(&self, collection: Option<&str>, id: Option<&str>) -> Result<Vec<MemoryRecord>>;

    /// First `limit` records of a collection.
    async fn peek(&self, collection: Option<&str>, limit: usize) -> Result<Vec<MemoryRecord>>;

    /// Remove a single record.
    async fn delete(&self, id: &str, collection: Option<&str>) -> Result<()>;

    /// Remove a whole collection/table. Dropping a collection that does not
    /// exist surfaces the underlying store's not-found error.
    async fn drop_collection(&self, collection: Option<&str>) -> Result<()>;

    /// Record count for a collection.
    async fn count(&self, collection: Option<&str>) -> Result<u64>;

    /// Clear all data. The Qdrant backend requires the `allow_reset`
    /// configuration opt-in and rejects the call without it.
    async fn reset(&self) -> Result<()>;
}

/// Open the vector store selected by configuration, with the configured
/// embedding provider attached.
pub async fn open_store(config: &Config) -> Result<Arc<dyn MemoryStore>> {
    let embedder = create_embedder(config)?;
    let collection = config.storage.collection.clone();

    match config.storage.backend {
        VectorBackendType::Postgres => {
            let pg = config.storage.postgres.as_ref().ok_or_else(|| {
                Error::Config("PostgreSQL backend selected but not configured".into())
            })?;
            let pool = crate::database::init_pool(pg).await?;
            Ok(Arc::new(crate::database::PgVectorMemory::new(
                pool, embedder, collection,
            )))
        }
        VectorBackendType::Qdrant => {
            let qd = config
                .storage
                .qdrant
                .as_ref()
                .ok_or_else(|| Error::Config("Qdrant backend selected but not configured".into()))?;
            let store = crate::database::QdrantMemory::connect(qd, collection, embedder).await?;
            Ok(Arc::new(store))
        }
    }
}
