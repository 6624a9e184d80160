//! Qdrant memory backend
//!
//! One Qdrant collection per logical collection, created lazily on first
//! write. Collection names are namespaced with a configured prefix so that
//! `reset()` can wipe exactly the data this store owns.

use crate::config::QdrantConfig;
use crate::error::{Error, Result};
use crate::memory::{resolve_ids, Embedder, MemoryRecord, MemoryStore, NewRecord, ScoredRecord};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance, GetPointsBuilder,
    PointId, PointStruct, ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Memory store backed by Qdrant
pub struct QdrantMemory {
    client: Qdrant,
    prefix: String,
    default_collection: String,
    allow_reset: bool,
    embedder: Arc<dyn Embedder>,
}

impl QdrantMemory {
    /// Connect to Qdrant with the given configuration
    pub async fn connect(
        config: &QdrantConfig,
        default_collection: String,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        // Skip compatibility check to allow minor version mismatches
        let client = Qdrant::from_url(&config.url)
            .skip_compatibility_check()
            .build()?;

        Ok(QdrantMemory {
            client,
            prefix: config.collection_prefix.clone(),
            default_collection,
            allow_reset: config.allow_reset,
            embedder,
        })
    }

    /// Get the namespaced collection name
    fn collection_name(&self, collection: Option<&str>) -> String {
        let name = collection.unwrap_or(&self.default_collection);
        format!("{}_{}", self.prefix, name)
    }

    /// Ensure a collection exists, tolerating creation races
    async fn ensure_collection(&self, collection: &str) -> Result<()> {
        let exists = self.client.collection_exists(collection).await?;

        if !exists {
            info!("Creating Qdrant collection: {}", collection);
            let dims = self.embedder.dimensions() as u64;
            match self
                .client
                .create_collection(
                    CreateCollectionBuilder::new(collection)
                        .vectors_config(VectorParamsBuilder::new(dims, Distance::Cosine)),
                )
                .await
            {
                Ok(_) => {}
                Err(e) => {
                    // Another process may have created it between our exists
                    // check and the create call
                    if e.to_string().contains("already exists") {
                        debug!("Collection {} already exists", collection);
                    } else {
                        return Err(e.into());
                    }
                }
            }
        }

        Ok(())
    }

    /// Check that Qdrant is reachable
    pub async fn health_check(&self) -> Result<()> {
        self.client.health_check().await?;
        Ok(())
    }
}

/// Convert a point payload back into a record
fn record_from_payload(payload: &HashMap<String, QdrantValue>) -> Option<MemoryRecord> {
    let id = payload.get("id")?.as_str()?.to_string();
    let text = payload.get("text")?.as_str()?.to_string();
    let response = payload
        .get("response")
        .and_then(|v| v.as_str())
        .map(String::from);
    let timestamp_secs = payload.get("created_at")?.as_integer()?;
    let created_at = chrono::DateTime::from_timestamp(timestamp_secs, 0)?;

    Some(MemoryRecord {
        id,
        text,
        response,
        created_at,
    })
}

#[async_trait]
impl MemoryStore for QdrantMemory {
    async fn add(
        &self,
        records: Vec<NewRecord>,
        collection: Option<&str>,
        ids: Option<Vec<String>>,
    ) -> Result<Vec<String>> {
        let collection = self.collection_name(collection);
        let ids = resolve_ids(ids, records.len())?;

        self.ensure_collection(&collection).await?;

        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(texts).await?;

        let created_at = chrono::Utc::now().timestamp();
        let points: Vec<PointStruct> = records
            .iter()
            .zip(&ids)
            .zip(embeddings)
            .map(|((record, id), embedding)| {
                let mut payload: HashMap<String, QdrantValue> = HashMap::new();
                payload.insert("id".to_string(), id.clone().into());
                payload.insert("text".to_string(), record.text.clone().into());
                payload.insert("created_at".to_string(), created_at.into());
                if let Some(ref response) = record.response {
                    payload.insert("response".to_string(), response.clone().into());
                }

                PointStruct::new(id.clone(), embedding, payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&collection, points).wait(true))
            .await?;

        info!("Added {} records to {}", ids.len(), collection);
        Ok(ids)
    }

    async fn query(
        &self,
        query_texts: &[String],
        collection: Option<&str>,
        n_results: usize,
    ) -> Result<Vec<Vec<ScoredRecord>>> {
        let collection = self.collection_name(collection);
        let embeddings = self.embedder.embed_batch(query_texts.to_vec()).await?;

        let mut results = Vec::with_capacity(embeddings.len());
        for embedding in embeddings {
            let response = self
                .client
                .search_points(
                    SearchPointsBuilder::new(&collection, embedding, n_results as u64)
                        .with_payload(true),
                )
                .await?;

            results.push(
                response
                    .result
                    .into_iter()
                    .filter_map(|point| {
                        let record = record_from_payload(&point.payload)?;
                        Some(ScoredRecord {
                            record,
                            score: point.score,
                        })
                    })
                    .collect(),
            );
        }

        Ok(results)
    }

    async fn get(&self, collection: Option<&str>, id: Option<&str>) -> Result<Vec<MemoryRecord>> {
        let collection = self.collection_name(collection);

        match id {
            Some(id) => {
                let response = self
                    .client
                    .get_points(
                        GetPointsBuilder::new(
                            &collection,
                            vec![PointId::from(id.to_string())],
                        )
                        .with_payload(true),
                    )
                    .await?;

                Ok(response
                    .result
                    .iter()
                    .filter_map(|p| record_from_payload(&p.payload))
                    .collect())
            }
            None => {
                // Scroll everything, page by page
                let mut records = Vec::new();
                let mut offset: Option<PointId> = None;
                let page = 256u32;

                loop {
                    let mut builder = ScrollPointsBuilder::new(&collection)
                        .limit(page)
                        .with_payload(true);
                    if let Some(ref off) = offset {
                        builder = builder.offset(off.clone());
                    }

                    let response = self.client.scroll(builder).await?;
                    if response.result.is_empty() {
                        break;
                    }

                    let fetched = response.result.len();
                    records.extend(
                        response
                            .result
                            .iter()
                            .filter_map(|p| record_from_payload(&p.payload)),
                    );

                    offset = response.next_page_offset;
                    if offset.is_none() || fetched < page as usize {
                        break;
                    }
                }

                Ok(records)
            }
        }
    }

    async fn peek(&self, collection: Option<&str>, limit: usize) -> Result<Vec<MemoryRecord>> {
        let collection = self.collection_name(collection);

        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(&collection)
                    .limit(limit as u32)
                    .with_payload(true),
            )
            .await?;

        Ok(response
            .result
            .iter()
            .filter_map(|p| record_from_payload(&p.payload))
            .collect())
    }

    async fn delete(&self, id: &str, collection: Option<&str>) -> Result<()> {
        let collection = self.collection_name(collection);

        self.client
            .delete_points(
                DeletePointsBuilder::new(&collection)
                    .points(vec![PointId::from(id.to_string())])
                    .wait(true),
            )
            .await?;

        debug!("Deleted point {} from {}", id, collection);
        Ok(())
    }

    async fn drop_collection(&self, collection: Option<&str>) -> Result<()> {
        let collection = self.collection_name(collection);

        let response = self.client.delete_collection(&collection).await?;
        if !response.result {
            return Err(Error::NotFound(format!(
                "Collection {} does not exist",
                collection
            )));
        }

        info!("Dropped collection: {}", collection);
        Ok(())
    }

    async fn count(&self, collection: Option<&str>) -> Result<u64> {
        let collection = self.collection_name(collection);

        let response = self
            .client
            .count(CountPointsBuilder::new(&collection).exact(true))
            .await?;

        Ok(response.result.map(|r| r.count).unwrap_or(0))
    }

    /// Wipes every collection under the configured prefix. Requires the
    /// `allow_reset` opt-in.
    async fn reset(&self) -> Result<()> {
        if !self.allow_reset {
            return Err(Error::ResetDisabled);
        }

        let namespace = format!("{}_", self.prefix);
        let collections = self.client.list_collections().await?;

        for description in collections.collections {
            if description.name.starts_with(&namespace) {
                self.client.delete_collection(&description.name).await?;
                info!("Reset: dropped collection {}", description.name);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_with(entries: &[(&str, QdrantValue)]) -> HashMap<String, QdrantValue> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_record_from_payload_round_trip() {
        let payload = payload_with(&[
            ("id", "abc-123".to_string().into()),
            ("text", "how to sort".to_string().into()),
            ("response", "use sort_unstable".to_string().into()),
            ("created_at", 1_700_000_000i64.into()),
        ]);

        let record = record_from_payload(&payload).unwrap();
        assert_eq!(record.id, "abc-123");
        assert_eq!(record.text, "how to sort");
        assert_eq!(record.response.as_deref(), Some("use sort_unstable"));
        assert_eq!(record.created_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_record_from_payload_without_response() {
        let payload = payload_with(&[
            ("id", "abc".to_string().into()),
            ("text", "bare".to_string().into()),
            ("created_at", 1_700_000_000i64.into()),
        ]);

        let record = record_from_payload(&payload).unwrap();
        assert!(record.response.is_none());
    }

    #[test]
    fn test_record_from_payload_missing_fields() {
        let payload = payload_with(&[("text", "no id".to_string().into())]);
        assert!(record_from_payload(&payload).is_none());
    }

    struct NoopEmbedder;

    #[async_trait]
    impl Embedder for NoopEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0; 4])
        }

        async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0; 4]).collect())
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    // The opt-in gate fires before any request is issued, so this needs no
    // running Qdrant.
    #[tokio::test]
    async fn test_reset_without_opt_in_is_rejected() {
        let config = crate::config::QdrantConfig::default();
        let store = QdrantMemory::connect(&config, "memory".to_string(), Arc::new(NoopEmbedder))
            .await
            .unwrap();

        let err = store.reset().await.unwrap_err();
        assert!(matches!(err, Error::ResetDisabled));
    }
}
