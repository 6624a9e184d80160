//! Embedding providers
//!
//! The provider is selected by configuration: the default is an in-process
//! fastembed model (multilingual-e5-small, 384 dimensions, ~90MB,
//! auto-downloads on first use); alternatively the hosted OpenAI
//! `/v1/embeddings` endpoint.

use crate::config::{Config, EmbeddingProviderKind};
use crate::error::{Error, Result};
use crate::memory::cache::EmbeddingCache;
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Text embedding provider
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions
    fn dimensions(&self) -> usize;
}

/// Local embedding service wrapping fastembed
#[derive(Clone)]
pub struct LocalEmbedder {
    model: Arc<TextEmbedding>,
}

impl LocalEmbedder {
    /// Create a new embedding service with multilingual-e5-small
    pub fn new() -> Result<Self> {
        let model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::MultilingualE5Small).with_show_download_progress(true),
        )
        .map_err(|e| Error::Embedding(format!("Failed to init embedding model: {}", e)))?;

        Ok(LocalEmbedder {
            model: Arc::new(model),
        })
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = self.model.clone();
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            let embeddings = model
                .embed(vec![text], None)
                .map_err(|e| Error::Embedding(format!("Embedding error: {}", e)))?;
            embeddings
                .into_iter()
                .next()
                .ok_or_else(|| Error::Embedding("No embedding returned".into()))
        })
        .await
        .map_err(|e| Error::Internal(format!("Embedding task join error: {}", e)))?
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = self.model.clone();

        tokio::task::spawn_blocking(move || {
            model
                .embed(texts, None)
                .map_err(|e| Error::Embedding(format!("Batch embedding error: {}", e)))
        })
        .await
        .map_err(|e| Error::Internal(format!("Embedding task join error: {}", e)))?
    }

    /// 384 for multilingual-e5-small
    fn dimensions(&self) -> usize {
        384
    }
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Hosted embeddings via the OpenAI `/v1/embeddings` endpoint
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    dims: usize,
}

fn embeddings_endpoint(base_url: &str) -> String {
    format!("{}/embeddings", base_url.trim_end_matches('/'))
}

impl OpenAiEmbedder {
    /// Create a new hosted embedder
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        model: impl Into<String>,
        dims: usize,
    ) -> Self {
        OpenAiEmbedder {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.into(),
            model: model.into(),
            dims,
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::Embedding("Empty embedding response".into()))
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: texts,
        };

        let response = self
            .client
            .post(embeddings_endpoint(&self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "Embeddings API error ({}): {}",
                status, body
            )));
        }

        let body: EmbeddingResponse = response.json().await?;
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Embedder wrapper that caches per-text results in-process
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: EmbeddingCache,
}

impl CachedEmbedder {
    /// Wrap an embedder with a cache
    pub fn new(inner: Arc<dyn Embedder>) -> Self {
        CachedEmbedder {
            inner,
            cache: EmbeddingCache::new(),
        }
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.get(text).await {
            debug!("Embedding cache hit");
            return Ok(cached);
        }

        let embedding = self.inner.embed(text).await?;
        self.cache.put(text, embedding.clone()).await;
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        // Batches go to the provider uncached; single-text lookups dominate
        // the query path and are what the cache is for.
        self.inner.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

/// Build the embedder selected by configuration, wrapped with caching
pub fn create_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    let inner: Arc<dyn Embedder> = match config.storage.embedding.provider {
        EmbeddingProviderKind::Local => Arc::new(LocalEmbedder::new()?),
        EmbeddingProviderKind::OpenAi => {
            let openai = config.provider.openai.as_ref().ok_or_else(|| {
                Error::Config("OpenAI embedding provider selected but no API key configured".into())
            })?;
            Arc::new(OpenAiEmbedder::new(
                openai.api_key.clone(),
                openai.base_url.clone(),
                config.storage.embedding.model.clone(),
                config.storage.embedding.dimensions as usize,
            ))
        }
    };

    Ok(Arc::new(CachedEmbedder::new(inner)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_embeddings_endpoint() {
        assert_eq!(
            embeddings_endpoint("https://api.openai.com/v1"),
            "https://api.openai.com/v1/embeddings"
        );
        assert_eq!(
            embeddings_endpoint("https://api.openai.com/v1/"),
            "https://api.openai.com/v1/embeddings"
        );
    }

    #[tokio::test]
    async fn test_hosted_embedder_request_and_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(body_partial_json(serde_json::json!({
                "model": "text-embedding-3-small",
                "input": ["hello", "world"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"embedding": [0.1, 0.2]},
                    {"embedding": [0.3, 0.4]}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let embedder = OpenAiEmbedder::new(
            SecretString::from("test-key"),
            server.uri(),
            "text-embedding-3-small",
            1536,
        );

        let vectors = embedder
            .embed_batch(vec!["hello".into(), "world".into()])
            .await
            .unwrap();

        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[tokio::test]
    async fn test_hosted_embedder_error_passthrough() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let embedder =
            OpenAiEmbedder::new(SecretString::from("test-key"), server.uri(), "m", 1536);

        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn test_cached_embedder_hits_provider_once() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [1.0, 2.0]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let inner = Arc::new(OpenAiEmbedder::new(
            SecretString::from("test-key"),
            server.uri(),
            "m",
            2,
        ));
        let cached = CachedEmbedder::new(inner);

        let first = cached.embed("same text").await.unwrap();
        let second = cached.embed("same text").await.unwrap();
        assert_eq!(first, second);
    }
}
