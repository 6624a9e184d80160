//! PostgreSQL + pgvector memory backend
//!
//! One SQL table per collection, created lazily on first write. Nearest
//! neighbors via the pgvector cosine-distance operator.

use crate::error::{Error, Result};
use crate::memory::{resolve_ids, Embedder, MemoryRecord, MemoryStore, NewRecord, ScoredRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use std::sync::Arc;
use tracing::{debug, info};

/// Memory store backed by PostgreSQL + pgvector
#[derive(Clone)]
pub struct PgVectorMemory {
    pool: PgPool,
    embedder: Arc<dyn Embedder>,
    default_collection: String,
}

/// Validate a collection name for use as a table identifier.
///
/// Table names cannot be bound as query parameters, so only plain
/// identifiers are accepted before interpolation into DDL/DML.
fn validate_collection_name(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && name.len() <= 63 {
        Ok(name)
    } else {
        Err(Error::InvalidInput(format!(
            "Invalid collection name: {:?}",
            name
        )))
    }
}

/// Create a collection table and its similarity index if they don't exist
pub(crate) async fn ensure_collection_table(
    pool: &PgPool,
    collection: &str,
    dimensions: u32,
) -> Result<()> {
    let table = validate_collection_name(collection)?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY,
            text TEXT NOT NULL,
            response TEXT,
            embedding vector({dimensions}) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#
    ))
    .execute(pool)
    .await?;

    // IVFFlat index for similarity search (each index is a separate query for SQLx)
    sqlx::query(&format!(
        r#"
        CREATE INDEX IF NOT EXISTS idx_{table}_embedding ON {table}
        USING ivfflat (embedding vector_cosine_ops) WITH (lists = 100)
        "#
    ))
    .execute(pool)
    .await
    .ok(); // Ignore if not enough data or vector type not available

    debug!("Ensured collection table: {}", table);
    Ok(())
}

#[derive(FromRow)]
struct RecordRow {
    id: String,
    text: String,
    response: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<RecordRow> for MemoryRecord {
    fn from(row: RecordRow) -> Self {
        MemoryRecord {
            id: row.id,
            text: row.text,
            response: row.response,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ScoredRow {
    id: String,
    text: String,
    response: Option<String>,
    created_at: DateTime<Utc>,
    score: f32,
}

impl PgVectorMemory {
    /// Create a new store over an initialized pool
    pub fn new(pool: PgPool, embedder: Arc<dyn Embedder>, default_collection: String) -> Self {
        PgVectorMemory {
            pool,
            embedder,
            default_collection,
        }
    }

    fn collection<'a>(&'a self, collection: Option<&'a str>) -> &'a str {
        collection.unwrap_or(&self.default_collection)
    }
}

#[async_trait]
impl MemoryStore for PgVectorMemory {
    async fn add(
        &self,
        records: Vec<NewRecord>,
        collection: Option<&str>,
        ids: Option<Vec<String>>,
    ) -> Result<Vec<String>> {
        let table = validate_collection_name(self.collection(collection))?;
        let ids = resolve_ids(ids, records.len())?;

        ensure_collection_table(&self.pool, table, self.embedder.dimensions() as u32).await?;

        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(texts).await?;

        let created_at = Utc::now();
        for ((record, id), embedding) in records.iter().zip(&ids).zip(embeddings) {
            sqlx::query(&format!(
                r#"
                INSERT INTO {table} (id, text, response, embedding, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#
            ))
            .bind(id)
            .bind(&record.text)
            .bind(&record.response)
            .bind(Vector::from(embedding))
            .bind(created_at)
            .execute(&self.pool)
            .await?;
        }

        info!("Added {} records to {}", ids.len(), table);
        Ok(ids)
    }

    async fn query(
        &self,
        query_texts: &[String],
        collection: Option<&str>,
        n_results: usize,
    ) -> Result<Vec<Vec<ScoredRecord>>> {
        let table = validate_collection_name(self.collection(collection))?;
        let embeddings = self.embedder.embed_batch(query_texts.to_vec()).await?;

        let mut results = Vec::with_capacity(embeddings.len());
        for embedding in embeddings {
            let vector = Vector::from(embedding);
            let rows: Vec<ScoredRow> = sqlx::query_as(&format!(
                r#"
                SELECT id, text, response, created_at,
                       (1 - (embedding <=> $1))::float4 AS score
                FROM {table}
                ORDER BY embedding <=> $1
                LIMIT $2
                "#
            ))
            .bind(&vector)
            .bind(n_results as i64)
            .fetch_all(&self.pool)
            .await?;

            results.push(
                rows.into_iter()
                    .map(|r| ScoredRecord {
                        score: r.score,
                        record: MemoryRecord {
                            id: r.id,
                            text: r.text,
                            response: r.response,
                            created_at: r.created_at,
                        },
                    })
                    .collect(),
            );
        }

        Ok(results)
    }

    async fn get(&self, collection: Option<&str>, id: Option<&str>) -> Result<Vec<MemoryRecord>> {
        let table = validate_collection_name(self.collection(collection))?;

        let rows: Vec<RecordRow> = match id {
            Some(id) => {
                sqlx::query_as(&format!(
                    "SELECT id, text, response, created_at FROM {table} WHERE id = $1"
                ))
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(&format!(
                    "SELECT id, text, response, created_at FROM {table} ORDER BY created_at"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(MemoryRecord::from).collect())
    }

    async fn peek(&self, collection: Option<&str>, limit: usize) -> Result<Vec<MemoryRecord>> {
        let table = validate_collection_name(self.collection(collection))?;

        let rows: Vec<RecordRow> = sqlx::query_as(&format!(
            "SELECT id, text, response, created_at FROM {table} ORDER BY created_at LIMIT $1"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MemoryRecord::from).collect())
    }

    async fn delete(&self, id: &str, collection: Option<&str>) -> Result<()> {
        let table = validate_collection_name(self.collection(collection))?;

        sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn drop_collection(&self, collection: Option<&str>) -> Result<()> {
        let table = validate_collection_name(self.collection(collection))?;

        // No IF EXISTS: dropping a missing table surfaces the database's
        // own error, per the façade contract.
        sqlx::query(&format!("DROP TABLE {table}"))
            .execute(&self.pool)
            .await?;

        info!("Dropped collection table: {}", table);
        Ok(())
    }

    async fn count(&self, collection: Option<&str>) -> Result<u64> {
        let table = validate_collection_name(self.collection(collection))?;

        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    /// Table-store reset semantics: drop the default table.
    async fn reset(&self) -> Result<()> {
        self.drop_collection(None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_collection_names() {
        assert!(validate_collection_name("memory").is_ok());
        assert!(validate_collection_name("_scratch").is_ok());
        assert!(validate_collection_name("notes_2024").is_ok());
    }

    #[test]
    fn test_invalid_collection_names_rejected() {
        assert!(validate_collection_name("").is_err());
        assert!(validate_collection_name("1memory").is_err());
        assert!(validate_collection_name("mem-ory").is_err());
        assert!(validate_collection_name("memory; DROP TABLE users").is_err());
        assert!(validate_collection_name(&"x".repeat(64)).is_err());
    }
}
