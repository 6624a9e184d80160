//! Memory recall for the chat loop
//!
//! Queries the store before each completion and formats matches for
//! injection into the system prompt; stores the (query, response) pair
//! after each completed turn.

use crate::error::Result;
use crate::memory::record::{NewRecord, ScoredRecord};
use crate::memory::MemoryStore;
use std::sync::Arc;
use tracing::info;

/// Recall pipeline over a memory store
#[derive(Clone)]
pub struct Recall {
    store: Arc<dyn MemoryStore>,
    limit: usize,
}

impl Recall {
    /// Create a new recall pipeline
    pub fn new(store: Arc<dyn MemoryStore>, limit: usize) -> Self {
        Recall { store, limit }
    }

    /// Retrieve relevant memories for a query, formatted as a context string
    pub async fn retrieve(&self, query: &str) -> Result<String> {
        let mut results = self
            .store
            .query(&[query.to_string()], None, self.limit)
            .await?;

        let matches = results.pop().unwrap_or_default();
        info!("Recalled {} memories", matches.len());

        Ok(format_recall(&matches))
    }

    /// Store a completed (query, response) turn
    pub async fn remember(&self, query: &str, response: &str) -> Result<Vec<String>> {
        self.store
            .add(
                vec![NewRecord::new(query).with_response(response)],
                None,
                None,
            )
            .await
    }

    /// Get a reference to the underlying store
    pub fn store(&self) -> &Arc<dyn MemoryStore> {
        &self.store
    }
}

/// Format recalled records into a context string for the system prompt
pub fn format_recall(matches: &[ScoredRecord]) -> String {
    if matches.is_empty() {
        return String::new();
    }

    let mut output = String::from("\n\n---\n\n## Relevant past interactions\n\n");

    for (i, scored) in matches.iter().enumerate() {
        output.push_str(&format!("{}. Q: {}", i + 1, scored.record.text));
        if let Some(ref response) = scored.record.response {
            output.push_str(&format!("\n   A: {}", response));
        }
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::record::MemoryRecord;
    use chrono::Utc;

    fn scored(text: &str, response: Option<&str>) -> ScoredRecord {
        ScoredRecord {
            record: MemoryRecord {
                id: "id".into(),
                text: text.into(),
                response: response.map(String::from),
                created_at: Utc::now(),
            },
            score: 0.9,
        }
    }

    #[test]
    fn test_format_recall_empty() {
        assert_eq!(format_recall(&[]), "");
    }

    #[test]
    fn test_format_recall() {
        let matches = vec![
            scored("how to sort", Some("use sort_unstable")),
            scored("what is borrow checking", None),
        ];

        let result = format_recall(&matches);
        assert!(result.contains("## Relevant past interactions"));
        assert!(result.contains("1. Q: how to sort"));
        assert!(result.contains("A: use sort_unstable"));
        assert!(result.contains("2. Q: what is borrow checking"));
    }

    mod with_mock_store {
        use super::*;
        use crate::error::Result;
        use crate::memory::{resolve_ids, MemoryStore, NewRecord};
        use async_trait::async_trait;
        use std::sync::Mutex;

        /// In-memory store used to check the façade contract without a
        /// live backend. Matching is insertion order, not similarity.
        struct MockStore {
            records: Mutex<Vec<MemoryRecord>>,
        }

        impl MockStore {
            fn new() -> Self {
                MockStore {
                    records: Mutex::new(Vec::new()),
                }
            }
        }

        #[async_trait]
        impl MemoryStore for MockStore {
            async fn add(
                &self,
                records: Vec<NewRecord>,
                _collection: Option<&str>,
                ids: Option<Vec<String>>,
            ) -> Result<Vec<String>> {
                let ids = resolve_ids(ids, records.len())?;
                let mut stored = self.records.lock().unwrap();
                for (record, id) in records.into_iter().zip(ids.iter()) {
                    stored.push(MemoryRecord {
                        id: id.clone(),
                        text: record.text,
                        response: record.response,
                        created_at: Utc::now(),
                    });
                }
                Ok(ids)
            }

            async fn query(
                &self,
                query_texts: &[String],
                _collection: Option<&str>,
                n_results: usize,
            ) -> Result<Vec<Vec<ScoredRecord>>> {
                let stored = self.records.lock().unwrap();
                Ok(query_texts
                    .iter()
                    .map(|_| {
                        stored
                            .iter()
                            .take(n_results)
                            .map(|record| ScoredRecord {
                                record: record.clone(),
                                score: 1.0,
                            })
                            .collect()
                    })
                    .collect())
            }

            async fn get(
                &self,
                _collection: Option<&str>,
                id: Option<&str>,
            ) -> Result<Vec<MemoryRecord>> {
                let stored = self.records.lock().unwrap();
                Ok(stored
                    .iter()
                    .filter(|r| id.map_or(true, |id| r.id == id))
                    .cloned()
                    .collect())
            }

            async fn peek(
                &self,
                _collection: Option<&str>,
                limit: usize,
            ) -> Result<Vec<MemoryRecord>> {
                Ok(self.records.lock().unwrap().iter().take(limit).cloned().collect())
            }

            async fn delete(&self, id: &str, _collection: Option<&str>) -> Result<()> {
                self.records.lock().unwrap().retain(|r| r.id != id);
                Ok(())
            }

            async fn drop_collection(&self, _collection: Option<&str>) -> Result<()> {
                self.records.lock().unwrap().clear();
                Ok(())
            }

            async fn count(&self, _collection: Option<&str>) -> Result<u64> {
                Ok(self.records.lock().unwrap().len() as u64)
            }

            async fn reset(&self) -> Result<()> {
                self.records.lock().unwrap().clear();
                Ok(())
            }
        }

        #[tokio::test]
        async fn test_added_ids_come_back_from_query() {
            let store = Arc::new(MockStore::new());

            let ids = store
                .add(
                    vec![
                        NewRecord::new("first question"),
                        NewRecord::new("second question"),
                        NewRecord::new("third question"),
                    ],
                    None,
                    None,
                )
                .await
                .unwrap();
            assert_eq!(ids.len(), 3);

            let results = store
                .query(&["anything".to_string()], None, 10)
                .await
                .unwrap();
            let returned: Vec<&str> = results[0].iter().map(|s| s.record.id.as_str()).collect();
            for id in &ids {
                assert!(returned.contains(&id.as_str()));
            }
        }

        #[tokio::test]
        async fn test_remember_then_retrieve_round_trip() {
            let store = Arc::new(MockStore::new());
            let recall = Recall::new(store.clone(), 5);

            let ids = recall
                .remember("how do I sort a vec?", "use sort_unstable")
                .await
                .unwrap();
            assert_eq!(ids.len(), 1);

            let context = recall.retrieve("sorting").await.unwrap();
            assert!(context.contains("how do I sort a vec?"));
            assert!(context.contains("use sort_unstable"));

            assert_eq!(store.count(None).await.unwrap(), 1);
        }
    }
}
