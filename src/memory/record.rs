//! Memory record types

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored memory record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique record ID
    pub id: String,
    /// The stored text (what was asked)
    pub text: String,
    /// Optional response metadata (what was answered)
    pub response: Option<String>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
}

/// A record to be stored, before an ID is assigned
#[derive(Debug, Clone)]
pub struct NewRecord {
    /// The text to store and embed
    pub text: String,
    /// Optional response metadata
    pub response: Option<String>,
}

impl NewRecord {
    /// Create a new record from text
    pub fn new(text: impl Into<String>) -> Self {
        NewRecord {
            text: text.into(),
            response: None,
        }
    }

    /// Attach a response
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }
}

/// A record with a similarity score from a query
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    /// The matched record
    pub record: MemoryRecord,
    /// Similarity score (higher is more similar)
    pub score: f32,
}

/// Resolve the ID list for an insertion: use the supplied IDs when given
/// (length must match), otherwise generate random UUIDs.
pub fn resolve_ids(supplied: Option<Vec<String>>, count: usize) -> Result<Vec<String>> {
    match supplied {
        Some(ids) => {
            if ids.len() != count {
                return Err(Error::InvalidInput(format!(
                    "Got {} ids for {} records",
                    ids.len(),
                    count
                )));
            }
            Ok(ids)
        }
        None => Ok((0..count).map(|_| Uuid::new_v4().to_string()).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_are_unique() {
        let ids = resolve_ids(None, 10).unwrap();
        assert_eq!(ids.len(), 10);

        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn test_supplied_ids_pass_through() {
        let ids = resolve_ids(Some(vec!["a".into(), "b".into()]), 2).unwrap();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_mismatched_id_count_rejected() {
        let err = resolve_ids(Some(vec!["a".into()]), 2).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_record_builder() {
        let record = NewRecord::new("how do I sort a vec?").with_response("use sort_unstable");
        assert_eq!(record.text, "how do I sort a vec?");
        assert_eq!(record.response.as_deref(), Some("use sort_unstable"));
    }
}
