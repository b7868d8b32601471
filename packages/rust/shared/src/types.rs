//! Core domain types for the Beacon corpus.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Cleaned page text keyed by source URL, as produced by the crawler and
/// consumed by the indexer. Keyed by URL so completion order never matters.
pub type CrawledPages = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// DocumentId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for document identifiers (time-sortable, never reused).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    /// Generate a fresh document identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// A unit of ingested evidence. Created once by the indexer, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier assigned at store time.
    pub id: DocumentId,
    /// Source locator; the dedup key.
    pub url: String,
    /// Cleaned textual content.
    pub text: String,
    /// When the document was stored (observability only).
    pub ingested_at: DateTime<Utc>,
}

/// Metadata-only view of a stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub id: DocumentId,
    pub url: String,
    pub ingested_at: DateTime<Utc>,
}

impl From<&Document> for DocumentMeta {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            url: doc.url.clone(),
            ingested_at: doc.ingested_at,
        }
    }
}

/// A first-stage candidate returned by similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: Document,
    /// Cosine similarity between the query and document embeddings.
    pub similarity: f32,
}

/// A document annotated with its rerank relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPassage {
    pub document: Document,
    /// Relevance score from the rerank service (higher is better).
    pub score: f64,
}

// ---------------------------------------------------------------------------
// QueryPair
// ---------------------------------------------------------------------------

/// Literal the reasoning service emits when no web search is needed.
pub const NO_SEARCH_SENTINEL: &str = "null";

/// The `(searchQuery, rerankQuery)` pair handed over by the reasoning service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPair {
    /// Web search / similarity query, `None` when no search is needed.
    pub search: Option<String>,
    /// Refined query for the rerank stage.
    pub rerank: Option<String>,
}

impl QueryPair {
    /// Build a pair from raw strings, mapping blanks and the `"null"` literal to `None`.
    pub fn from_raw(search: Option<&str>, rerank: Option<&str>) -> Self {
        Self {
            search: search.and_then(normalize_query),
            rerank: rerank.and_then(normalize_query),
        }
    }

    /// Query to rerank against: the refined query, or the search query when absent.
    pub fn rerank_query(&self) -> Option<&str> {
        self.rerank.as_deref().or(self.search.as_deref())
    }
}

fn normalize_query(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NO_SEARCH_SENTINEL) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// SHA-256 of cleaned document text, hex-encoded.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_roundtrip() {
        let id = DocumentId::new();
        let s = id.to_string();
        let parsed: DocumentId = s.parse().expect("parse DocumentId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn document_ids_are_unique() {
        let a = DocumentId::new();
        let b = DocumentId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn query_pair_maps_null_literal() {
        let pair = QueryPair::from_raw(Some("null"), Some(" NULL "));
        assert_eq!(pair.search, None);
        assert_eq!(pair.rerank, None);
        assert_eq!(pair.rerank_query(), None);

        let pair = QueryPair::from_raw(Some(" flood safety "), None);
        assert_eq!(pair.search.as_deref(), Some("flood safety"));
        assert_eq!(pair.rerank_query(), Some("flood safety"));

        let pair = QueryPair::from_raw(Some("flood"), Some("flood near river"));
        assert_eq!(pair.rerank_query(), Some("flood near river"));
    }

    #[test]
    fn ranked_passage_serializes_url() {
        let passage = RankedPassage {
            document: Document {
                id: DocumentId::new(),
                url: "https://ready.gov/floods".into(),
                text: "Turn around, don't drown.".into(),
                ingested_at: Utc::now(),
            },
            score: 0.93,
        };
        let json = serde_json::to_string(&passage).expect("serialize");
        assert!(json.contains("https://ready.gov/floods"));
        let parsed: RankedPassage = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.document.url, passage.document.url);
    }

    #[test]
    fn content_hash_is_stable() {
        let hash = content_hash("hello world");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }
}
