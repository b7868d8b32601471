//! Vector store for the Beacon corpus.
//!
//! The [`VectorStore`] trait is the seam between the pipeline and whatever
//! holds the corpus. Two backends are provided:
//! - [`LibsqlStore`]: durable libSQL file with embeddings stored as BLOBs
//! - [`InMemoryStore`]: process-local store for tests and ephemeral runs
//!
//! Both embed text through an [`Embedder`] and rank by cosine similarity.

pub mod embedding;
mod libsql_store;
mod memory;
mod migrations;

use async_trait::async_trait;
use beacon_shared::{Document, DocumentMeta, Result, ScoredDocument};

pub use embedding::{Embedder, OpenAiEmbedder, blob_to_vec, cosine_similarity, vec_to_blob};
pub use libsql_store::LibsqlStore;
pub use memory::InMemoryStore;

/// Restricts which documents [`VectorStore::get_metadata`] returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    /// Only documents with exactly this URL.
    pub url: Option<String>,
}

impl MetadataFilter {
    /// Match every document in the collection.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match documents stored under `url`.
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
        }
    }

    fn matches(&self, doc_url: &str) -> bool {
        self.url.as_deref().is_none_or(|u| u == doc_url)
    }
}

/// Abstract corpus storage.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get_metadata`](VectorStore::get_metadata) | Read `{id, url, ingested_at}` of stored documents |
/// | [`add`](VectorStore::add) | Insert a batch of documents (all or nothing) |
/// | [`query`](VectorStore::query) | Nearest documents to a text by embedding similarity |
/// | [`count`](VectorStore::count) | Number of stored documents |
///
/// Every failure, including embedding failures, is reported as
/// [`BeaconError::Storage`](beacon_shared::BeaconError::Storage).
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn get_metadata(&self, filter: &MetadataFilter) -> Result<Vec<DocumentMeta>>;

    async fn add(&self, documents: &[Document]) -> Result<()>;

    /// Up to `k` documents, most similar first.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredDocument>>;

    async fn count(&self) -> Result<u64>;

    /// Name of the collection this store reads and writes.
    fn collection(&self) -> &str;
}

/// Sort by descending similarity and keep the best `k`.
fn rank_top_k(mut scored: Vec<ScoredDocument>, k: usize) -> Vec<ScoredDocument> {
    scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    scored.truncate(k);
    scored
}
