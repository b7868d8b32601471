//! In-memory [`VectorStore`] for tests and ephemeral runs.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use beacon_shared::{BeaconError, Document, DocumentMeta, Result, ScoredDocument};

use crate::embedding::{Embedder, cosine_similarity};
use crate::{MetadataFilter, VectorStore, rank_top_k};

struct StoredDocument {
    document: Document,
    vector: Vec<f32>,
}

/// Brute-force cosine search over documents held in a `Vec`.
pub struct InMemoryStore {
    collection: String,
    embedder: Arc<dyn Embedder>,
    docs: RwLock<Vec<StoredDocument>>,
}

impl InMemoryStore {
    pub fn new(collection: impl Into<String>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            collection: collection.into(),
            embedder,
            docs: RwLock::new(Vec::new()),
        }
    }
}

fn poisoned<T>(_: T) -> BeaconError {
    BeaconError::Storage("in-memory store lock poisoned".into())
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn get_metadata(&self, filter: &MetadataFilter) -> Result<Vec<DocumentMeta>> {
        let docs = self.docs.read().map_err(poisoned)?;
        Ok(docs
            .iter()
            .filter(|d| filter.matches(&d.document.url))
            .map(|d| DocumentMeta::from(&d.document))
            .collect())
    }

    async fn add(&self, documents: &[Document]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self
            .embedder
            .embed(&texts)
            .await
            .map_err(|e| BeaconError::Storage(format!("embedding failed: {e}")))?;

        if vectors.len() != documents.len() {
            return Err(BeaconError::Storage(format!(
                "embedder returned {} vectors for {} documents",
                vectors.len(),
                documents.len()
            )));
        }

        let mut docs = self.docs.write().map_err(poisoned)?;
        docs.extend(
            documents
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(document, vector)| StoredDocument { document, vector }),
        );
        Ok(())
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredDocument>> {
        let query_vec = self
            .embedder
            .embed(&[text.to_string()])
            .await
            .map_err(|e| BeaconError::Storage(format!("embedding failed: {e}")))?
            .into_iter()
            .next()
            .ok_or_else(|| BeaconError::Storage("embedder returned no query vector".into()))?;

        let docs = self.docs.read().map_err(poisoned)?;
        let scored = docs
            .iter()
            .map(|d| ScoredDocument {
                document: d.document.clone(),
                similarity: cosine_similarity(&query_vec, &d.vector),
            })
            .collect();

        Ok(rank_top_k(scored, k))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.docs.read().map_err(poisoned)?.len() as u64)
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
