//! Fakes shared by the unit tests in this crate.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use beacon_rerank::{RerankHit, Reranker};
use beacon_shared::{
    BeaconError, Document, DocumentId, DocumentMeta, Result, ScoredDocument,
};
use beacon_storage::{InMemoryStore, MetadataFilter, VectorStore};
use chrono::Utc;

#[path = "../tests/common/keyword.rs"]
mod keyword;

pub use keyword::KeywordEmbedder;

pub async fn store_with_docs(docs: &[(&str, &str)]) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new("test", Arc::new(KeywordEmbedder)));
    let documents: Vec<Document> = docs
        .iter()
        .map(|(url, text)| Document {
            id: DocumentId::new(),
            url: url.to_string(),
            text: text.to_string(),
            ingested_at: Utc::now(),
        })
        .collect();
    store.add(&documents).await.unwrap();
    store
}

pub async fn store_with(urls: &[&str]) -> Arc<InMemoryStore> {
    let docs: Vec<(&str, &str)> = urls.iter().map(|u| (*u, "flood")).collect();
    store_with_docs(&docs).await
}

/// Store whose every operation fails.
pub struct FailingStore;

#[async_trait]
impl VectorStore for FailingStore {
    async fn get_metadata(&self, _filter: &MetadataFilter) -> Result<Vec<DocumentMeta>> {
        Err(BeaconError::Storage("disk unavailable".into()))
    }

    async fn add(&self, _documents: &[Document]) -> Result<()> {
        Err(BeaconError::Storage("disk unavailable".into()))
    }

    async fn query(&self, _text: &str, _k: usize) -> Result<Vec<ScoredDocument>> {
        Err(BeaconError::Storage("disk unavailable".into()))
    }

    async fn count(&self) -> Result<u64> {
        Err(BeaconError::Storage("disk unavailable".into()))
    }

    fn collection(&self) -> &str {
        "failing"
    }
}

/// In-memory store that records the size of every `add` batch.
pub struct CountingStore {
    inner: InMemoryStore,
    batches: Mutex<Vec<usize>>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryStore::new("counting", Arc::new(KeywordEmbedder)),
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Document count of each `add` call, in call order.
    pub fn batches(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorStore for CountingStore {
    async fn get_metadata(&self, filter: &MetadataFilter) -> Result<Vec<DocumentMeta>> {
        self.inner.get_metadata(filter).await
    }

    async fn add(&self, documents: &[Document]) -> Result<()> {
        self.batches.lock().unwrap().push(documents.len());
        self.inner.add(documents).await
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredDocument>> {
        self.inner.query(text, k).await
    }

    async fn count(&self) -> Result<u64> {
        self.inner.count().await
    }

    fn collection(&self) -> &str {
        self.inner.collection()
    }
}

enum Script {
    Fail,
    /// Score candidate `i` with `scores[i]`, ignoring `top_n`.
    Echo(Vec<f64>),
    Fixed(Vec<(usize, f64)>),
}

/// Reranker returning canned results and recording its calls.
pub struct ScriptedReranker {
    script: Script,
    top_ns: Mutex<Vec<usize>>,
}

impl ScriptedReranker {
    fn with(script: Script) -> Self {
        Self {
            script,
            top_ns: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::with(Script::Fail)
    }

    pub fn echoing(scores: Vec<f64>) -> Self {
        Self::with(Script::Echo(scores))
    }

    pub fn fixed(hits: Vec<(usize, f64)>) -> Self {
        Self::with(Script::Fixed(hits))
    }

    pub fn calls(&self) -> usize {
        self.top_ns.lock().unwrap().len()
    }

    pub fn last_top_n(&self) -> Option<usize> {
        self.top_ns.lock().unwrap().last().copied()
    }
}

#[async_trait]
impl Reranker for ScriptedReranker {
    async fn rerank(
        &self,
        _query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>> {
        self.top_ns.lock().unwrap().push(top_n);
        match &self.script {
            Script::Fail => Err(BeaconError::provider("rerank", "HTTP 500")),
            Script::Echo(scores) => Ok(scores
                .iter()
                .take(documents.len())
                .enumerate()
                .map(|(index, &score)| RerankHit { index, score })
                .collect()),
            Script::Fixed(hits) => Ok(hits
                .iter()
                .map(|&(index, score)| RerankHit { index, score })
                .collect()),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
