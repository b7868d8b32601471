//! Fakes for the pipeline integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use beacon_core::PipelineContext;
use beacon_crawler::Crawler;
use beacon_rerank::{RerankHit, Reranker};
use beacon_search::{SearchBackend, SearchProvider, SearchRequest};
use beacon_shared::{BeaconError, CrawlConfig, Result, RetrievalConfig, SearchConfig};
use beacon_storage::{InMemoryStore, VectorStore};

mod keyword;

pub use keyword::KeywordEmbedder;

/// Serves a fixed URL list as the first page and nothing afterwards.
pub struct FixedSearch {
    pub urls: Vec<String>,
    pub requests: Mutex<usize>,
    pub fail: bool,
}

impl FixedSearch {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            requests: Mutex::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn requests(&self) -> usize {
        *self.requests.lock().unwrap()
    }
}

#[async_trait]
impl SearchBackend for FixedSearch {
    async fn fetch_page(&self, request: &SearchRequest) -> Result<Vec<String>> {
        *self.requests.lock().unwrap() += 1;
        if self.fail {
            return Err(BeaconError::provider("search", "HTTP 429"));
        }
        if request.start == 1 {
            Ok(self.urls.clone())
        } else {
            Ok(Vec::new())
        }
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Scores each passage by how many query words it contains.
pub struct OverlapReranker {
    pub calls: Mutex<usize>,
    pub fail: bool,
}

impl OverlapReranker {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(0),
            fail: false,
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Reranker for OverlapReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Err(BeaconError::provider("rerank", "HTTP 500"));
        }
        assert!(top_n <= documents.len(), "top_n exceeds document count");

        let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        let mut hits: Vec<RerankHit> = documents
            .iter()
            .enumerate()
            .map(|(index, doc)| {
                let lower = doc.to_lowercase();
                let overlap = words.iter().filter(|w| lower.contains(w.as_str())).count();
                RerankHit {
                    index,
                    score: overlap as f64 / words.len().max(1) as f64,
                }
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_n);
        Ok(hits)
    }

    fn model(&self) -> &str {
        "overlap"
    }
}

pub struct Harness {
    pub ctx: PipelineContext,
    pub search: Arc<FixedSearch>,
    pub store: Arc<InMemoryStore>,
    pub reranker: Arc<OverlapReranker>,
}

/// Context over fakes plus a real crawler allowed to hit the local mock server.
pub fn harness(search_urls: Vec<String>, crawl_timeout: Duration) -> Harness {
    harness_with(FixedSearch::new(search_urls), crawl_timeout)
}

pub fn harness_with(search: FixedSearch, crawl_timeout: Duration) -> Harness {
    let search = Arc::new(search);
    let store = Arc::new(InMemoryStore::new("emergency", Arc::new(KeywordEmbedder)));
    let reranker = Arc::new(OverlapReranker::new());

    let crawler = Crawler::new(CrawlConfig {
        concurrency: 4,
        timeout: crawl_timeout,
        allow_private_hosts: true,
    })
    .unwrap();

    let ctx = PipelineContext::new(
        SearchProvider::new(search.clone(), SearchConfig::default()),
        crawler,
        store.clone() as Arc<dyn VectorStore>,
        reranker.clone() as Arc<dyn Reranker>,
        RetrievalConfig::default(),
    );

    Harness {
        ctx,
        search,
        store,
        reranker,
    }
}

pub fn page(body: &str) -> String {
    format!("<html><head><title>t</title></head><body><header>Site</header><main>{body}</main><footer>Legal</footer></body></html>")
}
