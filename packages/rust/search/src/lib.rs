//! Web search provider: turns a query into an ordered list of candidate URLs.
//!
//! [`SearchProvider`] owns the pagination policy (a fixed number of pages,
//! fetched one after another) while a [`SearchBackend`] performs the single
//! page request against a concrete service such as [`GoogleCse`].

mod google;

use std::sync::Arc;

use async_trait::async_trait;
use beacon_shared::{BeaconError, Result, SearchConfig};
use tracing::{debug, error, info, instrument};

pub use google::GoogleCse;

/// One page request. Built fresh for every call and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    /// Results per page.
    pub page_size: u32,
    /// Offset of the first result, `page_size * page_index + 1`.
    pub start: u32,
}

impl SearchRequest {
    /// Request for the zero-based `page_index`.
    pub fn page(query: &str, page_size: u32, page_index: u32) -> Self {
        Self {
            query: query.to_string(),
            page_size,
            start: page_size * page_index + 1,
        }
    }
}

/// A web-search service returning result URLs for one page.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Fetch one page of results, preserving the service's relevance order.
    ///
    /// Failures must be reported as [`BeaconError::Provider`].
    async fn fetch_page(&self, request: &SearchRequest) -> Result<Vec<String>>;

    /// Short backend name for tracing.
    fn name(&self) -> &str;
}

/// Paginated search over a [`SearchBackend`].
#[derive(Clone)]
pub struct SearchProvider {
    backend: Arc<dyn SearchBackend>,
    config: SearchConfig,
}

impl SearchProvider {
    pub fn new(backend: Arc<dyn SearchBackend>, config: SearchConfig) -> Self {
        Self { backend, config }
    }

    /// Search for `query`, returning up to `pages * page_size` URLs.
    ///
    /// Pages are requested sequentially; the first failing page aborts the
    /// whole search and its error is returned unchanged.
    #[instrument(skip_all, fields(query = %query, backend = self.backend.name()))]
    pub async fn search(&self, query: &str) -> Result<Vec<String>> {
        if query.trim().is_empty() {
            return Err(BeaconError::validation("search query must not be empty"));
        }

        let mut urls = Vec::with_capacity((self.config.pages * self.config.page_size) as usize);

        for page_index in 0..self.config.pages {
            let request = SearchRequest::page(query, self.config.page_size, page_index);
            let page = self.backend.fetch_page(&request).await.inspect_err(|e| {
                error!(operation = "search", page = page_index, error = %e, "search failed");
            })?;
            debug!(page = page_index, start = request.start, results = page.len(), "fetched page");
            urls.extend(page);
        }

        info!(urls = urls.len(), "search completed");
        Ok(urls)
    }
}
