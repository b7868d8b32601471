//! Shared clients, built once at start-up and handed to every component.

use std::sync::Arc;

use beacon_crawler::Crawler;
use beacon_rerank::{CohereReranker, Reranker};
use beacon_search::{GoogleCse, SearchProvider};
use beacon_shared::{
    AppConfig, CrawlConfig, Result, RetrievalConfig, SearchConfig, expand_home,
};
use beacon_storage::{LibsqlStore, OpenAiEmbedder, VectorStore};
use tracing::info;

/// Everything a pipeline turn needs. Cheap to clone.
#[derive(Clone)]
pub struct PipelineContext {
    pub search: SearchProvider,
    pub crawler: Crawler,
    pub store: Arc<dyn VectorStore>,
    pub reranker: Arc<dyn Reranker>,
    pub retrieval: RetrievalConfig,
}

impl PipelineContext {
    pub fn new(
        search: SearchProvider,
        crawler: Crawler,
        store: Arc<dyn VectorStore>,
        reranker: Arc<dyn Reranker>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            search,
            crawler,
            store,
            reranker,
            retrieval,
        }
    }

    /// Build production clients from `config`.
    ///
    /// Reads API keys from the environment variables the config names and
    /// opens (or creates) the libSQL database and collection.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let search = SearchProvider::new(
            Arc::new(GoogleCse::from_config(&config.search)?),
            SearchConfig::from(config),
        );
        let crawler = Crawler::new(CrawlConfig::from(config))?;
        let reranker: Arc<dyn Reranker> = Arc::new(CohereReranker::from_config(&config.rerank)?);

        let store = Self::open_store(config).await?;

        Ok(Self::new(
            search,
            crawler,
            store,
            reranker,
            RetrievalConfig::from(config),
        ))
    }

    /// Open only the corpus store; enough for read-only commands like `stats`.
    pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn VectorStore>> {
        let embedder = Arc::new(OpenAiEmbedder::from_config(&config.embedding)?);
        let path = expand_home(&config.store.path)?;

        let store = LibsqlStore::open(
            &path,
            &config.store.collection,
            &config.store.description,
            embedder,
        )
        .await?;

        info!(path = %path.display(), collection = %config.store.collection, "store ready");
        Ok(Arc::new(store))
    }
}
