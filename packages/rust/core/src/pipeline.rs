//! End-to-end turn: query → search → dedup → crawl → store, then retrieve.

use std::time::{Duration, Instant};

use beacon_crawler::CrawlFailure;
use beacon_shared::{DocumentId, QueryPair, RankedPassage, Result};
use tracing::{info, instrument};

use crate::context::PipelineContext;
use crate::{dedup, indexer, retriever};

/// Summary of one ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// URLs returned by the search backend.
    pub candidates: usize,
    /// Candidates not already in the corpus.
    pub new_urls: usize,
    /// Pages that crawled and cleaned successfully.
    pub crawled: usize,
    pub failures: Vec<CrawlFailure>,
    /// Ids of the stored documents, in batch order.
    pub stored: Vec<DocumentId>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when ingestion completes.
    fn done(&self, report: &IngestReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _report: &IngestReport) {}
}

/// Ingestion and retrieval over one [`PipelineContext`].
#[derive(Clone)]
pub struct Pipeline {
    ctx: PipelineContext,
}

impl Pipeline {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Search the web for `query` and store every page not already held.
    ///
    /// Search and store failures abort the run; per-URL crawl failures are
    /// recorded in the report and skipped.
    #[instrument(skip_all, fields(query = %query))]
    pub async fn ingest(
        &self,
        query: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<IngestReport> {
        let start = Instant::now();
        let mut report = IngestReport::default();

        progress.phase("Searching the web");
        let urls = self.ctx.search.search(query).await?;
        report.candidates = urls.len();

        progress.phase("Checking corpus for known pages");
        let fresh = dedup::filter_new(self.ctx.store.as_ref(), &urls).await?;
        report.new_urls = fresh.len();

        progress.phase("Crawling new pages");
        let outcome = self.ctx.crawler.crawl(&fresh).await;
        report.crawled = outcome.pages.len();
        report.failures = outcome.failures;

        progress.phase("Storing documents");
        report.stored = indexer::store_documents(self.ctx.store.as_ref(), &outcome.pages).await?;

        report.elapsed = start.elapsed();
        progress.done(&report);

        info!(
            candidates = report.candidates,
            new = report.new_urls,
            crawled = report.crawled,
            failed = report.failures.len(),
            stored = report.stored.len(),
            elapsed_ms = report.elapsed.as_millis(),
            "ingest completed"
        );

        Ok(report)
    }

    /// Ranked passages for `semantic_query`, reranked against `rerank_query`.
    pub async fn retrieve(
        &self,
        semantic_query: &str,
        rerank_query: &str,
    ) -> Result<Vec<RankedPassage>> {
        retriever::retrieve(
            self.ctx.store.as_ref(),
            self.ctx.reranker.as_ref(),
            self.ctx.retrieval,
            semantic_query,
            rerank_query,
        )
        .await
    }

    /// Run one conversational turn.
    ///
    /// Without a search query nothing is touched and no passages are
    /// returned. Otherwise the search query is ingested and then used for
    /// similarity search, with the rerank query (or the search query when
    /// absent) for the rerank stage.
    #[instrument(skip_all, fields(search = ?turn.search, rerank = ?turn.rerank))]
    pub async fn run_turn(
        &self,
        turn: &QueryPair,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<RankedPassage>> {
        let Some(search) = turn.search.as_deref() else {
            info!("no search needed for this turn");
            return Ok(Vec::new());
        };
        let rerank = turn.rerank_query().unwrap_or(search);

        self.ingest(search, progress).await?;

        self.retrieve(search, rerank).await
    }
}
