//! Second-stage relevance scoring.
//!
//! A [`Reranker`] scores candidate passages against a query with a model
//! that sees both at once, which orders results more precisely than the
//! embedding similarity used to select the candidates.

mod cohere;

use async_trait::async_trait;
use beacon_shared::Result;

pub use cohere::CohereReranker;

/// One reranked candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankHit {
    /// Position of the candidate in the slice passed to [`Reranker::rerank`].
    pub index: usize,
    /// Relevance score, higher is better.
    pub score: f64,
}

/// Scores documents against a query.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Return at most `top_n` hits, most relevant first.
    ///
    /// `top_n` must not exceed `documents.len()`. Failures are reported as
    /// [`BeaconError::Provider`](beacon_shared::BeaconError::Provider).
    async fn rerank(&self, query: &str, documents: &[String], top_n: usize)
    -> Result<Vec<RerankHit>>;

    /// Model identifier, for tracing.
    fn model(&self) -> &str;
}
