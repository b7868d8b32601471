//! Two-stage retrieval: embedding similarity, then rerank.

use beacon_rerank::Reranker;
use beacon_shared::{BeaconError, RankedPassage, Result, RetrievalConfig};
use beacon_storage::VectorStore;
use tracing::{error, info, instrument};

/// Retrieve the passages most relevant to `rerank_query`.
///
/// Stage 1 takes up to `config.candidates` nearest documents to
/// `semantic_query`. Stage 2 reranks them against `rerank_query` and keeps
/// at most `min(config.top_n, candidates)`, highest score first. Either
/// stage failing fails the call; there is no unranked fallback.
#[instrument(skip_all, fields(semantic = %semantic_query, rerank = %rerank_query))]
pub async fn retrieve(
    store: &dyn VectorStore,
    reranker: &dyn Reranker,
    config: RetrievalConfig,
    semantic_query: &str,
    rerank_query: &str,
) -> Result<Vec<RankedPassage>> {
    if semantic_query.trim().is_empty() || rerank_query.trim().is_empty() {
        return Err(BeaconError::validation("retrieval queries must not be empty"));
    }

    let candidates = store
        .query(semantic_query, config.candidates)
        .await
        .inspect_err(|e| error!(operation = "retrieve", stage = "similarity", error = %e, "similarity search failed"))?;

    if candidates.is_empty() {
        info!("no candidates; skipping rerank");
        return Ok(Vec::new());
    }

    let top_n = config.top_n.min(candidates.len());
    let texts: Vec<String> = candidates.iter().map(|c| c.document.text.clone()).collect();

    let hits = reranker
        .rerank(rerank_query, &texts, top_n)
        .await
        .inspect_err(|e| error!(operation = "retrieve", stage = "rerank", error = %e, "rerank failed"))?;

    let mut passages = Vec::with_capacity(hits.len());
    for hit in hits {
        let Some(candidate) = candidates.get(hit.index) else {
            let err = BeaconError::provider(
                "rerank",
                format!("result index {} out of range for {} candidates", hit.index, candidates.len()),
            );
            error!(operation = "retrieve", stage = "rerank", error = %err, "invalid rerank result");
            return Err(err);
        };
        passages.push(RankedPassage {
            document: candidate.document.clone(),
            score: hit.score,
        });
    }

    passages.sort_by(|a, b| b.score.total_cmp(&a.score));
    passages.truncate(top_n);

    info!(candidates = candidates.len(), passages = passages.len(), "retrieval completed");
    Ok(passages)
}
