//! Writes crawled pages into the corpus.

use beacon_shared::{CrawledPages, Document, DocumentId, Result};
use beacon_storage::VectorStore;
use chrono::Utc;
use tracing::{error, info, instrument};

/// Store every page as a new document in one batch.
///
/// Returns the assigned ids in batch order (the mapping's URL order). No
/// deduplication happens here. Empty input writes nothing.
#[instrument(skip_all, fields(pages = pages.len()))]
pub async fn store_documents(
    store: &dyn VectorStore,
    pages: &CrawledPages,
) -> Result<Vec<DocumentId>> {
    if pages.is_empty() {
        info!("no new urls to add");
        return Ok(Vec::new());
    }

    let now = Utc::now();
    let documents: Vec<Document> = pages
        .iter()
        .map(|(url, text)| Document {
            id: DocumentId::new(),
            url: url.clone(),
            text: text.clone(),
            ingested_at: now,
        })
        .collect();

    store
        .add(&documents)
        .await
        .inspect_err(|e| error!(operation = "store_documents", error = %e, "batch write failed"))?;

    info!(count = documents.len(), "stored documents in batch");
    Ok(documents.into_iter().map(|d| d.id).collect())
}
