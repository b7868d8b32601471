//! Drops candidate URLs the corpus already holds.

use std::collections::HashSet;

use beacon_shared::Result;
use beacon_storage::{MetadataFilter, VectorStore};
use tracing::{error, info, instrument};

/// Return the candidates whose URL is not yet stored, in input order.
///
/// Repeats within `urls` collapse to their first occurrence. A store read
/// failure is returned, never treated as an empty corpus.
#[instrument(skip_all, fields(candidates = urls.len()))]
pub async fn filter_new(store: &dyn VectorStore, urls: &[String]) -> Result<Vec<String>> {
    if urls.is_empty() {
        return Ok(Vec::new());
    }

    let known: HashSet<String> = store
        .get_metadata(&MetadataFilter::all())
        .await
        .inspect_err(|e| error!(operation = "filter_new", error = %e, "corpus read failed"))?
        .into_iter()
        .map(|meta| meta.url)
        .collect();

    let mut seen = HashSet::with_capacity(urls.len());
    let fresh: Vec<String> = urls
        .iter()
        .filter(|url| !known.contains(url.as_str()) && seen.insert(*url))
        .inspect(|url| info!(%url, "new url"))
        .cloned()
        .collect();

    info!(known = known.len(), new = fresh.len(), "deduplicated candidates");
    Ok(fresh)
}
