//! Bag-of-words embedder shared by the unit and integration tests.

use async_trait::async_trait;
use beacon_shared::Result;
use beacon_storage::Embedder;

const VOCAB: &[&str] = &["flood", "fire", "earthquake", "river", "water", "smoke", "safety"];

/// Bag-of-words embedder over a small fixed vocabulary.
pub struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let lower = t.to_lowercase();
                VOCAB.iter().map(|w| lower.matches(w).count() as f32).collect()
            })
            .collect())
    }

    fn model(&self) -> &str {
        "keyword-test"
    }
}
