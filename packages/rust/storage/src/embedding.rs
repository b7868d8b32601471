//! Text embedding backends and vector helpers.

use std::time::Duration;

use async_trait::async_trait;
use beacon_shared::{BeaconError, EmbeddingSection, Result, require_env};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// User-Agent string for embedding requests.
const USER_AGENT: &str = concat!("Beacon/", env!("CARGO_PKG_VERSION"));

/// Rough characters-per-token ratio used to bound input size.
const CHARS_PER_TOKEN: usize = 4;

/// Default per-input token bound, under the 8191-token model limit.
pub const DEFAULT_MAX_INPUT_TOKENS: usize = 8000;

/// Turns text into dense vectors for similarity search.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `texts`, returning one vector per input in input order.
    ///
    /// Failures are reported as [`BeaconError::Embedding`].
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Model identifier recorded alongside stored vectors.
    fn model(&self) -> &str;
}

// ---------------------------------------------------------------------------
// OpenAI-compatible embeddings endpoint
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

/// Client for `POST /v1/embeddings`.
///
/// Inputs longer than the token bound are clipped before sending; the
/// stored document text is unaffected.
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_input_chars: usize,
}

impl OpenAiEmbedder {
    pub fn new(endpoint: &str, api_key: String, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| BeaconError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
            model: model.to_string(),
            max_input_chars: DEFAULT_MAX_INPUT_TOKENS * CHARS_PER_TOKEN,
        })
    }

    /// Bound each input to roughly `tokens` tokens (at least one).
    pub fn with_max_input_tokens(mut self, tokens: usize) -> Self {
        self.max_input_chars = tokens.max(1) * CHARS_PER_TOKEN;
        self
    }

    /// Build from the `[embedding]` section, reading the key from the environment.
    pub fn from_config(section: &EmbeddingSection) -> Result<Self> {
        let api_key = require_env(&section.api_key_env)?;
        let embedder = Self::new(
            &section.endpoint,
            api_key,
            &section.model,
            Duration::from_secs(section.timeout_secs),
        )?;
        Ok(embedder.with_max_input_tokens(section.max_input_tokens))
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    #[instrument(skip_all, fields(texts = texts.len(), model = %self.model))]
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let input: Vec<&str> = texts
            .iter()
            .map(|text| clip_chars(text, self.max_input_chars))
            .collect();
        let clipped = input
            .iter()
            .zip(texts)
            .filter(|(sent, full)| sent.len() < full.len())
            .count();
        if clipped > 0 {
            debug!(clipped, max_chars = self.max_input_chars, "clipped oversized inputs");
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input,
            })
            .send()
            .await
            .map_err(|e| BeaconError::Embedding(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BeaconError::Embedding(format!("HTTP {status}: {body}")));
        }

        let mut body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| BeaconError::Embedding(format!("invalid response body: {e}")))?;

        if body.data.len() != texts.len() {
            return Err(BeaconError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.data.len()
            )));
        }

        // The service may return items out of order.
        body.data.sort_by_key(|item| item.index);
        debug!(dims = body.data[0].embedding.len(), "embedded batch");

        Ok(body.data.into_iter().map(|item| item.embedding).collect())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// The first `max_chars` characters of `text`.
fn clip_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

// ---------------------------------------------------------------------------
// Vector helpers
// ---------------------------------------------------------------------------

/// Encode a vector as little-endian `f32` bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode little-endian `f32` bytes; trailing partial chunks are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1, 1]`; `0.0` for empty, mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
