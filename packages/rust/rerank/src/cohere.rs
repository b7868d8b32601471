//! Cohere `/v2/rerank` client.

use std::time::Duration;

use async_trait::async_trait;
use beacon_shared::{BeaconError, RerankSection, Result, require_env};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{RerankHit, Reranker};

/// User-Agent string for rerank requests.
const USER_AGENT: &str = concat!("Beacon/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f64,
}

pub struct CohereReranker {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl CohereReranker {
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
        })
    }

    /// Build from the `[rerank]` section, reading the key from the environment.
    pub fn from_config(section: &RerankSection) -> Result<Self> {
        let api_key = require_env(&section.api_key_env)?;
        Self::new(
            &section.endpoint,
            api_key,
            &section.model,
            Duration::from_secs(section.timeout_secs),
        )
    }
}

#[async_trait]
impl Reranker for CohereReranker {
    #[instrument(skip_all, fields(model = %self.model, documents = documents.len(), top_n = top_n))]
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&RerankRequest {
                model: &self.model,
                query,
                documents,
                top_n,
            })
            .send()
            .await
            .map_err(|e| BeaconError::provider("rerank", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BeaconError::provider("rerank", format!("HTTP {status}: {body}")));
        }

        let body: RerankResponse = response
            .json()
            .await
            .map_err(|e| BeaconError::provider("rerank", format!("invalid response body: {e}")))?;

        debug!(results = body.results.len(), "rerank response");

        Ok(body
            .results
            .into_iter()
            .map(|r| RerankHit {
                index: r.index,
                score: r.relevance_score,
            })
            .collect())
    }

    fn model(&self) -> &str {
        &self.model
    }
}
