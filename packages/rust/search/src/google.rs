//! Google Custom Search JSON API backend.

use std::time::Duration;

use async_trait::async_trait;
use beacon_shared::{BeaconError, Result, SearchSection, require_env};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::{SearchBackend, SearchRequest};

/// Default timeout in seconds for a single results page.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("Beacon/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<CseItem>,
}

#[derive(Debug, Deserialize)]
struct CseItem {
    link: Option<String>,
}

/// Client for `GET customsearch/v1?key&cx&q&num&start`.
pub struct GoogleCse {
    client: Client,
    endpoint: Url,
    api_key: String,
    engine_id: String,
}

impl GoogleCse {
    /// Create a backend against an explicit endpoint.
    pub fn new(endpoint: &str, api_key: String, engine_id: String) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| BeaconError::config(format!("invalid search endpoint '{endpoint}': {e}")))?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| BeaconError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            engine_id,
        })
    }

    /// Create a backend from the `[search]` section, reading secrets from the environment.
    pub fn from_config(section: &SearchSection) -> Result<Self> {
        let api_key = require_env(&section.api_key_env)?;
        let engine_id = require_env(&section.engine_id_env)?;
        Self::new(&section.endpoint, api_key, engine_id)
    }
}

#[async_trait]
impl SearchBackend for GoogleCse {
    async fn fetch_page(&self, request: &SearchRequest) -> Result<Vec<String>> {
        let num = request.page_size.to_string();
        let start = request.start.to_string();

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", request.query.as_str()),
                ("num", num.as_str()),
                ("start", start.as_str()),
            ])
            .send()
            .await
            .map_err(|e| BeaconError::provider("search", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BeaconError::provider(
                "search",
                format!("HTTP {status} for start={}", request.start),
            ));
        }

        let body: CseResponse = response
            .json()
            .await
            .map_err(|e| BeaconError::provider("search", format!("invalid response body: {e}")))?;

        Ok(body.items.into_iter().filter_map(|item| item.link).collect())
    }

    fn name(&self) -> &str {
        "google-cse"
    }
}
