//! Application configuration for Beacon.
//!
//! User config lives at `~/.beacon/beacon.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets never live in the file: each backend section names the
//! environment variable that holds its key.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BeaconError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "beacon.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".beacon";

// ---------------------------------------------------------------------------
// Config structs (matching beacon.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub search: SearchSection,

    #[serde(default)]
    pub crawl: CrawlSection,

    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub embedding: EmbeddingSection,

    #[serde(default)]
    pub rerank: RerankSection,

    #[serde(default)]
    pub retrieval: RetrievalSection,
}

/// `[search]` section: Google Custom Search backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSection {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Name of the env var holding the search engine (cx) id.
    #[serde(default = "default_engine_id_env")]
    pub engine_id_env: String,

    /// Number of result pages requested per search.
    #[serde(default = "default_pages")]
    pub pages: u32,

    /// Results per page (the backend caps this at 10).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            api_key_env: default_search_key_env(),
            engine_id_env: default_engine_id_env(),
            pages: default_pages(),
            page_size: default_page_size(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}
fn default_search_key_env() -> String {
    "GOOGLE_API_KEY".into()
}
fn default_engine_id_env() -> String {
    "CSE_ID".into()
}
fn default_pages() -> u32 {
    5
}
fn default_page_size() -> u32 {
    10
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSection {
    /// Maximum concurrent page fetches.
    #[serde(default = "default_crawl_concurrency")]
    pub concurrency: u32,

    /// Per-fetch timeout.
    #[serde(default = "default_crawl_timeout")]
    pub timeout_secs: u64,

    /// Permit loopback/private targets (local testing only).
    #[serde(default)]
    pub allow_private_hosts: bool,
}

impl Default for CrawlSection {
    fn default() -> Self {
        Self {
            concurrency: default_crawl_concurrency(),
            timeout_secs: default_crawl_timeout(),
            allow_private_hosts: false,
        }
    }
}

fn default_crawl_concurrency() -> u32 {
    8
}
fn default_crawl_timeout() -> u64 {
    30
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    /// Database file path; a leading `~/` expands to the home directory.
    #[serde(default = "default_store_path")]
    pub path: String,

    /// Collection holding this deployment's corpus.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Description recorded when the collection is first created.
    #[serde(default = "default_collection_description")]
    pub description: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            collection: default_collection(),
            description: default_collection_description(),
        }
    }
}

fn default_store_path() -> String {
    "~/.beacon/beacon.db".into()
}
fn default_collection() -> String {
    "emergency".into()
}
fn default_collection_description() -> String {
    "Emergency information database".into()
}

/// `[embedding]` section: OpenAI-compatible embeddings endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSection {
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_embedding_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Per-input token bound; longer texts are clipped before embedding.
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            endpoint: default_embedding_endpoint(),
            api_key_env: default_embedding_key_env(),
            model: default_embedding_model(),
            timeout_secs: default_embedding_timeout(),
            max_input_tokens: default_max_input_tokens(),
        }
    }
}

fn default_embedding_endpoint() -> String {
    "https://api.openai.com/v1/embeddings".into()
}
fn default_embedding_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_embedding_timeout() -> u64 {
    30
}
fn default_max_input_tokens() -> usize {
    8000
}

/// `[rerank]` section: Cohere rerank endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankSection {
    #[serde(default = "default_rerank_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_rerank_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_rerank_model")]
    pub model: String,

    #[serde(default = "default_rerank_timeout")]
    pub timeout_secs: u64,
}

impl Default for RerankSection {
    fn default() -> Self {
        Self {
            endpoint: default_rerank_endpoint(),
            api_key_env: default_rerank_key_env(),
            model: default_rerank_model(),
            timeout_secs: default_rerank_timeout(),
        }
    }
}

fn default_rerank_endpoint() -> String {
    "https://api.cohere.com/v2/rerank".into()
}
fn default_rerank_key_env() -> String {
    "COHERE_API_KEY".into()
}
fn default_rerank_model() -> String {
    "rerank-v3.5".into()
}
fn default_rerank_timeout() -> u64 {
    30
}

/// `[retrieval]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSection {
    /// Nearest neighbours requested from the store.
    #[serde(default = "default_candidates")]
    pub candidates: usize,

    /// Maximum passages returned after reranking.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            candidates: default_candidates(),
            top_n: default_top_n(),
        }
    }
}

fn default_candidates() -> usize {
    100
}
fn default_top_n() -> usize {
    10
}

// ---------------------------------------------------------------------------
// Runtime configs (immutable, derived from the file config)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum concurrent HTTP requests.
    pub concurrency: usize,
    /// Timeout applied to each fetch independently.
    pub timeout: Duration,
    /// Permit loopback/private targets.
    pub allow_private_hosts: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: config.crawl.concurrency.max(1) as usize,
            timeout: Duration::from_secs(config.crawl.timeout_secs),
            allow_private_hosts: config.crawl.allow_private_hosts,
        }
    }
}

/// Runtime pagination settings for the search provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    pub pages: u32,
    pub page_size: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for SearchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            pages: config.search.pages,
            page_size: config.search.page_size,
        }
    }
}

/// Runtime retrieval limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalConfig {
    pub candidates: usize,
    pub top_n: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for RetrievalConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            candidates: config.retrieval.candidates,
            top_n: config.retrieval.top_n,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.beacon/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| BeaconError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.beacon/beacon.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| BeaconError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| BeaconError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BeaconError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| BeaconError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BeaconError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a secret from the environment variable named by `var_name`.
pub fn require_env(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(BeaconError::config(format!(
            "{var_name} is not set; export it before running the pipeline"
        ))),
    }
}

/// Expand a leading `~/` against the home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| BeaconError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}
