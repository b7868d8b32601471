//! Shared types, error model, and configuration for Beacon.
//!
//! This crate is the foundation depended on by all other Beacon crates.
//! It provides:
//! - [`BeaconError`]: the unified error type
//! - Domain types ([`Document`], [`DocumentId`], [`RankedPassage`], [`QueryPair`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, CrawlSection, EmbeddingSection, RerankSection, RetrievalConfig,
    RetrievalSection, SearchConfig, SearchSection, StoreSection, config_dir, config_file_path,
    expand_home, init_config, load_config, load_config_from, require_env,
};
pub use error::{BeaconError, Result};
pub use types::{
    CrawledPages, Document, DocumentId, DocumentMeta, NO_SEARCH_SENTINEL, QueryPair,
    RankedPassage, ScoredDocument, content_hash,
};
