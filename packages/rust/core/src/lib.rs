//! Pipeline orchestration for Beacon.
//!
//! Ties search, crawling, storage, and reranking into the two flows a turn
//! needs: ingestion (query → new documents) and retrieval (queries → ranked
//! passages). [`Pipeline::run_turn`] wires them together.

pub mod context;
pub mod dedup;
pub mod indexer;
pub mod pipeline;
pub mod retriever;

#[cfg(test)]
mod test_support;

pub use context::PipelineContext;
pub use dedup::filter_new;
pub use indexer::store_documents;
pub use pipeline::{IngestReport, Pipeline, ProgressReporter, SilentProgress};
pub use retriever::retrieve;
