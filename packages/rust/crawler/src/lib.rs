//! Page crawler: fetches candidate URLs concurrently and reduces each page to
//! its cleaned primary text.
//!
//! - [`extract`]: boilerplate removal on the parsed document
//! - [`clean`]: regex cleaning passes over the extracted HTML
//! - [`engine`]: bounded-concurrency fetcher with per-URL failure isolation

pub mod clean;
pub mod engine;
pub mod extract;

pub use clean::clean_text;
pub use engine::{CrawlFailure, CrawlOutcome, Crawler, FetchError};
pub use extract::extract_primary_html;
