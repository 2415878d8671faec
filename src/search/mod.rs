//! Search module
//!
//! Autocomplete over static lists of author names and quote contexts.
//!
//! - `catalog`: category to file mapping and per-request loading
//! - `filter`: case-insensitive substring containment

pub mod catalog;
pub mod filter;

pub use catalog::Category;

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("failed to read list '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("list '{path}' is not a JSON array of strings: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Load the list for `category` and return the entries matching `term`
pub async fn search(dir: &Path, category: &str, term: &str) -> Result<Vec<String>, SearchError> {
    let entries = catalog::load_entries(dir, Category::from_form(category)).await?;
    Ok(filter::filter_entries(entries, term))
}
