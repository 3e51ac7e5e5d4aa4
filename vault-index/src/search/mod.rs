//! Retrieval engine: keyword, semantic and hybrid search over the index

pub mod hybrid;
pub mod keyword;
pub mod semantic;

pub use hybrid::RRF_K;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::db::IndexStore;
use crate::embeddings::EmbeddingProvider;
use crate::error::SearchError;
use crate::models::SearchHit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Keyword,
    Semantic,
    #[default]
    Hybrid,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Keyword => "keyword",
            SearchMode::Semantic => "semantic",
            SearchMode::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keyword" => Ok(SearchMode::Keyword),
            "semantic" => Ok(SearchMode::Semantic),
            "hybrid" | "" => Ok(SearchMode::Hybrid),
            other => Err(SearchError::UnknownMode(other.to_string())),
        }
    }
}

/// Result of a search request. `mode` is the mode that actually ran, which
/// differs from the requested one when hybrid fell back to keyword.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub query: String,
    pub mode: SearchMode,
    pub results: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Run a search in the requested mode.
///
/// Semantic mode needs a configured provider. Hybrid mode degrades to
/// keyword search, with a notice, when the provider is unavailable or the
/// query cannot be embedded.
pub fn run_search(
    store: &IndexStore,
    provider: &dyn EmbeddingProvider,
    query: &str,
    mode: SearchMode,
    limit: usize,
) -> Result<SearchOutcome, SearchError> {
    let outcome = |mode, results, notice| SearchOutcome {
        query: query.to_string(),
        mode,
        results,
        notice,
    };

    match mode {
        SearchMode::Keyword => {
            let results = store.search_keyword(query, limit)?;
            Ok(outcome(SearchMode::Keyword, results, None))
        }
        SearchMode::Semantic => {
            if !provider.is_available() {
                return Err(SearchError::EmbeddingUnavailable);
            }
            if query.trim().is_empty() {
                return Ok(outcome(SearchMode::Semantic, Vec::new(), None));
            }
            let query_vec = provider.embed(query)?;
            let results = store.search_semantic(&query_vec, limit)?;
            Ok(outcome(SearchMode::Semantic, results, None))
        }
        SearchMode::Hybrid => {
            if !provider.is_available() {
                log::warn!("[SEARCH] No embedding key configured, using keyword search only");
                let results = store.search_keyword(query, limit)?;
                return Ok(outcome(
                    SearchMode::Keyword,
                    results,
                    Some("no Gemini API key, using keyword search only".to_string()),
                ));
            }
            if query.trim().is_empty() {
                return Ok(outcome(SearchMode::Hybrid, Vec::new(), None));
            }
            match provider.embed(query) {
                Ok(query_vec) => {
                    let results = store.search_hybrid(query, &query_vec, limit)?;
                    Ok(outcome(SearchMode::Hybrid, results, None))
                }
                Err(e) => {
                    log::warn!("[SEARCH] Query embedding failed, falling back to keyword: {}", e);
                    let results = store.search_keyword(query, limit)?;
                    Ok(outcome(
                        SearchMode::Keyword,
                        results,
                        Some(format!(
                            "embedding failed, falling back to keyword search: {}",
                            e
                        )),
                    ))
                }
            }
        }
    }
}
