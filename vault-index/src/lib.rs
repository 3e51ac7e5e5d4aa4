//! Search index for a markdown note vault.
//!
//! Notes are mirrored into SQLite (an FTS5 table for lexical search plus
//! Gemini embeddings for vector search), kept current by an incremental
//! indexer, and mined for related-note links, consensus tags and orphans.

pub mod config;
pub mod db;
pub mod embeddings;
pub mod enrich;
pub mod error;
pub mod indexer;
pub mod maintain;
pub mod models;
pub mod notes;
pub mod search;
pub mod vector;

pub use db::IndexStore;
pub use embeddings::{EmbeddingProvider, GeminiEmbeddingClient};
pub use indexer::{run_index, IndexStats};
pub use search::{run_search, SearchMode, SearchOutcome};
