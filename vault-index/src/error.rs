//! Error types for the index, the embedding client and the note source.

use thiserror::Error;

/// Failures of the persisted index. Fatal to whatever operation hit them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("cannot create index directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("embedding for {path} has {got} dimensions, want {want}")]
    EmbeddingDimension {
        path: String,
        got: usize,
        want: usize,
    },

    #[error("index connection lock poisoned")]
    LockPoisoned,
}

/// Failures of a single embedding request. Callers decide whether they are fatal.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Gemini API key not configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("API error {code} ({status}): {message}")]
    Api {
        code: i64,
        message: String,
        status: String,
    },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("empty embedding returned")]
    EmptyEmbedding,

    #[error("embedding has {got} dimensions, want {want}")]
    Dimension { got: usize, want: usize },

    #[error("requested {requested} embeddings, got {returned}")]
    CountMismatch { requested: usize, returned: usize },
}

// The request URL carries the API key as a query parameter
impl From<reqwest::Error> for EmbeddingError {
    fn from(e: reqwest::Error) -> Self {
        EmbeddingError::Http(e.without_url())
    }
}

/// Failures reading or writing notes in the vault.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("vault directory not found: {0}")]
    VaultNotFound(String),

    #[error("note not found: {0}")]
    NoteNotFound(String),

    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures that abort an indexing run.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to list vault notes: {0}")]
    Source(#[from] SourceError),
}

/// Failures of a search request.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to embed query: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("semantic search requires a Gemini API key")]
    EmbeddingUnavailable,

    #[error("unknown search mode: {0} (use keyword, semantic, or hybrid)")]
    UnknownMode(String),
}
