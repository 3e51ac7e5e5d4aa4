use std::env;
use std::path::{Path, PathBuf};

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
    pub const VAULT_PATH: &str = "OBSIDIAN_VAULT_PATH";
    /// Explicit override for the index database location.
    /// Default: <vault>/.obsidian/search.db
    pub const INDEX_DB_PATH: &str = "VAULT_INDEX_DB_PATH";
}

/// Default values
pub mod defaults {
    pub const INDEX_DIR: &str = ".obsidian";
    pub const INDEX_DB_FILE: &str = "search.db";
    /// Max number of texts sent in one batchEmbedContents call
    pub const EMBED_BATCH_SIZE: usize = 100;
    /// Body characters kept in the embedding input
    pub const EMBED_BODY_BUDGET: usize = 8000;
    pub const SEARCH_LIMIT: usize = 20;
    pub const STALE_DAYS: i64 = 30;
}

/// Index database path for a vault: <vault>/.obsidian/search.db
pub fn index_db_path(vault_path: &Path) -> PathBuf {
    vault_path
        .join(defaults::INDEX_DIR)
        .join(defaults::INDEX_DB_FILE)
}

#[derive(Clone, Debug)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub vault_path: Option<PathBuf>,
    pub index_db_path: Option<PathBuf>,
}

impl Config {
    /// Read configuration from the environment (call `dotenv().ok()` first
    /// to pick up a local .env file). Blank values count as unset.
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: non_empty_var(env_vars::GEMINI_API_KEY),
            vault_path: non_empty_var(env_vars::VAULT_PATH).map(PathBuf::from),
            index_db_path: non_empty_var(env_vars::INDEX_DB_PATH).map(PathBuf::from),
        }
    }

    /// Override the vault path (e.g. from a command-line flag)
    pub fn with_vault_path(mut self, vault_path: Option<PathBuf>) -> Self {
        if vault_path.is_some() {
            self.vault_path = vault_path;
        }
        self
    }

    /// Resolve the index database: explicit override, else inside the vault
    pub fn index_db_path(&self) -> Option<PathBuf> {
        self.index_db_path
            .clone()
            .or_else(|| self.vault_path.as_deref().map(index_db_path))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
