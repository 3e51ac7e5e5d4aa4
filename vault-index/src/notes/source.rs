//! The boundary between the index and wherever notes live.

use std::path::PathBuf;

use super::file_ops::{self, NoteInfo};
use super::frontmatter::{self, ParsedNote};
use crate::error::SourceError;

/// Supplies notes to the indexer, the analyzer's apply step and the health check.
pub trait NoteSource {
    /// Every note currently present, with path and modification time
    fn list_notes(&self) -> Result<Vec<NoteInfo>, SourceError>;

    /// Raw file content
    fn read_raw(&self, path: &str) -> Result<String, SourceError>;

    /// Replace the raw content of an existing note
    fn write_raw(&self, path: &str, content: &str) -> Result<(), SourceError>;

    /// Parsed title/tags/headings/body/wikilinks
    fn read_note(&self, path: &str) -> Result<ParsedNote, SourceError> {
        Ok(frontmatter::parse_note(&self.read_raw(path)?))
    }
}

/// Notes stored as markdown files under a vault directory
#[derive(Debug, Clone)]
pub struct VaultSource {
    vault_path: PathBuf,
}

impl VaultSource {
    pub fn new(vault_path: impl Into<PathBuf>) -> Self {
        Self {
            vault_path: vault_path.into(),
        }
    }
}

impl NoteSource for VaultSource {
    fn list_notes(&self) -> Result<Vec<NoteInfo>, SourceError> {
        file_ops::list_notes(&self.vault_path)
    }

    fn read_raw(&self, path: &str) -> Result<String, SourceError> {
        file_ops::read_note(&self.vault_path, path)
    }

    fn write_raw(&self, path: &str, content: &str) -> Result<(), SourceError> {
        file_ops::write_note(&self.vault_path, path, content)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_vault_source_reads_parsed_notes() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("topic.md"),
            "---\ntitle: Topic\ntags: [a]\n---\n# Topic\nsee [[Other]]\n",
        )
        .unwrap();

        let source = VaultSource::new(dir.path());
        let notes = source.list_notes().unwrap();
        assert_eq!(notes.len(), 1);

        let parsed = source.read_note("topic.md").unwrap();
        assert_eq!(parsed.frontmatter.title.as_deref(), Some("Topic"));
        assert_eq!(parsed.wikilinks, vec!["Other"]);

        source.write_raw("topic.md", "rewritten").unwrap();
        assert_eq!(source.read_raw("topic.md").unwrap(), "rewritten");
        assert!(source.write_raw("absent.md", "x").is_err());
    }
}
