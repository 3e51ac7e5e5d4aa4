//! Notes system: Obsidian-compatible markdown notes read from a vault directory
//!
//! Discovers notes, parses YAML frontmatter, headings and [[wikilinks]], and
//! writes back the few mutations the tool performs (related-note links,
//! frontmatter fixes).

pub mod file_ops;
pub mod frontmatter;
pub mod source;

pub use file_ops::NoteInfo;
pub use frontmatter::ParsedNote;
pub use source::{NoteSource, VaultSource};
