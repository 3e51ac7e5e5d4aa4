use serde::Serialize;

/// Separator for tags in the full-text column
pub const LIST_SEPARATOR: &str = ", ";
/// Separator for headings in their stored form
pub const HEADING_SEPARATOR: &str = "\n";

/// One indexed note. `path` is the sole identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NoteRecord {
    pub path: String,
    pub title: String,
    pub tags: Vec<String>,
    pub headings: Vec<String>,
    pub wikilinks: Vec<String>,
    pub body: String,
    pub mod_time: i64,
    /// Absent until an embedding call succeeds for this note
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

impl NoteRecord {
    pub fn tags_text(&self) -> String {
        self.tags.join(LIST_SEPARATOR)
    }

    pub fn headings_text(&self) -> String {
        self.headings.join(HEADING_SEPARATOR)
    }

    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }
}

/// JSON array form of a list column. Items may contain any separator.
pub fn encode_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Read a list column written by [`encode_list`]. Rows from older indexes
/// hold comma-joined text and are split instead.
pub fn decode_list(text: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(text) {
        Ok(items) => items,
        Err(_) => split_stored(text, LIST_SEPARATOR),
    }
}

/// Split a stored list column back into items
pub fn split_stored(text: &str, separator: &str) -> Vec<String> {
    text.split(separator)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
