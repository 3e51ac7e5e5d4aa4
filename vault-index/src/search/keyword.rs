//! Lexical search over the FTS5 mirror

use rusqlite::params;

use crate::db::IndexStore;
use crate::error::StoreError;
use crate::models::{sort_hits, SearchHit};

impl IndexStore {
    /// Full-text search ranked by bm25. Scores are negated bm25 so larger is
    /// better; the snippet comes from whichever column matched best.
    pub fn search_keyword(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, StoreError> {
        let match_expr = escape_fts5_query(query);
        if match_expr.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT path, title,
                    bm25(notes_fts) AS rank,
                    snippet(notes_fts, -1, '«', '»', '…', 32)
             FROM notes_fts
             WHERE notes_fts MATCH ?1
             ORDER BY rank, path
             LIMIT ?2",
        )?;
        let mut hits = stmt
            .query_map(params![match_expr, limit as i64], |row| {
                let rank: f64 = row.get(2)?;
                Ok(SearchHit {
                    path: row.get(0)?,
                    title: row.get(1)?,
                    score: -rank,
                    snippet: Some(row.get(3)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        sort_hits(&mut hits);
        Ok(hits)
    }
}

/// Turn free text into an FTS5 MATCH expression. Every whitespace-separated
/// token must match (implicit AND). Tokens with punctuation and bare
/// operator keywords are double-quoted so they match literally.
pub(crate) fn escape_fts5_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| {
            // FTS5 barewords allow only ASCII alphanumerics, '_' and non-ASCII
            let special = word
                .chars()
                .any(|c| c.is_ascii() && !c.is_ascii_alphanumeric() && c != '_');
            let operator = matches!(word, "AND" | "OR" | "NOT" | "NEAR");
            if special || operator {
                format!("\"{}\"", word.replace('"', "\"\""))
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteRecord;

    fn three_note_store() -> IndexStore {
        let store = IndexStore::open_in_memory().unwrap();
        let notes = [
            (
                "golang.md",
                "Go Programming",
                "Go is a statically typed programming language designed at Google. Error handling uses explicit values.",
                vec!["golang", "programming"],
            ),
            (
                "python.md",
                "Python Programming",
                "Python is a dynamically typed language popular for data science. Error handling uses exceptions.",
                vec!["python", "programming"],
            ),
            (
                "cooking.md",
                "Pasta Recipe",
                "Boil water, add pasta, cook for 10 minutes.",
                vec!["cooking"],
            ),
        ];
        for (i, (path, title, body, tags)) in notes.into_iter().enumerate() {
            store
                .upsert_note(&NoteRecord {
                    path: path.into(),
                    title: title.into(),
                    body: body.into(),
                    tags: tags.into_iter().map(String::from).collect(),
                    mod_time: i as i64 + 1,
                    ..Default::default()
                })
                .unwrap();
        }
        store
    }

    #[test]
    fn test_escape_fts5_query() {
        assert_eq!(escape_fts5_query("hello world"), "hello world");
        assert_eq!(escape_fts5_query("x402-protocol"), "\"x402-protocol\"");
        assert_eq!(escape_fts5_query("say \"hi\""), "say \"\"\"hi\"\"\"");
        assert_eq!(escape_fts5_query("cats OR dogs"), "cats \"OR\" dogs");
        assert_eq!(escape_fts5_query("   "), "");
    }

    #[test]
    fn test_all_terms_must_match() {
        let store = three_note_store();
        let hits = store.search_keyword("error handling", 10).unwrap();
        let mut paths: Vec<&str> = hits.iter().map(|h| h.path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["golang.md", "python.md"]);
        assert!(hits.iter().all(|h| h.score > 0.0));
    }

    #[test]
    fn test_single_note_term() {
        let store = three_note_store();
        let hits = store.search_keyword("Google", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "golang.md");
        assert_eq!(hits[0].title, "Go Programming");
        let snippet = hits[0].snippet.as_deref().unwrap();
        assert!(snippet.contains("«Google»"), "snippet: {snippet}");
    }

    #[test]
    fn test_title_only_match_marks_snippet() {
        let store = three_note_store();
        store
            .upsert_note(&NoteRecord {
                path: "weather.md".into(),
                title: "Zephyr".into(),
                body: "nothing relevant in the body".into(),
                mod_time: 5,
                ..Default::default()
            })
            .unwrap();

        let hits = store.search_keyword("zephyr", 10).unwrap();
        assert_eq!(hits.len(), 1);
        let snippet = hits[0].snippet.as_deref().unwrap();
        assert!(snippet.contains("«Zephyr»"), "snippet: {snippet}");
    }

    #[test]
    fn test_tags_and_titles_are_searchable() {
        let store = three_note_store();
        let hits = store.search_keyword("programming", 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_blank_and_hostile_queries() {
        let store = three_note_store();
        assert!(store.search_keyword("", 10).unwrap().is_empty());
        assert!(store.search_keyword("   ", 10).unwrap().is_empty());
        // Unbalanced syntax would be an FTS5 parse error if passed through
        assert!(store.search_keyword("pasta\" OR (boil", 10).is_ok());
        assert!(store.search_keyword("AND", 10).unwrap().is_empty());
    }

    #[test]
    fn test_limit_and_updates() {
        let store = three_note_store();
        assert_eq!(store.search_keyword("programming", 1).unwrap().len(), 1);

        store
            .upsert_note(&NoteRecord {
                path: "cooking.md".into(),
                title: "Pasta Recipe".into(),
                body: "Now about risotto instead.".into(),
                mod_time: 9,
                ..Default::default()
            })
            .unwrap();
        assert!(store.search_keyword("Boil", 10).unwrap().is_empty());
        assert_eq!(store.search_keyword("risotto", 10).unwrap().len(), 1);

        store.delete_note("golang.md").unwrap();
        assert!(store.search_keyword("Google", 10).unwrap().is_empty());
    }
}
