//! Hybrid search: Reciprocal Rank Fusion of the lexical and vector rankings

use std::collections::BTreeMap;

use crate::db::IndexStore;
use crate::error::StoreError;
use crate::models::{sort_hits, SearchHit};

/// RRF smoothing constant
pub const RRF_K: f64 = 60.0;

impl IndexStore {
    /// Fuse keyword and semantic results. Each pool holds up to `limit * 2`
    /// hits; a note at 1-based rank r in a pool contributes `1 / (RRF_K + r)`.
    pub fn search_hybrid(
        &self,
        query: &str,
        query_vec: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let pool = limit.saturating_mul(2);
        let lexical = self.search_keyword(query, pool)?;
        let semantic = self.search_semantic(query_vec, pool)?;
        Ok(fuse(lexical, semantic, limit))
    }
}

/// Title comes from the first pool that has the note, snippet only from
/// the lexical pool.
fn fuse(lexical: Vec<SearchHit>, semantic: Vec<SearchHit>, limit: usize) -> Vec<SearchHit> {
    let mut fused: BTreeMap<String, SearchHit> = BTreeMap::new();

    for (rank, hit) in lexical.into_iter().enumerate() {
        let contribution = rrf(rank);
        fused
            .entry(hit.path.clone())
            .and_modify(|h| h.score += contribution)
            .or_insert(SearchHit {
                score: contribution,
                ..hit
            });
    }
    for (rank, hit) in semantic.into_iter().enumerate() {
        let contribution = rrf(rank);
        let entry = fused.entry(hit.path.clone()).or_insert(SearchHit {
            path: hit.path,
            title: String::new(),
            score: 0.0,
            snippet: None,
        });
        entry.score += contribution;
        if entry.title.is_empty() {
            entry.title = hit.title;
        }
    }

    let mut hits: Vec<SearchHit> = fused.into_values().collect();
    sort_hits(&mut hits);
    hits.truncate(limit);
    hits
}

fn rrf(zero_based_rank: usize) -> f64 {
    1.0 / (RRF_K + (zero_based_rank + 1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteRecord;
    use crate::vector::testing::axis;

    fn hit(path: &str, title: &str, snippet: Option<&str>) -> SearchHit {
        SearchHit {
            path: path.into(),
            title: title.into(),
            score: 0.0,
            snippet: snippet.map(String::from),
        }
    }

    #[test]
    fn test_lexical_only_hit_scores_first_rank() {
        let store = IndexStore::open_in_memory().unwrap();
        store
            .upsert_note(&NoteRecord {
                path: "lexical.md".into(),
                title: "Lexical".into(),
                body: "only findable by its words: quasar".into(),
                mod_time: 1,
                ..Default::default()
            })
            .unwrap();

        let hits = store.search_hybrid("quasar", &axis(0), 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "lexical.md");
        assert!((hits[0].score - 1.0 / 61.0).abs() < 1e-12);
        assert!(hits[0].snippet.as_deref().unwrap().contains("«quasar»"));
    }

    #[test]
    fn test_note_in_both_pools_sums_contributions() {
        let store = IndexStore::open_in_memory().unwrap();
        store
            .upsert_note(&NoteRecord {
                path: "both.md".into(),
                title: "Both".into(),
                body: "nebula".into(),
                mod_time: 1,
                embedding: Some(axis(0)),
                ..Default::default()
            })
            .unwrap();
        store
            .upsert_note(&NoteRecord {
                path: "vector.md".into(),
                title: "Vector".into(),
                body: "unrelated words".into(),
                mod_time: 1,
                embedding: Some(axis(0)),
                ..Default::default()
            })
            .unwrap();

        let hits = store.search_hybrid("nebula", &axis(0), 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].path, "both.md");
        assert!((hits[0].score - 2.0 / 61.0).abs() < 1e-12);
        assert_eq!(hits[1].path, "vector.md");
        assert!((hits[1].score - 1.0 / 62.0).abs() < 1e-12);
        assert_eq!(hits[1].title, "Vector");
        assert!(hits[1].snippet.is_none());
    }

    #[test]
    fn test_fuse_title_and_snippet_sources() {
        let lexical = vec![hit("a.md", "", Some("«a»")), hit("b.md", "B lexical", Some("«b»"))];
        let semantic = vec![hit("b.md", "B semantic", None), hit("a.md", "A semantic", None)];

        let hits = fuse(lexical, semantic, 10);
        // Equal fused scores fall back to path order
        assert_eq!(hits[0].path, "a.md");
        assert_eq!(hits[0].title, "A semantic");
        assert_eq!(hits[0].snippet.as_deref(), Some("«a»"));
        assert_eq!(hits[1].title, "B lexical");
        assert_eq!(hits[0].score, hits[1].score);
    }

    #[test]
    fn test_fuse_truncates_to_limit() {
        let lexical = (0..6).map(|i| hit(&format!("{i}.md"), "t", None)).collect();
        let hits = fuse(lexical, Vec::new(), 3);
        let paths: Vec<&str> = hits.iter().map(|h| h.path.as_str()).collect();
        assert_eq!(paths, vec!["0.md", "1.md", "2.md"]);
    }
}
