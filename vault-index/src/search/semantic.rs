//! Vector search: linear cosine scan over stored embeddings

use crate::db::IndexStore;
use crate::error::StoreError;
use crate::models::{sort_hits, SearchHit};
use crate::vector::{cosine_similarity, decode_embedding};

impl IndexStore {
    /// Rank embedded notes by cosine similarity to `query_vec`. Notes with a
    /// similarity of 0 or below are dropped.
    pub fn search_semantic(
        &self,
        query_vec: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT path, title, embedding FROM notes WHERE embedding IS NOT NULL")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })?;

        let mut hits = Vec::new();
        for row in rows {
            let (path, title, blob) = row?;
            let Some(embedding) = decode_embedding(&blob) else {
                continue;
            };
            let score = cosine_similarity(query_vec, &embedding);
            if score > 0.0 {
                hits.push(SearchHit {
                    path,
                    title,
                    score: score as f64,
                    snippet: None,
                });
            }
        }

        sort_hits(&mut hits);
        hits.truncate(limit);
        Ok(hits)
    }
}
