//! Incremental indexer: reconcile the index with the current vault
//!
//! Notes whose stored mod_time is at least the source mod_time are skipped.
//! Changed notes are parsed, embedded in batches (when a key is configured)
//! and upserted; indexed paths that vanished from the vault are deleted.

use serde::Serialize;
use std::collections::HashSet;

use crate::config::defaults::{EMBED_BATCH_SIZE, EMBED_BODY_BUDGET};
use crate::db::IndexStore;
use crate::embeddings::EmbeddingProvider;
use crate::error::IndexError;
use crate::models::NoteRecord;
use crate::notes::NoteSource;

/// Counters reported by one indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub notes_indexed: usize,
    pub notes_skipped: usize,
    pub notes_removed: usize,
    pub total_notes: usize,
    pub errors: usize,
    pub embeddings_available: bool,
}

/// Text sent to the embedding API for a note: the non-empty parts joined by
/// newlines, with the body capped at [`EMBED_BODY_BUDGET`] characters.
pub fn build_search_text(title: &str, tags: &str, headings: &str, body: &str) -> String {
    let body = match body.char_indices().nth(EMBED_BODY_BUDGET) {
        Some((cut, _)) => &body[..cut],
        None => body,
    };
    [title, tags, headings, body]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn search_text(note: &NoteRecord) -> String {
    build_search_text(
        &note.title,
        &note.tags_text(),
        &note.headings_text(),
        &note.body,
    )
}

/// Bring the index in line with `source`.
///
/// Listing failures and store failures abort the run. Unreadable notes and
/// failed embedding batches are counted in `errors` and the run continues.
pub fn run_index(
    store: &IndexStore,
    source: &dyn NoteSource,
    provider: &dyn EmbeddingProvider,
) -> Result<IndexStats, IndexError> {
    let mut stats = IndexStats {
        embeddings_available: provider.is_available(),
        ..Default::default()
    };
    if !stats.embeddings_available {
        log::warn!("[INDEX] Gemini API key not configured, indexing without embeddings");
    }

    let listing = source.list_notes()?;
    let indexed = store.all_paths()?;
    let mut pending: Vec<NoteRecord> = Vec::new();

    for info in &listing {
        // get_mod_time reads 0 for unindexed paths, which would hide notes
        // whose own mod_time is 0 or earlier
        if indexed.contains(&info.path) && store.get_mod_time(&info.path)? >= info.mod_time {
            stats.notes_skipped += 1;
            continue;
        }

        let parsed = match source.read_note(&info.path) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("[INDEX] Error reading {}: {}", info.path, e);
                stats.errors += 1;
                continue;
            }
        };

        pending.push(NoteRecord {
            path: info.path.clone(),
            title: parsed.title_or(&info.name),
            tags: parsed.frontmatter.tags.clone(),
            headings: parsed.heading_texts(),
            wikilinks: parsed.wikilinks,
            body: parsed.body,
            mod_time: info.mod_time,
            embedding: None,
        });
    }

    if stats.embeddings_available && !pending.is_empty() {
        log::info!("[INDEX] Generating embeddings for {} notes", pending.len());
        stats.errors += embed_pending(provider, &mut pending);
    }

    for note in &pending {
        store.upsert_note(note)?;
        stats.notes_indexed += 1;
    }

    let present: HashSet<&str> = listing.iter().map(|n| n.path.as_str()).collect();
    let mut stale: Vec<String> = indexed
        .into_iter()
        .filter(|p| !present.contains(p.as_str()))
        .collect();
    stale.sort();
    for path in stale {
        if store.delete_note(&path)? {
            log::debug!("[INDEX] Removed {}", path);
            stats.notes_removed += 1;
        }
    }

    stats.total_notes = store.note_count()?;
    log::info!(
        "[INDEX] Index updated: {} indexed, {} skipped, {} removed ({} total, {} errors)",
        stats.notes_indexed,
        stats.notes_skipped,
        stats.notes_removed,
        stats.total_notes,
        stats.errors
    );
    Ok(stats)
}

/// Embed `pending` in chunks, attaching vectors in place. Returns the number
/// of notes whose chunk failed; those keep `embedding: None`.
fn embed_pending(provider: &dyn EmbeddingProvider, pending: &mut [NoteRecord]) -> usize {
    let mut failed = 0;
    for chunk in pending.chunks_mut(EMBED_BATCH_SIZE) {
        let texts: Vec<String> = chunk.iter().map(search_text).collect();
        match provider.embed_batch(&texts) {
            Ok(vectors) if vectors.len() == chunk.len() => {
                for (note, vector) in chunk.iter_mut().zip(vectors) {
                    note.embedding = Some(vector);
                }
            }
            Ok(vectors) => {
                log::warn!(
                    "[EMBED] Batch returned {} vectors for {} notes",
                    vectors.len(),
                    chunk.len()
                );
                failed += chunk.len();
            }
            Err(e) => {
                log::warn!("[EMBED] Embedding batch error: {}", e);
                failed += chunk.len();
            }
        }
    }
    failed
}
