//! Note record operations (upsert, delete, lookups, counts)

use rusqlite::{params, OptionalExtension, Row};
use std::collections::HashSet;

use crate::db::IndexStore;
use crate::error::StoreError;
use crate::models::{decode_list, encode_list, split_stored, NoteRecord, HEADING_SEPARATOR};
use crate::vector::{decode_embedding, encode_embedding, EMBEDDING_DIMENSIONS};

const NOTE_COLUMNS: &str = "path, title, tags, headings, wikilinks, body, mod_time, embedding";

impl IndexStore {
    /// Insert or replace a note by path. The primary row and its FTS row
    /// are written in one transaction.
    pub fn upsert_note(&self, note: &NoteRecord) -> Result<(), StoreError> {
        if let Some(embedding) = &note.embedding {
            if embedding.len() != EMBEDDING_DIMENSIONS {
                return Err(StoreError::EmbeddingDimension {
                    path: note.path.clone(),
                    got: embedding.len(),
                    want: EMBEDDING_DIMENSIONS,
                });
            }
        }
        let blob = note.embedding.as_deref().map(encode_embedding);
        let tags_text = note.tags_text();
        let headings = note.headings_text();

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO notes (path, title, tags, headings, wikilinks, body, mod_time, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(path) DO UPDATE SET
                title     = excluded.title,
                tags      = excluded.tags,
                headings  = excluded.headings,
                wikilinks = excluded.wikilinks,
                body      = excluded.body,
                mod_time  = excluded.mod_time,
                embedding = excluded.embedding",
            params![
                note.path,
                note.title,
                encode_list(&note.tags),
                headings,
                encode_list(&note.wikilinks),
                note.body,
                note.mod_time,
                blob,
            ],
        )?;
        // The FTS row shares the rowid of its notes row
        let rowid: i64 = tx.query_row(
            "SELECT rowid FROM notes WHERE path = ?1",
            params![note.path],
            |row| row.get(0),
        )?;
        tx.execute("DELETE FROM notes_fts WHERE rowid = ?1", params![rowid])?;
        tx.execute(
            "INSERT INTO notes_fts (rowid, path, title, tags, headings, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![rowid, note.path, note.title, tags_text, headings, note.body],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Remove a note and its FTS row. Absent paths are a no-op; returns
    /// whether a note was removed.
    pub fn delete_note(&self, path: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let rowid: Option<i64> = tx
            .query_row(
                "SELECT rowid FROM notes WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(rowid) = rowid {
            tx.execute("DELETE FROM notes WHERE rowid = ?1", params![rowid])?;
            tx.execute("DELETE FROM notes_fts WHERE rowid = ?1", params![rowid])?;
        }
        tx.commit()?;
        Ok(rowid.is_some())
    }

    /// Stored mod_time for a path, or 0 if it is not indexed
    pub fn get_mod_time(&self, path: &str) -> Result<i64, StoreError> {
        let conn = self.conn()?;
        let mod_time = conn
            .query_row(
                "SELECT mod_time FROM notes WHERE path = ?1",
                params![path],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(mod_time.unwrap_or(0))
    }

    /// Full record for a path
    pub fn get_note(&self, path: &str) -> Result<Option<NoteRecord>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM notes WHERE path = ?1", NOTE_COLUMNS);
        let note = conn
            .query_row(&sql, params![path], row_to_note)
            .optional()?;
        Ok(note)
    }

    /// All indexed note paths
    pub fn all_paths(&self) -> Result<HashSet<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT path FROM notes")?;
        let paths = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(paths)
    }

    /// Every indexed note, ordered by path
    pub fn all_notes(&self) -> Result<Vec<NoteRecord>, StoreError> {
        self.load_notes(false)
    }

    /// Notes that carry a (well-formed) embedding, ordered by path
    pub fn embedded_notes(&self) -> Result<Vec<NoteRecord>, StoreError> {
        let notes = self.load_notes(true)?;
        Ok(notes.into_iter().filter(NoteRecord::has_embedding).collect())
    }

    fn load_notes(&self, embedded_only: bool) -> Result<Vec<NoteRecord>, StoreError> {
        let conn = self.conn()?;
        let filter = if embedded_only {
            "WHERE embedding IS NOT NULL"
        } else {
            ""
        };
        let sql = format!("SELECT {} FROM notes {} ORDER BY path", NOTE_COLUMNS, filter);
        let mut stmt = conn.prepare(&sql)?;
        let notes = stmt
            .query_map([], row_to_note)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    /// Total number of indexed notes
    pub fn note_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Number of notes with a stored embedding
    pub fn embedding_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE embedding IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn row_to_note(row: &Row) -> rusqlite::Result<NoteRecord> {
    let tags: String = row.get(2)?;
    let headings: String = row.get(3)?;
    let wikilinks: String = row.get(4)?;
    let blob: Option<Vec<u8>> = row.get(7)?;

    Ok(NoteRecord {
        path: row.get(0)?,
        title: row.get(1)?,
        tags: decode_list(&tags),
        headings: split_stored(&headings, HEADING_SEPARATOR),
        wikilinks: decode_list(&wikilinks),
        body: row.get(5)?,
        mod_time: row.get(6)?,
        embedding: blob.as_deref().and_then(decode_embedding),
    })
}
