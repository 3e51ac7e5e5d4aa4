//! File operations for vault notes
//!
//! Handles listing, reading and rewriting markdown note files.
//! All paths handed out are relative to the vault root with `/` separators.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use walkdir::{DirEntry, WalkDir};

use crate::error::SourceError;

/// Metadata about a note file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteInfo {
    /// Relative path within the vault (e.g. "daily/2026-02-07.md")
    pub path: String,
    /// Filename without extension
    pub name: String,
    /// Unix timestamp (seconds) of last modification
    pub mod_time: i64,
    pub size: u64,
}

/// Filename without directory or `.md` extension ("dir/My Note.md" -> "My Note")
pub fn note_name(path: &str) -> &str {
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    file.strip_suffix(".md").unwrap_or(file)
}

/// Join vault path with note path, adding the `.md` extension if missing
pub fn resolve_path(vault: &Path, note_path: &str) -> PathBuf {
    if note_path.ends_with(".md") {
        vault.join(note_path)
    } else {
        vault.join(format!("{}.md", note_path))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
}

/// List all markdown files in the vault (recursively), skipping hidden
/// files and directories like `.obsidian` and `.git`. Entries that cannot
/// be stat'ed are skipped. Sorted by path.
pub fn list_notes(vault: &Path) -> Result<Vec<NoteInfo>, SourceError> {
    if !vault.is_dir() {
        return Err(SourceError::VaultNotFound(vault.display().to_string()));
    }

    let mut notes = Vec::new();
    for entry in WalkDir::new(vault)
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file()
            || entry.path().extension().map(|e| e != "md").unwrap_or(true)
        {
            continue;
        }
        let Some(rel_path) = relative_path(vault, entry.path()) else {
            continue;
        };
        let Ok(meta) = entry.metadata() else {
            log::debug!("[NOTES] Cannot stat {}, skipping", rel_path);
            continue;
        };
        let mod_time = match meta.modified() {
            Ok(time) => unix_seconds(time),
            Err(e) => {
                log::warn!("[NOTES] No modification time for {}, skipping: {}", rel_path, e);
                continue;
            }
        };

        notes.push(NoteInfo {
            name: note_name(&rel_path).to_string(),
            path: rel_path,
            mod_time,
            size: meta.len(),
        });
    }

    notes.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(notes)
}

/// Whole seconds since the Unix epoch, negative for earlier times
fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

/// Get relative path from the vault root for a file, `/`-separated
pub fn relative_path(vault: &Path, file_path: &Path) -> Option<String> {
    let rel = file_path.strip_prefix(vault).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    Some(parts.join("/"))
}

/// Read a note file
pub fn read_note(vault: &Path, note_path: &str) -> Result<String, SourceError> {
    let full_path = resolve_path(vault, note_path);
    fs::read_to_string(&full_path).map_err(|e| io_error(note_path, e))
}

/// Overwrite an existing note file
pub fn write_note(vault: &Path, note_path: &str, content: &str) -> Result<(), SourceError> {
    let full_path = resolve_path(vault, note_path);
    if !full_path.exists() {
        return Err(SourceError::NoteNotFound(note_path.to_string()));
    }
    fs::write(&full_path, content).map_err(|e| io_error(note_path, e))
}

fn io_error(path: &str, source: io::Error) -> SourceError {
    SourceError::Io {
        path: path.to_string(),
        source,
    }
}
