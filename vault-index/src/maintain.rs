//! Vault health check: stale, empty, oversized and unstructured notes,
//! broken wikilinks, index coverage, and a 0-100 health score.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::db::IndexStore;
use crate::error::IndexError;
use crate::notes::file_ops::note_name;
use crate::notes::frontmatter::{parse_note, starts_with_frontmatter};
use crate::notes::NoteSource;

/// Notes above this many bytes are reported as large
pub const LARGE_NOTE_BYTES: u64 = 10 * 1024;

const EMPTY_FRONTMATTER: &str = "---\n---\n";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VaultStats {
    pub total_notes: usize,
    pub indexed_notes: usize,
    pub with_embeddings: usize,
    pub avg_size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleNote {
    pub path: String,
    pub last_modified: String,
    pub days_ago: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenLink {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LargeNote {
    pub path: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MaintainReport {
    pub stats: VaultStats,
    pub stale_notes: Vec<StaleNote>,
    pub broken_links: Vec<BrokenLink>,
    pub empty_notes: Vec<String>,
    pub large_notes: Vec<LargeNote>,
    pub no_frontmatter: Vec<String>,
    pub health_score: u32,
    pub fixed: usize,
}

/// Inspect every note in `source`. Index counts come from `store` when one
/// is given; unreadable notes are logged and left out of the content checks.
pub fn check_vault(
    source: &dyn NoteSource,
    store: Option<&IndexStore>,
    stale_days: i64,
    now: DateTime<Utc>,
) -> Result<MaintainReport, IndexError> {
    let notes = source.list_notes()?;
    let mut report = MaintainReport::default();
    report.stats.total_notes = notes.len();

    if let Some(store) = store {
        report.stats.indexed_notes = store.note_count()?;
        report.stats.with_embeddings = store.embedding_count()?;
    }

    // Link targets resolve by bare name or by vault-relative path
    let mut known: HashSet<String> = HashSet::new();
    for note in &notes {
        known.insert(note_name(&note.path).to_lowercase());
        let without_ext = note.path.strip_suffix(".md").unwrap_or(&note.path);
        known.insert(without_ext.to_lowercase());
    }

    let mut total_size = 0u64;
    for info in &notes {
        total_size += info.size;

        let content = match source.read_raw(&info.path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("[MAINTAIN] Skipping {}: {}", info.path, e);
                continue;
            }
        };

        let days_ago = (now.timestamp() - info.mod_time).div_euclid(86_400);
        if days_ago >= stale_days {
            report.stale_notes.push(StaleNote {
                path: info.path.clone(),
                last_modified: DateTime::from_timestamp(info.mod_time, 0)
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                days_ago,
            });
        }

        let parsed = parse_note(&content);
        for link in &parsed.wikilinks {
            let target = link.split('#').next().unwrap_or_default().trim();
            if !target.is_empty() && !known.contains(&target.to_lowercase()) {
                report.broken_links.push(BrokenLink {
                    source: info.path.clone(),
                    target: link.clone(),
                });
            }
        }

        if parsed.body.trim().is_empty() {
            report.empty_notes.push(info.path.clone());
        }
        if info.size > LARGE_NOTE_BYTES {
            report.large_notes.push(LargeNote {
                path: info.path.clone(),
                size_bytes: info.size,
            });
        }
        if !starts_with_frontmatter(&content) {
            report.no_frontmatter.push(info.path.clone());
        }
    }

    if !notes.is_empty() {
        report.stats.avg_size_bytes = total_size / notes.len() as u64;
    }
    report.health_score = health_score(&report);

    log::info!(
        "[MAINTAIN] {} notes checked, health score {}",
        report.stats.total_notes,
        report.health_score
    );
    Ok(report)
}

/// Start at 100 and deduct per issue:
/// stale -1 (max 20), broken link -2 (max 20), empty -5, no frontmatter -3,
/// and the index coverage shortfall in whole percent. Never below 0.
pub fn health_score(report: &MaintainReport) -> u32 {
    let mut score: i64 = 100;
    score -= report.stale_notes.len().min(20) as i64;
    score -= (report.broken_links.len() * 2).min(20) as i64;
    score -= report.empty_notes.len() as i64 * 5;
    score -= report.no_frontmatter.len() as i64 * 3;

    let stats = &report.stats;
    if stats.total_notes > 0 && stats.indexed_notes > 0 {
        let coverage = stats.indexed_notes as f64 / stats.total_notes as f64 * 100.0;
        score -= (100.0 - coverage).max(0.0) as i64;
    }
    score.clamp(0, 100) as u32
}

/// Prepend an empty frontmatter block to each note. Best effort: failures
/// are logged and skipped. Returns the number of notes fixed.
pub fn fix_missing_frontmatter(source: &dyn NoteSource, paths: &[String]) -> usize {
    let mut fixed = 0;
    for path in paths {
        let result = source
            .read_raw(path)
            .and_then(|content| source.write_raw(path, &format!("{}{}", EMPTY_FRONTMATTER, content)));
        match result {
            Ok(()) => fixed += 1,
            Err(e) => log::warn!("[MAINTAIN] Could not add frontmatter to {}: {}", path, e),
        }
    }
    fixed
}
