//! Similarity analysis over indexed notes: link suggestions, consensus tag
//! suggestions and orphan detection, plus writing accepted links back.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::db::IndexStore;
use crate::error::StoreError;
use crate::models::NoteRecord;
use crate::notes::file_ops::note_name;
use crate::notes::NoteSource;
use crate::vector::cosine_similarity;

/// Minimum cosine similarity for two notes to count as related
pub const SIMILARITY_THRESHOLD: f32 = 0.70;
pub const MAX_SUGGESTIONS_PER_NOTE: usize = 5;
/// A tag must appear on at least this many similar notes to be suggested
pub const TAG_CONSENSUS_MIN: usize = 2;

const RELATED_SECTION: &str = "## Related Notes";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkSuggestion {
    pub from: String,
    pub to: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagSuggestion {
    pub note: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichSummary {
    pub links_found: usize,
    pub tags_found: usize,
    pub orphans_found: usize,
    pub applied: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichReport {
    pub link_suggestions: Vec<LinkSuggestion>,
    pub tag_suggestions: Vec<TagSuggestion>,
    pub orphan_notes: Vec<String>,
    pub summary: EnrichSummary,
}

/// Lowercased link target with any `#fragment` removed
fn link_key(link: &str) -> String {
    let target = match link.find('#') {
        Some(idx) => &link[..idx],
        None => link,
    };
    target.trim().to_lowercase()
}

/// Suggest links between similar notes that do not already reference each
/// other. Notes without an embedding are ignored.
pub fn find_link_suggestions(notes: &[NoteRecord]) -> Vec<LinkSuggestion> {
    let embedded: Vec<(&NoteRecord, &[f32])> = notes
        .iter()
        .filter_map(|n| n.embedding.as_deref().map(|e| (n, e)))
        .collect();

    let existing: Vec<HashSet<String>> = embedded
        .iter()
        .map(|(n, _)| n.wikilinks.iter().map(|l| link_key(l)).collect())
        .collect();
    let names: Vec<String> = embedded
        .iter()
        .map(|(n, _)| note_name(&n.path).to_lowercase())
        .collect();

    let mut counts = vec![0usize; embedded.len()];
    let mut suggestions = Vec::new();

    for i in 0..embedded.len() {
        for j in (i + 1)..embedded.len() {
            if counts[i] >= MAX_SUGGESTIONS_PER_NOTE && counts[j] >= MAX_SUGGESTIONS_PER_NOTE {
                continue;
            }

            let similarity = cosine_similarity(embedded[i].1, embedded[j].1);
            if similarity < SIMILARITY_THRESHOLD {
                continue;
            }
            if existing[i].contains(&names[j]) || existing[j].contains(&names[i]) {
                continue;
            }

            suggestions.push(LinkSuggestion {
                from: embedded[i].0.path.clone(),
                to: embedded[j].0.path.clone(),
                similarity: similarity as f64,
            });
            counts[i] += 1;
            counts[j] += 1;
        }
    }

    suggestions.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.from.cmp(&b.from))
            .then_with(|| a.to.cmp(&b.to))
    });
    suggestions
}

/// Suggest tags carried by at least [`TAG_CONSENSUS_MIN`] similar notes and
/// missing from the note itself. Tags are lowercased and sorted.
pub fn find_tag_suggestions(notes: &[NoteRecord]) -> Vec<TagSuggestion> {
    let mut suggestions = Vec::new();

    for (i, note) in notes.iter().enumerate() {
        let Some(embedding) = note.embedding.as_deref() else {
            continue;
        };
        let own: HashSet<String> = note.tags.iter().map(|t| t.trim().to_lowercase()).collect();

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for (j, other) in notes.iter().enumerate() {
            if i == j || other.tags.is_empty() {
                continue;
            }
            let Some(other_embedding) = other.embedding.as_deref() else {
                continue;
            };
            if cosine_similarity(embedding, other_embedding) < SIMILARITY_THRESHOLD {
                continue;
            }

            let candidates: HashSet<String> = other
                .tags
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty() && !own.contains(t))
                .collect();
            for tag in candidates {
                *counts.entry(tag).or_insert(0) += 1;
            }
        }

        let tags: Vec<String> = counts
            .into_iter()
            .filter(|(_, count)| *count >= TAG_CONSENSUS_MIN)
            .map(|(tag, _)| tag)
            .collect();
        if !tags.is_empty() {
            suggestions.push(TagSuggestion {
                note: note.path.clone(),
                tags,
            });
        }
    }
    suggestions
}

/// Notes that no other note links to, by filename-derived name or title
pub fn find_orphans(notes: &[NoteRecord]) -> Vec<String> {
    // link target -> paths of the notes that reference it
    let mut incoming: HashMap<String, HashSet<&str>> = HashMap::new();
    for note in notes {
        for link in &note.wikilinks {
            let key = link_key(link);
            if !key.is_empty() {
                incoming.entry(key).or_default().insert(note.path.as_str());
            }
        }
    }

    let linked_from_elsewhere = |key: &str, path: &str| {
        incoming
            .get(key)
            .is_some_and(|sources| sources.iter().any(|s| *s != path))
    };

    notes
        .iter()
        .filter(|note| {
            let name = note_name(&note.path).to_lowercase();
            let title = note.title.trim().to_lowercase();
            let by_name = linked_from_elsewhere(&name, &note.path);
            let by_title = !title.is_empty() && linked_from_elsewhere(&title, &note.path);
            !by_name && !by_title
        })
        .map(|note| note.path.clone())
        .collect()
}

/// Run all three passes over the indexed notes
pub fn analyze(store: &IndexStore) -> Result<EnrichReport, StoreError> {
    let notes = store.all_notes()?;
    let embedded = notes.iter().filter(|n| n.has_embedding()).count();
    log::info!(
        "[ENRICH] Analyzing {} notes ({} with embeddings)",
        notes.len(),
        embedded
    );

    let link_suggestions = find_link_suggestions(&notes);
    let tag_suggestions = find_tag_suggestions(&notes);
    let orphan_notes = find_orphans(&notes);

    let summary = EnrichSummary {
        links_found: link_suggestions.len(),
        tags_found: tag_suggestions.len(),
        orphans_found: orphan_notes.len(),
        applied: 0,
    };
    Ok(EnrichReport {
        link_suggestions,
        tag_suggestions,
        orphan_notes,
        summary,
    })
}

/// Append `- [[name]]` lines for each suggestion to both endpoints, under a
/// `## Related Notes` section. Links already present are not repeated.
/// Notes that cannot be read or written are logged and skipped. Returns the
/// number of notes written.
pub fn apply_link_suggestions(source: &dyn NoteSource, suggestions: &[LinkSuggestion]) -> usize {
    let mut by_note: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for s in suggestions {
        by_note.entry(s.from.as_str()).or_default().push(note_name(&s.to));
        by_note.entry(s.to.as_str()).or_default().push(note_name(&s.from));
    }

    let mut applied = 0;
    for (path, names) in by_note {
        let content = match source.read_raw(path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("[ENRICH] Skipping {}: {}", path, e);
                continue;
            }
        };

        let mut seen = HashSet::new();
        let lines: Vec<String> = names
            .into_iter()
            .filter(|name| seen.insert(*name))
            .filter(|name| !content.contains(&format!("[[{}]]", name)))
            .map(|name| format!("- [[{}]]", name))
            .collect();
        if lines.is_empty() {
            continue;
        }

        let content = insert_related_links(&content, &lines);

        match source.write_raw(path, &content) {
            Ok(()) => {
                log::debug!("[ENRICH] Added {} links to {}", lines.len(), path);
                applied += 1;
            }
            Err(e) => log::warn!("[ENRICH] Failed to update {}: {}", path, e),
        }
    }
    applied
}

/// Put `lines` at the end of the existing `## Related Notes` section, or
/// start that section at the end of the note.
fn insert_related_links(content: &str, lines: &[String]) -> String {
    let block = lines.join("\n");

    let mut offset = 0;
    let mut section_end: Option<usize> = None;
    let mut in_section = false;
    for line in content.split_inclusive('\n') {
        let end = offset + line.len();
        let trimmed = line.trim();
        if in_section {
            if is_section_break(trimmed) {
                break;
            }
            if !trimmed.is_empty() {
                section_end = Some(end);
            }
        } else if trimmed == RELATED_SECTION {
            in_section = true;
            section_end = Some(end);
        }
        offset = end;
    }

    let mut out = String::with_capacity(content.len() + block.len() + RELATED_SECTION.len() + 4);
    match section_end {
        Some(at) => {
            let (head, tail) = content.split_at(at);
            out.push_str(head);
            if !head.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&block);
            out.push('\n');
            out.push_str(tail);
        }
        None => {
            out.push_str(content);
            if !content.is_empty() && !content.ends_with('\n') {
                out.push('\n');
            }
            out.push('\n');
            out.push_str(RELATED_SECTION);
            out.push('\n');
            out.push_str(&block);
            out.push('\n');
        }
    }
    out
}

/// A level 1 or 2 heading ends the section; deeper headings belong to it
fn is_section_break(line: &str) -> bool {
    let level = line.chars().take_while(|c| *c == '#').count();
    (1..=2).contains(&level) && line[level..].starts_with(' ')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::source::testing::MemorySource;
    use crate::vector::testing::{axis, vector};

    fn note(path: &str, embedding: Option<Vec<f32>>) -> NoteRecord {
        NoteRecord {
            path: path.into(),
            title: note_name(path).to_string(),
            embedding,
            ..Default::default()
        }
    }

    fn with_links(mut n: NoteRecord, links: &[&str]) -> NoteRecord {
        n.wikilinks = links.iter().map(|l| l.to_string()).collect();
        n
    }

    fn with_tags(mut n: NoteRecord, tags: &[&str]) -> NoteRecord {
        n.tags = tags.iter().map(|t| t.to_string()).collect();
        n
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        // |b| = 10 exactly, so cos(a, b) is exactly 7/10
        let at = vector(&[(0, 7.0), (1, 7.0), (2, 1.0), (3, 1.0)]);
        assert_eq!(cosine_similarity(&axis(0), &at), SIMILARITY_THRESHOLD);

        let notes = vec![note("a.md", Some(axis(0))), note("b.md", Some(at))];
        let suggestions = find_link_suggestions(&notes);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].from, "a.md");
        assert_eq!(suggestions[0].to, "b.md");

        let below = vector(&[(0, 699.0), (1, (1000.0f32 * 1000.0 - 699.0 * 699.0).sqrt())]);
        assert!(cosine_similarity(&axis(0), &below) < SIMILARITY_THRESHOLD);
        let notes = vec![note("a.md", Some(axis(0))), note("c.md", Some(below))];
        assert!(find_link_suggestions(&notes).is_empty());
    }

    #[test]
    fn test_existing_links_suppress_suggestion() {
        let notes = vec![
            with_links(note("dir/Alpha.md", Some(axis(0))), &["beta#Setup"]),
            note("Beta.md", Some(axis(0))),
            note("gamma.md", Some(axis(0))),
        ];
        let pairs: Vec<(String, String)> = find_link_suggestions(&notes)
            .into_iter()
            .map(|s| (s.from, s.to))
            .collect();
        assert_eq!(pairs.len(), 2);
        assert!(!pairs.contains(&("Beta.md".to_string(), "dir/Alpha.md".to_string())));
        assert!(!pairs.contains(&("dir/Alpha.md".to_string(), "Beta.md".to_string())));
    }

    #[test]
    fn test_per_note_cap() {
        let notes: Vec<NoteRecord> = (0..7)
            .map(|i| note(&format!("n{}.md", i), Some(axis(0))))
            .collect();
        let suggestions = find_link_suggestions(&notes);

        // Every pair qualifies; only (n5, n6) is skipped, once both are at the cap
        assert_eq!(suggestions.len(), 20);
        assert!(!suggestions.iter().any(|s| s.from == "n5.md" && s.to == "n6.md"));
        // Equal similarity: ordered by (from, to)
        assert_eq!(suggestions[0].from, "n0.md");
        assert_eq!(suggestions[0].to, "n1.md");
    }

    #[test]
    fn test_suggestions_sorted_by_similarity() {
        let notes = vec![
            note("a.md", Some(axis(0))),
            note("b.md", Some(vector(&[(0, 8.0), (1, 6.0)]))),
            note("c.md", Some(axis(0))),
            note("skip.md", None),
        ];
        let s = find_link_suggestions(&notes);
        assert_eq!(s.len(), 3);
        assert_eq!((s[0].from.as_str(), s[0].to.as_str()), ("a.md", "c.md"));
        assert!(s[1].similarity <= s[0].similarity);
        assert!(s.iter().all(|x| x.from != "skip.md" && x.to != "skip.md"));
    }

    #[test]
    fn test_tag_consensus() {
        let notes = vec![
            note("target.md", Some(axis(0))),
            with_tags(note("y.md", Some(axis(0))), &["Rust", "db"]),
            with_tags(note("z.md", Some(axis(0))), &["rust", "cli"]),
            with_tags(note("far.md", Some(axis(1))), &["cli", "db"]),
        ];
        let suggestions = find_tag_suggestions(&notes);

        let target = suggestions.iter().find(|s| s.note == "target.md").unwrap();
        assert_eq!(target.tags, vec!["rust"]);
        // y already has rust; db and cli each appear on one neighbour only
        assert!(suggestions.iter().all(|s| s.note != "y.md"));
    }

    #[test]
    fn test_tag_suggestions_sorted_alphabetically() {
        let notes = vec![
            note("t.md", Some(axis(0))),
            with_tags(note("a.md", Some(axis(0))), &["zeta", "alpha"]),
            with_tags(note("b.md", Some(axis(0))), &["alpha", "zeta"]),
        ];
        let suggestions = find_tag_suggestions(&notes);
        let t = suggestions.iter().find(|s| s.note == "t.md").unwrap();
        assert_eq!(t.tags, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_fragment_reference_is_not_orphan() {
        let mut foo = note("Foo.md", None);
        foo.title = "Foo".into();
        let notes = vec![
            foo,
            with_links(note("bar.md", None), &["foo#Intro"]),
            with_links(note("self.md", None), &["self"]),
            with_links(note("titled.md", None), &["Bar"]),
        ];
        let orphans = find_orphans(&notes);
        // self.md only links to itself
        assert_eq!(orphans, vec!["self.md", "titled.md"]);
    }

    #[test]
    fn test_orphan_by_title() {
        let mut a = note("2024-01-01.md", None);
        a.title = "New Year".into();
        let notes = vec![a, with_links(note("b.md", None), &["new year"])];
        assert_eq!(find_orphans(&notes), vec!["b.md"]);
    }

    #[test]
    fn test_analyze_reads_store() {
        let store = IndexStore::open_in_memory().unwrap();
        store.upsert_note(&note("a.md", Some(axis(0)))).unwrap();
        store.upsert_note(&note("b.md", Some(axis(0)))).unwrap();
        store.upsert_note(&with_links(note("c.md", None), &["a"])).unwrap();

        let report = analyze(&store).unwrap();
        assert_eq!(report.summary.links_found, 1);
        assert_eq!(report.orphan_notes, vec!["b.md", "c.md"]);
        assert_eq!(report.summary.orphans_found, 2);
        assert_eq!(report.summary.applied, 0);
    }

    #[test]
    fn test_comma_link_survives_the_store() {
        let store = IndexStore::open_in_memory().unwrap();
        store.upsert_note(&note("Smith, John.md", Some(axis(0)))).unwrap();
        store
            .upsert_note(&with_links(note("b.md", Some(axis(0))), &["Smith, John"]))
            .unwrap();

        let report = analyze(&store).unwrap();
        assert!(report.link_suggestions.is_empty());
        assert_eq!(report.orphan_notes, vec!["b.md"]);
    }

    #[test]
    fn test_apply_appends_related_section() {
        let source = MemorySource::new();
        source.put("a.md", 1, "# A\nbody");
        source.put("b.md", 1, "# B\n\n## Related Notes\n- [[a]]\n");
        source.put("c.md", 1, "# C\n");

        let suggestions = vec![
            LinkSuggestion {
                from: "a.md".into(),
                to: "b.md".into(),
                similarity: 0.9,
            },
            LinkSuggestion {
                from: "a.md".into(),
                to: "c.md".into(),
                similarity: 0.8,
            },
        ];
        let applied = apply_link_suggestions(&source, &suggestions);

        // b.md already links to a
        assert_eq!(applied, 2);
        assert_eq!(
            source.content("a.md"),
            "# A\nbody\n\n## Related Notes\n- [[b]]\n- [[c]]\n"
        );
        assert_eq!(source.content("b.md"), "# B\n\n## Related Notes\n- [[a]]\n");
        assert_eq!(source.content("c.md"), "# C\n\n## Related Notes\n- [[a]]\n");

        // Applying again changes nothing
        assert_eq!(apply_link_suggestions(&source, &suggestions), 0);
    }

    #[test]
    fn test_apply_extends_section_in_the_middle() {
        let source = MemorySource::new();
        source.put(
            "a.md",
            1,
            "# A\n\n## Related Notes\n- [[x]]\n### Context\n- [[y]]\n\n## Later\ntext\n",
        );
        source.put("b.md", 1, "# B\n## Related Notes");

        let suggestions = vec![LinkSuggestion {
            from: "a.md".into(),
            to: "b.md".into(),
            similarity: 0.9,
        }];
        assert_eq!(apply_link_suggestions(&source, &suggestions), 2);
        assert_eq!(
            source.content("a.md"),
            "# A\n\n## Related Notes\n- [[x]]\n### Context\n- [[y]]\n- [[b]]\n\n## Later\ntext\n"
        );
        assert_eq!(source.content("b.md"), "# B\n## Related Notes\n- [[a]]\n");
    }

    #[test]
    fn test_apply_skips_failures() {
        let source = MemorySource::new();
        source.put("a.md", 1, "# A\n");
        source.put("locked.md", 1, "# Locked\n");
        source.read_only.borrow_mut().insert("locked.md".to_string());

        let suggestions = vec![
            LinkSuggestion {
                from: "a.md".into(),
                to: "locked.md".into(),
                similarity: 0.9,
            },
            LinkSuggestion {
                from: "a.md".into(),
                to: "missing.md".into(),
                similarity: 0.8,
            },
        ];
        assert_eq!(apply_link_suggestions(&source, &suggestions), 1);
        assert!(source.content("a.md").contains("- [[locked]]\n- [[missing]]"));
        assert_eq!(source.content("locked.md"), "# Locked\n");
    }
}
