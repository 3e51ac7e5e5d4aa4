//! Parse note frontmatter, headings and [[wikilinks]].
//!
//! Hand-rolled YAML (no serde_yaml): only the top-level scalar, inline-list
//! and block-list shapes that show up in vault frontmatter are understood.

use regex::Regex;
use std::sync::LazyLock;

/// Parsed note frontmatter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteFrontmatter {
    pub title: Option<String>,
    /// `tags: [a, b]`, a `- item` block list, or a single scalar
    pub tags: Vec<String>,
}

/// A markdown heading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: usize,
    pub text: String,
}

/// A fully parsed note (frontmatter + body)
#[derive(Debug, Clone, Default)]
pub struct ParsedNote {
    pub frontmatter: NoteFrontmatter,
    /// Whether the file opened with a valid `---` block
    pub has_frontmatter: bool,
    pub body: String,
    pub headings: Vec<Heading>,
    /// [[wikilink]] targets, alias stripped, deduplicated in order of appearance
    pub wikilinks: Vec<String>,
}

impl ParsedNote {
    /// Title from frontmatter, else the first level-1 heading, else `fallback`
    pub fn title_or(&self, fallback: &str) -> String {
        if let Some(title) = self.frontmatter.title.as_deref().filter(|t| !t.is_empty()) {
            return title.to_string();
        }
        self.headings
            .iter()
            .find(|h| h.level == 1)
            .map(|h| h.text.clone())
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn heading_texts(&self) -> Vec<String> {
        self.headings.iter().map(|h| h.text.clone()).collect()
    }
}

static WIKILINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]|]+)(?:\|[^\]]+)?\]\]").unwrap());
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").unwrap());

/// Parse a complete note file (frontmatter + body)
pub fn parse_note(content: &str) -> ParsedNote {
    let (frontmatter, body, has_frontmatter) = match split_frontmatter(content) {
        Some((yaml, body)) => (parse_frontmatter(yaml), body.to_string(), true),
        None => (NoteFrontmatter::default(), content.to_string(), false),
    };

    let headings = extract_headings(&body);
    let wikilinks = extract_wikilinks(&body);

    ParsedNote {
        frontmatter,
        has_frontmatter,
        body,
        headings,
        wikilinks,
    }
}

/// Whether raw note content starts with a frontmatter fence
pub fn starts_with_frontmatter(content: &str) -> bool {
    content.starts_with("---\n") || content.starts_with("---\r\n")
}

/// Split content into (frontmatter_yaml, body). `None` when there is no
/// opening fence on the first line or no closing fence.
fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;

    // Frontmatter closed immediately: "---\n---\n"
    if let Some(body) = rest
        .strip_prefix("---\n")
        .or_else(|| rest.strip_prefix("---\r\n"))
    {
        return Some(("", body));
    }
    if rest == "---" {
        return Some(("", ""));
    }

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" && offset > 0 {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }
    None
}

/// Parse YAML frontmatter string into NoteFrontmatter (hand-rolled, no serde_yaml)
fn parse_frontmatter(yaml: &str) -> NoteFrontmatter {
    let mut fm = NoteFrontmatter::default();
    // Key whose value is an indented `- item` block list
    let mut list_key: Option<String> = None;
    let mut list_items: Vec<String> = Vec::new();

    for line in yaml.lines() {
        let trimmed = line.trim();

        if list_key.is_some() {
            if let Some(item) = trimmed.strip_prefix("- ") {
                list_items.push(unquote(item));
                continue;
            }
            flush_list(&mut fm, list_key.take(), std::mem::take(&mut list_items));
        }

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        // Nested keys are not ours
        if line.starts_with(' ') || line.starts_with('\t') {
            continue;
        }

        let Some((key, value)) = trimmed.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        if value.is_empty() {
            list_key = Some(key.to_string());
            continue;
        }

        match key {
            "title" => fm.title = Some(unquote(value)),
            "tags" => {
                fm.tags = if value.starts_with('[') {
                    parse_inline_list(value)
                } else {
                    split_scalar_list(&unquote(value))
                }
            }
            _ => {}
        }
    }

    flush_list(&mut fm, list_key, list_items);
    fm
}

fn flush_list(fm: &mut NoteFrontmatter, key: Option<String>, items: Vec<String>) {
    if key.as_deref() == Some("tags") {
        fm.tags = items.into_iter().filter(|t| !t.is_empty()).collect();
    }
}

/// Extract markdown headings, one per line
pub fn extract_headings(text: &str) -> Vec<Heading> {
    text.lines()
        .filter_map(|line| {
            let cap = HEADING_RE.captures(line)?;
            Some(Heading {
                level: cap[1].len(),
                text: cap[2].trim().to_string(),
            })
        })
        .collect()
}

/// Extract [[wikilinks]] from text; `[[target|alias]]` yields `target`
pub fn extract_wikilinks(text: &str) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for cap in WIKILINK_RE.captures_iter(text) {
        let target = cap[1].trim().to_string();
        if !links.contains(&target) {
            links.push(target);
        }
    }
    links
}

/// Remove surrounding quotes from a string
fn unquote(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// Parse an inline YAML list like [foo, bar, "baz qux"]
fn parse_inline_list(s: &str) -> Vec<String> {
    let s = s.trim();
    let inner = if s.starts_with('[') && s.ends_with(']') {
        &s[1..s.len() - 1]
    } else {
        s
    };

    inner
        .split(',')
        .map(|item| unquote(item.trim()))
        .filter(|item| !item.is_empty())
        .collect()
}

/// A scalar `tags: a, b` value
fn split_scalar_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
