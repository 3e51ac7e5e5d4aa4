use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use serde::Serialize;
use std::path::{Path, PathBuf};

use vault_index::config::{defaults, Config};
use vault_index::enrich::{self, EnrichReport};
use vault_index::error::SourceError;
use vault_index::maintain::{self, MaintainReport};
use vault_index::notes::file_ops::note_name;
use vault_index::notes::VaultSource;
use vault_index::{
    run_index, run_search, GeminiEmbeddingClient, IndexStats, IndexStore, SearchMode, SearchOutcome,
};

#[derive(Parser)]
#[command(name = "vault-index", version, about = "Search and enrich a markdown note vault")]
struct Cli {
    /// Vault directory (default: $OBSIDIAN_VAULT_PATH)
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    /// Print pretty JSON instead of text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build or update the search index
    Index,
    /// Search indexed notes
    Search {
        query: String,
        /// keyword, semantic or hybrid
        #[arg(long, default_value = "hybrid")]
        mode: SearchMode,
        #[arg(long, default_value_t = defaults::SEARCH_LIMIT)]
        limit: usize,
    },
    /// Suggest links and tags from note similarity, and list orphans
    Enrich {
        /// Append suggested links to the notes
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
    /// Report vault health
    Maintain {
        #[arg(long, default_value_t = defaults::STALE_DAYS)]
        stale_days: i64,
        /// Add empty frontmatter to notes missing it
        #[arg(long, default_value_t = false)]
        fix: bool,
    },
}

#[derive(Serialize)]
struct IndexOutput<'a> {
    #[serde(flatten)]
    stats: &'a IndexStats,
    db_path: String,
}

fn main() -> Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::from_env().with_vault_path(cli.vault.clone());
    let Some(vault_path) = config.vault_path.clone() else {
        bail!("no vault configured: pass --vault or set OBSIDIAN_VAULT_PATH");
    };
    let Some(db_path) = config.index_db_path() else {
        bail!("cannot resolve index database path");
    };
    if !vault_path.is_dir() {
        bail!(SourceError::VaultNotFound(vault_path.display().to_string()));
    }
    let source = VaultSource::new(&vault_path);

    match cli.command {
        Commands::Index => cmd_index(&config, &source, &db_path, cli.json),
        Commands::Search { query, mode, limit } => {
            cmd_search(&config, &db_path, &query, mode, limit, cli.json)
        }
        Commands::Enrich { apply } => cmd_enrich(&source, &db_path, apply, cli.json),
        Commands::Maintain { stale_days, fix } => {
            cmd_maintain(&source, &db_path, stale_days, fix, cli.json)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_existing(db_path: &Path) -> Result<IndexStore> {
    if !db_path.exists() {
        bail!("index not found at {}: run `vault-index index` first", db_path.display());
    }
    IndexStore::open(db_path).with_context(|| format!("failed to open index {}", db_path.display()))
}

fn cmd_index(config: &Config, source: &VaultSource, db_path: &Path, json: bool) -> Result<()> {
    let store = IndexStore::open(db_path)
        .with_context(|| format!("failed to open index {}", db_path.display()))?;
    let provider = GeminiEmbeddingClient::new(config.gemini_api_key.clone())?;

    let stats = run_index(&store, source, &provider)?;
    store.close()?;

    if json {
        return print_json(&IndexOutput {
            stats: &stats,
            db_path: db_path.display().to_string(),
        });
    }
    println!(
        "Index updated: {} indexed, {} skipped, {} removed ({} total, {} errors)",
        stats.notes_indexed, stats.notes_skipped, stats.notes_removed, stats.total_notes, stats.errors
    );
    if !stats.embeddings_available {
        println!("Embeddings skipped: set GEMINI_API_KEY to enable semantic search");
    }
    println!("Database: {}", db_path.display());
    Ok(())
}

fn cmd_search(
    config: &Config,
    db_path: &Path,
    query: &str,
    mode: SearchMode,
    limit: usize,
    json: bool,
) -> Result<()> {
    let store = open_existing(db_path)?;
    if store.note_count()? == 0 {
        if json {
            return print_json(&SearchOutcome {
                query: query.to_string(),
                mode,
                results: Vec::new(),
                notice: None,
            });
        }
        println!("No notes indexed. Run `vault-index index` first.");
        return Ok(());
    }

    let provider = GeminiEmbeddingClient::new(config.gemini_api_key.clone())?;
    let outcome = run_search(&store, &provider, query, mode, limit)?;

    if json {
        return print_json(&outcome);
    }
    if let Some(notice) = &outcome.notice {
        eprintln!("Warning: {}", notice);
    }
    if outcome.results.is_empty() {
        println!("No results for {:?} ({} mode)", query, outcome.mode);
        return Ok(());
    }

    println!(
        "Search: {:?} ({} mode, {} results)\n",
        query,
        outcome.mode,
        outcome.results.len()
    );
    for (i, hit) in outcome.results.iter().enumerate() {
        if hit.title.is_empty() {
            println!("  {}. {}  ({:.4})", i + 1, hit.path, hit.score);
        } else {
            println!("  {}. {} - {}  ({:.4})", i + 1, hit.path, hit.title, hit.score);
        }
        if let Some(snippet) = hit.snippet.as_deref().filter(|s| !s.is_empty()) {
            println!("     {}", snippet);
        }
    }
    Ok(())
}

fn cmd_enrich(source: &VaultSource, db_path: &Path, apply: bool, json: bool) -> Result<()> {
    let store = open_existing(db_path)?;
    let mut report = enrich::analyze(&store)?;

    if apply && !report.link_suggestions.is_empty() {
        report.summary.applied = enrich::apply_link_suggestions(source, &report.link_suggestions);
    }

    if json {
        return print_json(&report);
    }
    print_enrich_report(&report, apply);
    Ok(())
}

fn print_enrich_report(report: &EnrichReport, apply: bool) {
    println!("Enrichment Report");
    println!("{}", "=".repeat(40));

    if !report.link_suggestions.is_empty() {
        println!("\nSuggested Links:");
        for s in &report.link_suggestions {
            println!(
                "  \"{}\" -> \"{}\" (similarity: {:.2})",
                note_name(&s.from),
                note_name(&s.to),
                s.similarity
            );
        }
    }
    if !report.tag_suggestions.is_empty() {
        println!("\nSuggested Tags:");
        for s in &report.tag_suggestions {
            println!("  \"{}\" -> add tags: [{}]", note_name(&s.note), s.tags.join(", "));
        }
    }
    if !report.orphan_notes.is_empty() {
        println!("\nOrphan Notes (no incoming links):");
        for path in &report.orphan_notes {
            println!("  - {}", path);
        }
    }

    let summary = &report.summary;
    print!(
        "\nSummary: {} link suggestions, {} tag suggestions, {} orphan notes",
        summary.links_found, summary.tags_found, summary.orphans_found
    );
    if apply && summary.applied > 0 {
        print!(", {} notes updated", summary.applied);
    }
    println!();
}

fn cmd_maintain(
    source: &VaultSource,
    db_path: &Path,
    stale_days: i64,
    fix: bool,
    json: bool,
) -> Result<()> {
    let store = if db_path.exists() {
        match IndexStore::open(db_path) {
            Ok(store) => Some(store),
            Err(e) => {
                log::warn!("[MAINTAIN] Index unavailable, skipping coverage: {}", e);
                None
            }
        }
    } else {
        None
    };

    let mut report = maintain::check_vault(source, store.as_ref(), stale_days, Utc::now())?;
    if fix && !report.no_frontmatter.is_empty() {
        report.fixed = maintain::fix_missing_frontmatter(source, &report.no_frontmatter);
    }

    if json {
        return print_json(&report);
    }
    print_maintain_report(&report, stale_days, fix);
    Ok(())
}

fn percent(part: usize, total: usize) -> usize {
    if total == 0 { 0 } else { part * 100 / total }
}

fn print_maintain_report(report: &MaintainReport, stale_days: i64, fix: bool) {
    let stats = &report.stats;
    println!("Vault Health Report");
    println!("{}", "=".repeat(40));

    println!("\nStats:");
    println!("  Total notes: {}", stats.total_notes);
    if stats.indexed_notes > 0 {
        println!(
            "  Indexed: {} ({}%)",
            stats.indexed_notes,
            percent(stats.indexed_notes, stats.total_notes)
        );
    }
    if stats.with_embeddings > 0 {
        println!(
            "  With embeddings: {} ({}%)",
            stats.with_embeddings,
            percent(stats.with_embeddings, stats.total_notes)
        );
    }
    if stats.avg_size_bytes > 0 {
        println!("  Average note size: {:.1} KB", stats.avg_size_bytes as f64 / 1024.0);
    }

    if !report.stale_notes.is_empty() {
        println!(
            "\nStale Notes (not modified in {}+ days): {}",
            stale_days,
            report.stale_notes.len()
        );
        for s in &report.stale_notes {
            println!("  - {} (last: {}, {} days ago)", s.path, s.last_modified, s.days_ago);
        }
    }
    if !report.broken_links.is_empty() {
        println!("\nBroken Wikilinks: {}", report.broken_links.len());
        for link in &report.broken_links {
            println!("  - {} links to [[{}]] (not found)", link.source, link.target);
        }
    }
    if !report.empty_notes.is_empty() {
        println!("\nEmpty Notes: {}", report.empty_notes.len());
        for path in &report.empty_notes {
            println!("  - {}", path);
        }
    }
    if !report.large_notes.is_empty() {
        println!("\nLarge Notes (>10KB): {}", report.large_notes.len());
        for note in &report.large_notes {
            println!("  - {} ({:.1} KB)", note.path, note.size_bytes as f64 / 1024.0);
        }
    }
    if !report.no_frontmatter.is_empty() {
        println!("\nMissing Frontmatter: {}", report.no_frontmatter.len());
        for path in &report.no_frontmatter {
            println!("  - {}", path);
        }
    }

    if fix && report.fixed > 0 {
        println!("\nFixed: {} notes (frontmatter added)", report.fixed);
    }
    println!("\nHealth Score: {}/100", report.health_score);
}
